mod album;
mod browse;
mod controller;
mod date_format;
mod filter;
mod page;
mod serve;
mod source;
mod state;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use controller::GalleryController;
use date_format::{DateFormatter, ViewerZone};
use filter::FilterCriteria;

#[derive(Parser)]
#[command(
    name = "album-viewer",
    about = "Parcourt les albums de personnes fournis par une API ou un fichier JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Délai maximal d'un chargement, en secondes (aucun par défaut)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Fuseau d'affichage des dates, ex. +02:00 ou UTC (local par défaut)
    #[arg(long, global = true, allow_hyphen_values = true, value_parser = date_format::parse_zone)]
    utc_offset: Option<ViewerZone>,
}

#[derive(Args)]
struct SourceArg {
    /// URL de l'API (http:// ou https://) ou chemin d'un fichier JSON
    #[arg(env = "ALBUM_SOURCE")]
    source: String,
}

#[derive(Args)]
struct FilterArgs {
    /// Jour de l'album (AAAA-MM-JJ)
    #[arg(long, value_parser = parse_date_key)]
    date: Option<String>,
    /// Heure minimale (HH:MM)
    #[arg(long, value_parser = parse_clock)]
    start: Option<String>,
    /// Heure maximale (HH:MM)
    #[arg(long, value_parser = parse_clock)]
    end: Option<String>,
    /// Mot-clé recherché dans la description
    #[arg(short, long)]
    keyword: Option<String>,
    /// Masquer les albums sans description
    #[arg(long)]
    exclude_without_description: bool,
}

impl FilterArgs {
    fn into_criteria(self) -> FilterCriteria {
        FilterCriteria {
            date: self.date.unwrap_or_default(),
            start_time: self.start.unwrap_or_default(),
            end_time: self.end.unwrap_or_default(),
            keyword: self.keyword.unwrap_or_default(),
            include_without_description: !self.exclude_without_description,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Lister les albums, éventuellement filtrés
    List {
        #[command(flatten)]
        source: SourceArg,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Afficher un album et parcourir l'un de ses dossiers
    Show {
        #[command(flatten)]
        source: SourceArg,
        /// Identifiant de l'album
        id: String,
        /// Dossier à ouvrir (ex: cara)
        #[arg(short, long)]
        folder: Option<String>,
        /// Avancer de N images dans le dossier
        #[arg(long, default_value_t = 0)]
        next: u32,
        /// Reculer de N images dans le dossier
        #[arg(long, default_value_t = 0)]
        prev: u32,
    },
    /// Lancer la visionneuse dans le navigateur avec serveur local
    Serve {
        #[command(flatten)]
        source: SourceArg,
        /// Port du serveur (par défaut : 8080)
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

fn parse_date_key(s: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("Date invalide : {s} (attendu : AAAA-MM-JJ)"))
}

fn parse_clock(s: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("Heure invalide : {s} (attendu : HH:MM)"))
}

fn controller_for(
    location: &str,
    timeout: Option<u64>,
    zone: ViewerZone,
) -> Result<GalleryController> {
    let source = source::open_source(location, timeout.map(Duration::from_secs))
        .with_context(|| format!("Source inutilisable : {location}"))?;
    Ok(GalleryController::new(source, DateFormatter::new(zone)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let zone = cli.utc_offset.unwrap_or_default();

    match cli.command {
        Commands::List { source, filters } => {
            let mut controller = controller_for(&source.source, cli.timeout, zone)?;
            browse::run_list(&mut controller, filters.into_criteria())
        }
        Commands::Show {
            source,
            id,
            folder,
            next,
            prev,
        } => {
            let mut controller = controller_for(&source.source, cli.timeout, zone)?;
            browse::run_show(
                &mut controller,
                &id,
                folder.as_deref(),
                i64::from(next) - i64::from(prev),
            )
        }
        Commands::Serve { source, port } => {
            let controller = controller_for(&source.source, cli.timeout, zone)?;
            serve::run_serve(controller, port)
        }
    }
}
