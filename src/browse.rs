use anyhow::{Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write;
use std::time::Duration;

use crate::album::AlbumId;
use crate::controller::{GalleryController, GalleryView, ModalView, NO_DESCRIPTION};
use crate::filter::FilterCriteria;

/// Fetch the feed behind a spinner.
pub fn load_with_spinner(controller: &mut GalleryController) -> Result<usize> {
    let source = controller.source().describe();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message(format!("Chargement de {source}…"));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let loaded = controller.load();
    spinner.finish_and_clear();
    Ok(loaded?)
}

fn header(out: &mut String, controller: &GalleryController) {
    let _ = writeln!(
        out,
        "\n{}  {}  {}\n",
        style("album-viewer").bold().cyan(),
        style("·").dim(),
        style(controller.source().describe()).white().bold()
    );
}

/// Gallery listing as printed by `list`.
pub fn render_gallery(view: &GalleryView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {}{}",
        style(&view.count_label).green().bold(),
        if view.filtered {
            style(" (filtré)").dim().to_string()
        } else {
            String::new()
        }
    );
    if view.albums.is_empty() {
        let _ = writeln!(out, "  {} Aucun album.", style("!").yellow().bold());
        return out;
    }
    for card in &view.albums {
        let _ = writeln!(
            out,
            "  {:>4}  {}  {}",
            style(&card.id).dim(),
            style(&card.label).white().bold(),
            style(&card.date).cyan()
        );
    }
    out
}

/// Album view as printed by `show`.
pub fn render_album(view: &ModalView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {}", style(&view.title).bold().cyan());
    if !view.date.is_empty() {
        let _ = writeln!(out, "  {}", style(&view.date).dim());
    }
    let _ = writeln!(out);

    match &view.description {
        None => {
            let _ = writeln!(out, "  {}", style(NO_DESCRIPTION).dim());
        }
        Some(lines) => {
            for line in lines {
                let _ = writeln!(out, "  {}: {}", style(&line.label).bold(), line.value);
            }
        }
    }
    let _ = writeln!(out);

    if !view.folders.is_empty() {
        let buttons: Vec<String> = view
            .folders
            .iter()
            .map(|f| {
                if view.active_folder.as_deref() == Some(f.key.as_str()) {
                    style(format!("[{}]", f.label)).cyan().bold().to_string()
                } else {
                    style(format!(" {} ", f.label)).dim().to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "  {}  {}", style("Dossiers").dim(), buttons.join(" "));
    }

    match &view.image {
        Some(image) => {
            let _ = writeln!(
                out,
                "  {} {}  {}",
                style(format!("{}/{}", view.position, view.total)).yellow().bold(),
                style("·").dim(),
                image
            );
        }
        None if view.active_folder.is_some() => {
            let _ = writeln!(out, "  {} Dossier vide.", style("!").yellow().bold());
        }
        None => {}
    }
    out
}

pub fn run_list(controller: &mut GalleryController, criteria: FilterCriteria) -> Result<()> {
    load_with_spinner(controller)?;
    let view = controller.apply_filters(criteria);

    let mut out = String::new();
    header(&mut out, controller);
    out.push_str(&render_gallery(&view));
    print!("{out}");
    Ok(())
}

/// Open one album, optionally pick a folder and step through it.
pub fn run_show(
    controller: &mut GalleryController,
    id: &str,
    folder: Option<&str>,
    steps: i64,
) -> Result<()> {
    load_with_spinner(controller)?;

    let id = AlbumId::from(id);
    let Some(mut view) = controller.open_album(&id) else {
        bail!(
            "Album {id} introuvable parmi {} albums",
            controller.state().all_albums().len()
        );
    };
    if let Some(key) = folder {
        if !view.folders.iter().any(|f| f.key == key) {
            bail!("L'album {id} n'a pas de dossier «{key}»");
        }
        view = select(controller.select_folder(key))?;
        for _ in 0..steps.unsigned_abs() {
            view = select(if steps > 0 {
                controller.next()
            } else {
                controller.prev()
            })?;
        }
    }

    let mut out = String::new();
    header(&mut out, controller);
    out.push_str(&render_album(&view));
    print!("{out}");
    Ok(())
}

fn select(view: Option<ModalView>) -> Result<ModalView> {
    match view {
        Some(view) => Ok(view),
        None => bail!("Aucun album ouvert"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{AlbumCard, DescriptionLine, FolderButton};

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    fn view() -> ModalView {
        ModalView {
            id: "1".to_string(),
            title: "Personne 1".to_string(),
            date: "01/01/2024 09:00".to_string(),
            description: Some(vec![DescriptionLine {
                label: "Ropa Principal".to_string(),
                value: "Chaqueta roja".to_string(),
            }]),
            folders: vec![
                FolderButton {
                    label: "cuerpo".to_string(),
                    key: "cuerpo".to_string(),
                },
                FolderButton {
                    label: "cara".to_string(),
                    key: "cara".to_string(),
                },
            ],
            active_folder: None,
            image: None,
            position: 0,
            total: 0,
            show_navigation: false,
        }
    }

    // --- render_gallery ---

    #[test]
    fn gallery_lists_cards() {
        let out = plain(&render_gallery(&GalleryView {
            count: 2,
            count_label: "2 album(s)".to_string(),
            filtered: true,
            albums: vec![
                AlbumCard {
                    id: "1".to_string(),
                    label: "Personne 1".to_string(),
                    date: "01/01/2024 09:00".to_string(),
                },
                AlbumCard {
                    id: "2".to_string(),
                    label: "Personne 2".to_string(),
                    date: String::new(),
                },
            ],
        }));
        assert!(out.contains("2 album(s) (filtré)"));
        assert!(out.contains("Personne 1  01/01/2024 09:00"));
        assert!(out.contains("Personne 2"));
    }

    #[test]
    fn gallery_empty_says_so() {
        let out = plain(&render_gallery(&GalleryView {
            count: 0,
            count_label: "0 album(s)".to_string(),
            filtered: false,
            albums: vec![],
        }));
        assert!(out.contains("0 album(s)"));
        assert!(!out.contains("filtré"));
        assert!(out.contains("Aucun album."));
    }

    // --- render_album ---

    #[test]
    fn album_without_folder_shows_description_and_buttons() {
        let out = plain(&render_album(&view()));
        assert!(out.contains("Personne 1"));
        assert!(out.contains("Ropa Principal: Chaqueta roja"));
        assert!(out.contains(" cuerpo "));
        assert!(!out.contains("Dossier vide"));
    }

    #[test]
    fn album_without_description() {
        let mut v = view();
        v.description = None;
        let out = plain(&render_album(&v));
        assert!(out.contains(NO_DESCRIPTION));
    }

    #[test]
    fn album_with_image_shows_position() {
        let mut v = view();
        v.active_folder = Some("cuerpo".to_string());
        v.image = Some("P/1/cuerpo/b.jpg".to_string());
        v.position = 2;
        v.total = 3;
        let out = plain(&render_album(&v));
        assert!(out.contains("[cuerpo]"));
        assert!(out.contains("2/3"));
        assert!(out.contains("P/1/cuerpo/b.jpg"));
    }

    #[test]
    fn album_with_empty_folder() {
        let mut v = view();
        v.active_folder = Some("cara".to_string());
        let out = plain(&render_album(&v));
        assert!(out.contains("Dossier vide."));
    }
}
