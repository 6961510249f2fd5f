use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

use crate::album::{Album, AlbumId};
use crate::date_format::DateFormatter;
use crate::filter::{self, FilterCriteria};
use crate::source::{AlbumSource, LoadError};
use crate::state::{GalleryState, Phase};

/// Shown in place of the description list when an album has none.
pub const NO_DESCRIPTION: &str = "Sans description";

static WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w").unwrap());

/// `ropa_principal` -> `Ropa Principal`.
pub fn format_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    WORD_START
        .replace_all(&spaced, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}

pub fn card_label(id: &AlbumId) -> String {
    format!("Personne {id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumCard {
    pub id: String,
    pub label: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryView {
    pub count: usize,
    pub count_label: String,
    pub filtered: bool,
    pub albums: Vec<AlbumCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderButton {
    pub label: String,
    pub key: String,
}

/// Everything the album view needs for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub id: String,
    pub title: String,
    pub date: String,
    /// `None` renders as [`NO_DESCRIPTION`].
    pub description: Option<Vec<DescriptionLine>>,
    pub folders: Vec<FolderButton>,
    pub active_folder: Option<String>,
    pub image: Option<String>,
    /// 1-based; 0 when there is no image.
    pub position: usize,
    pub total: usize,
    pub show_navigation: bool,
}

/// Identifies one load request; only the newest result is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(usize),
    /// A newer load had already been applied; this result was dropped.
    Stale,
}

/// Drives the gallery: loading, filtering and the album view.
pub struct GalleryController {
    source: Arc<dyn AlbumSource>,
    dates: DateFormatter,
    state: GalleryState,
    criteria: FilterCriteria,
    issued: u64,
    applied: u64,
}

impl GalleryController {
    pub fn new(source: Arc<dyn AlbumSource>, dates: DateFormatter) -> Self {
        log::debug!("rendering dates in {:?}", dates.zone());
        Self {
            source,
            dates,
            state: GalleryState::new(),
            criteria: FilterCriteria::default(),
            issued: 0,
            applied: 0,
        }
    }

    pub fn source(&self) -> Arc<dyn AlbumSource> {
        Arc::clone(&self.source)
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Fetch and install the album list. On failure nothing changes.
    pub fn load(&mut self) -> Result<usize, LoadError> {
        let ticket = self.begin_load();
        let fetched = self.source.fetch();
        self.finish_load(ticket, fetched)?;
        Ok(self.state.all_albums().len())
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Install the result of the load identified by `ticket`, unless a newer
    /// one already landed.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<Vec<Album>, LoadError>,
    ) -> Result<LoadOutcome, LoadError> {
        let albums = match fetched {
            Ok(albums) => albums,
            Err(e) => {
                log::warn!("loading albums from {} failed: {e}", self.source.describe());
                return Err(e);
            }
        };
        if ticket.0 <= self.applied {
            log::warn!(
                "dropping stale album load #{} (#{} already applied)",
                ticket.0,
                self.applied
            );
            return Ok(LoadOutcome::Stale);
        }
        self.applied = ticket.0;
        let count = albums.len();
        self.state
            .replace_albums(albums.into_iter().map(Arc::new).collect());
        self.criteria = FilterCriteria::default();
        log::info!("loaded {count} albums from {}", self.source.describe());
        Ok(LoadOutcome::Applied(count))
    }

    pub fn apply_filters(&mut self, criteria: FilterCriteria) -> GalleryView {
        let visible = filter::apply(self.state.all_albums(), &criteria, &self.dates);
        log::debug!(
            "filters {:?} keep {} of {} albums",
            criteria,
            visible.len(),
            self.state.all_albums().len()
        );
        self.state.set_visible(visible);
        self.criteria = criteria;
        self.gallery_view()
    }

    pub fn reset_filters(&mut self) -> GalleryView {
        self.apply_filters(FilterCriteria::default())
    }

    pub fn gallery_view(&self) -> GalleryView {
        let albums: Vec<AlbumCard> = self
            .state
            .visible_albums()
            .iter()
            .map(|a| AlbumCard {
                id: a.id.as_str().to_owned(),
                label: card_label(&a.id),
                date: self.dates.to_display(a.timestamp.as_ref()),
            })
            .collect();
        GalleryView {
            count: albums.len(),
            count_label: format!("{} album(s)", albums.len()),
            filtered: !self.criteria.is_default(),
            albums,
        }
    }

    /// `None` when no loaded album has this id.
    pub fn open_album(&mut self, id: &AlbumId) -> Option<ModalView> {
        let album = self.state.find(id)?;
        self.state.open_album(album);
        log::debug!("opened album {id}: {:?}", self.state.phase());
        self.modal_view()
    }

    /// `None` when no album is open. An unknown key leaves the view as it was.
    pub fn select_folder(&mut self, key: &str) -> Option<ModalView> {
        if self.state.select_folder(key) {
            log::debug!("folder {key:?} selected: {:?}", self.state.phase());
        } else {
            log::debug!("folder {key:?} not selectable");
        }
        self.modal_view()
    }

    pub fn next(&mut self) -> Option<ModalView> {
        self.state.next();
        self.modal_view()
    }

    pub fn prev(&mut self) -> Option<ModalView> {
        self.state.prev();
        self.modal_view()
    }

    pub fn close(&mut self) {
        self.state.close();
        log::debug!("album view {:?}", self.state.phase());
    }

    pub fn modal_view(&self) -> Option<ModalView> {
        let album = self.state.open_album_ref()?;
        let images = self.state.active_folder_images();
        let image = self.state.current_image().map(str::to_string);
        let position = if image.is_some() {
            self.state.cursor_index() + 1
        } else {
            0
        };

        let description = album.description.as_ref().map(|entries| {
            entries
                .iter()
                .map(|e| DescriptionLine {
                    label: format_label(&e.key),
                    value: e.value.clone(),
                })
                .collect()
        });
        let folders = album
            .folders
            .iter()
            .map(|f| FolderButton {
                label: f.label.clone(),
                key: f.key.clone(),
            })
            .collect();

        Some(ModalView {
            id: album.id.to_string(),
            title: card_label(&album.id),
            date: self.dates.to_display(album.timestamp.as_ref()),
            description,
            folders,
            active_folder: self.state.active_folder().map(str::to_string),
            image,
            position,
            total: images.len(),
            show_navigation: self.state.phase() == Phase::Folder && !images.is_empty(),
        })
    }
}
