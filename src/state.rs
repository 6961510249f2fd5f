use std::sync::Arc;

use crate::album::{Album, AlbumId};

/// Where the album view currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    /// An album is open but no folder has been picked yet.
    NoFolder,
    Folder,
}

/// Cursor over one open album. Lives from `open_album` until `close`.
#[derive(Debug, Clone)]
struct Session {
    album: Arc<Album>,
    folder: Option<String>,
    images: Vec<String>,
    cursor: usize,
}

/// The album lists plus the album-view cursor.
#[derive(Debug, Default)]
pub struct GalleryState {
    all_albums: Vec<Arc<Album>>,
    visible_albums: Vec<Arc<Album>>,
    session: Option<Session>,
}

impl GalleryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly loaded list; nothing is filtered afterwards.
    pub fn replace_albums(&mut self, albums: Vec<Arc<Album>>) {
        self.visible_albums = albums.clone();
        self.all_albums = albums;
    }

    pub fn set_visible(&mut self, albums: Vec<Arc<Album>>) {
        self.visible_albums = albums;
    }

    pub fn all_albums(&self) -> &[Arc<Album>] {
        &self.all_albums
    }

    pub fn visible_albums(&self) -> &[Arc<Album>] {
        &self.visible_albums
    }

    pub fn find(&self, id: &AlbumId) -> Option<Arc<Album>> {
        self.all_albums.iter().find(|a| &a.id == id).cloned()
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::Closed,
            Some(s) if s.folder.is_none() => Phase::NoFolder,
            Some(_) => Phase::Folder,
        }
    }

    pub fn open_album(&mut self, album: Arc<Album>) {
        self.session = Some(Session {
            album,
            folder: None,
            images: Vec::new(),
            cursor: 0,
        });
    }

    /// Returns `false` (and changes nothing) when no album is open or the
    /// open album has no folder with this key.
    pub fn select_folder(&mut self, key: &str) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(folder) = session.album.folder(key) else {
            return false;
        };
        session.images = session.album.folder_images(folder);
        session.folder = Some(folder.key.clone());
        session.cursor = 0;
        true
    }

    pub fn next(&mut self) {
        if let Some(s) = self.navigable() {
            s.cursor = (s.cursor + 1) % s.images.len();
        }
    }

    pub fn prev(&mut self) {
        if let Some(s) = self.navigable() {
            let len = s.images.len();
            s.cursor = (s.cursor + len - 1) % len;
        }
    }

    pub fn close(&mut self) {
        self.session = None;
    }

    fn navigable(&mut self) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|s| s.folder.is_some() && !s.images.is_empty())
    }

    pub fn open_album_ref(&self) -> Option<&Arc<Album>> {
        self.session.as_ref().map(|s| &s.album)
    }

    pub fn active_folder(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.folder.as_deref())
    }

    pub fn active_folder_images(&self) -> &[String] {
        self.session.as_ref().map(|s| s.images.as_slice()).unwrap_or(&[])
    }

    /// Zero whenever there is nothing to point at.
    pub fn cursor_index(&self) -> usize {
        self.session.as_ref().map(|s| s.cursor).unwrap_or(0)
    }

    pub fn current_image(&self) -> Option<&str> {
        let s = self.session.as_ref()?;
        s.images.get(s.cursor).map(String::as_str)
    }
}
