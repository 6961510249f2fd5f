use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::album::Album;

/// Why a load of the album feed failed. The viewer keeps its previous state.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Requête vers {url} échouée : {message}")]
    Network { url: String, message: String },
    #[error("{url} a répondu {status}")]
    Status { url: String, status: u16 },
    #[error("Impossible de lire {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Réponse invalide : {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("La réponse n'est pas une liste d'albums")]
    NotAnArray,
}

/// Where albums come from.
pub trait AlbumSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<Album>, LoadError>;

    /// Human-readable location, for logs and headers.
    fn describe(&self) -> String;
}

/// Decode a feed payload: a JSON array of album objects.
pub fn parse_albums(body: &str) -> Result<Vec<Album>, LoadError> {
    let value: Value = serde_json::from_str(body)?;
    match &value {
        Value::Array(items) if items.iter().all(Value::is_object) => {}
        _ => return Err(LoadError::NotAnArray),
    }
    Ok(serde_json::from_value(value)?)
}

/// Album feed served over HTTP.
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    /// `timeout` of `None` waits as long as the server takes.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl AlbumSource for HttpSource {
    fn fetch(&self) -> Result<Vec<Album>, LoadError> {
        let network = |e: reqwest::Error| LoadError::Network {
            url: self.url.clone(),
            message: e.to_string(),
        };
        let resp = self.client.get(&self.url).send().map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().map_err(network)?;
        parse_albums(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Album feed saved as a JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl AlbumSource for FileSource {
    fn fetch(&self) -> Result<Vec<Album>, LoadError> {
        let body = std::fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_albums(&body)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// `http://` and `https://` locations are fetched over the network, anything
/// else is read from disk.
pub fn open_source(location: &str, timeout: Option<Duration>) -> Result<Arc<dyn AlbumSource>, LoadError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Arc::new(FileSource::new(Path::new(location))))
    }
}
