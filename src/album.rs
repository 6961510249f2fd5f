use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Attributes carrying this prefix reference one of the album's folders.
pub const FOLDER_PREFIX: &str = "ruta_";

/// UTC layouts the RFC 3339 parser rejects because they carry no seconds.
const UTC_FORMATS: &[&str] = &["%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%MZ"];

/// Wall-clock layouts accepted for timestamps that carry no offset.
const WALL_CLOCK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Opaque album identifier, kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumId(String);

impl AlbumId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlbumId {
    fn from(s: &str) -> Self {
        AlbumId(s.to_string())
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When an album was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    /// An absolute instant (explicit offset, date-only value or epoch millis).
    Instant(DateTime<Utc>),
    /// A wall-clock time already expressed in the viewer's zone.
    WallClock(NaiveDateTime),
    /// Anything we could not read; rendered as an invalid date.
    Invalid(String),
}

impl Timestamp {
    /// Parse the textual form sent by the album feed. Empty input means "no timestamp".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp::Instant(dt.with_timezone(&Utc)));
        }
        // Date-only values are midnight UTC, as browsers read them
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Timestamp::Instant(date.and_time(NaiveTime::MIN).and_utc()));
        }
        for layout in UTC_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
                return Some(Timestamp::Instant(dt.and_utc()));
            }
        }
        for layout in WALL_CLOCK_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
                return Some(Timestamp::WallClock(dt));
            }
        }
        Some(Timestamp::Invalid(raw.to_string()))
    }

    pub fn from_millis(millis: i64) -> Self {
        match DateTime::from_timestamp_millis(millis) {
            Some(dt) => Timestamp::Instant(dt),
            None => Timestamp::Invalid(millis.to_string()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Timestamp::parse(s),
            // Fractional milliseconds are truncated
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(millis), _) => Some(Timestamp::from_millis(millis)),
                (None, Some(millis)) if millis.is_finite() => {
                    Some(Timestamp::from_millis(millis.trunc() as i64))
                }
                _ => Some(Timestamp::Invalid(n.to_string())),
            },
            other => Some(Timestamp::Invalid(other.to_string())),
        }
    }
}

/// A named subset of an album's images, referenced by a path-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    /// Attribute name without the folder prefix (`ruta_cara` -> `cara`).
    pub key: String,
    pub path: String,
    /// Last path segment; also the substring used to select member images.
    pub label: String,
}

impl FolderRef {
    fn new(key: &str, path: &str) -> Self {
        let label = path.rsplit('/').next().unwrap_or(path);
        FolderRef {
            key: key.to_string(),
            path: path.to_string(),
            label: label.to_string(),
        }
    }

    /// Membership is plain substring containment of the leaf segment.
    pub fn contains(&self, image: &str) -> bool {
        image.contains(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionEntry {
    pub key: String,
    pub value: String,
}

/// One person's timestamped record with its image collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawAlbum")]
pub struct Album {
    pub id: AlbumId,
    pub timestamp: Option<Timestamp>,
    /// `None` when the feed sent no description object at all.
    pub description: Option<Vec<DescriptionEntry>>,
    pub folders: Vec<FolderRef>,
    pub images: Vec<String>,
}

impl Album {
    pub fn has_description(&self) -> bool {
        self.description.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn folder(&self, key: &str) -> Option<&FolderRef> {
        self.folders.iter().find(|f| f.key == key)
    }

    /// Images whose path contains the folder's leaf segment, in album order.
    pub fn folder_images(&self, folder: &FolderRef) -> Vec<String> {
        self.images
            .iter()
            .filter(|img| folder.contains(img))
            .cloned()
            .collect()
    }
}

impl AsRef<Album> for Album {
    fn as_ref(&self) -> &Album {
        self
    }
}

/// Wire shape of an album as the feed emits it.
#[derive(Deserialize)]
struct RawAlbum {
    #[serde(rename = "ID", default)]
    id: Value,
    #[serde(rename = "fecha", default)]
    fecha: Value,
    #[serde(rename = "descripcion", default)]
    descripcion: Value,
    #[serde(rename = "imagenes", default)]
    imagenes: Value,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<RawAlbum> for Album {
    fn from(raw: RawAlbum) -> Self {
        let description = raw.descripcion.as_object().map(|map| {
            map.iter()
                .map(|(key, value)| DescriptionEntry {
                    key: key.clone(),
                    value: json_text(value),
                })
                .collect()
        });

        let folders = raw
            .attributes
            .iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(FOLDER_PREFIX)?;
                match value.as_str() {
                    Some(path) if !path.is_empty() => Some(FolderRef::new(key, path)),
                    _ => None,
                }
            })
            .collect();

        let images = raw
            .imagenes
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Album {
            id: AlbumId(json_text(&raw.id)),
            timestamp: Timestamp::from_json(&raw.fecha),
            description,
            folders,
            images,
        }
    }
}
