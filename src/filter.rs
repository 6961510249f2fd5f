use serde::{Deserialize, Serialize};

use crate::album::Album;
use crate::date_format::DateFormatter;

/// The combination of filters used to compute the visible album list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// `YYYY-MM-DD`, empty for any date.
    pub date: String,
    /// `HH:MM`, empty for no lower bound.
    pub start_time: String,
    /// `HH:MM`, empty for no upper bound.
    pub end_time: String,
    pub keyword: String,
    pub include_without_description: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            keyword: String::new(),
            include_without_description: true,
        }
    }
}

impl FilterCriteria {
    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }
}

pub fn matches_date(album: &Album, date_key: &str, dates: &DateFormatter) -> bool {
    if date_key.is_empty() {
        return true;
    }
    dates.to_filter_key(album.timestamp.as_ref()) == date_key
}

/// Undated albums always pass. Bounds are compared lexically as `HH:MM:00`.
pub fn matches_time_range(album: &Album, start: &str, end: &str, dates: &DateFormatter) -> bool {
    if album.timestamp.is_none() {
        return true;
    }
    let album_time = dates.to_time_key(album.timestamp.as_ref());
    if !start.is_empty() && album_time < format!("{start}:00") {
        return false;
    }
    if !end.is_empty() && album_time > format!("{end}:00") {
        return false;
    }
    true
}

/// `keyword` must already be lowercase.
pub fn matches_keyword(album: &Album, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }
    match &album.description {
        Some(entries) if !entries.is_empty() => entries
            .iter()
            .any(|e| e.value.to_lowercase().contains(keyword)),
        _ => false,
    }
}

pub fn has_description_or_included(album: &Album, include_without_description: bool) -> bool {
    album.has_description() || include_without_description
}

/// Keep the albums matching `criteria`, preserving input order.
///
/// An album passes when date and time match and either a given keyword
/// matches or the description check passes. An empty keyword never rescues
/// an album on its own; only the include flag does.
pub fn apply<A>(albums: &[A], criteria: &FilterCriteria, dates: &DateFormatter) -> Vec<A>
where
    A: AsRef<Album> + Clone,
{
    let keyword = criteria.keyword.to_lowercase();
    albums
        .iter()
        .filter(|a| {
            let album = a.as_ref();
            let keyword_hit = !keyword.is_empty() && matches_keyword(album, &keyword);
            matches_date(album, &criteria.date, dates)
                && matches_time_range(album, &criteria.start_time, &criteria.end_time, dates)
                && (keyword_hit
                    || has_description_or_included(album, criteria.include_without_description))
        })
        .cloned()
        .collect()
}
