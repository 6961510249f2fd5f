use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};

use crate::album::Timestamp;

/// What an unreadable timestamp renders as.
pub const INVALID_DATE: &str = "Invalid Date";

const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";
const FILTER_KEY_FORMAT: &str = "%Y-%m-%d";
const TIME_KEY_FORMAT: &str = "%H:%M:00";

/// The time zone album timestamps are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ViewerZone {
    pub fn utc() -> Self {
        ViewerZone::Fixed(Utc.fix())
    }

    fn wall_clock(&self, instant: &DateTime<Utc>) -> NaiveDateTime {
        match self {
            ViewerZone::Local => instant.with_timezone(&Local).naive_local(),
            ViewerZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `Z` or `UTC` into a fixed viewer zone.
pub fn parse_zone(s: &str) -> Result<ViewerZone, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(ViewerZone::utc());
    }
    let invalid = || format!("Décalage UTC invalide : {s} (attendu : +HH:MM)");
    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(ViewerZone::Fixed)
        .ok_or_else(invalid)
}

/// Renders timestamps for display and for filter comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatter {
    zone: ViewerZone,
}

impl DateFormatter {
    pub fn new(zone: ViewerZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> ViewerZone {
        self.zone
    }

    fn render(&self, ts: Option<&Timestamp>, layout: &str) -> String {
        match ts {
            None => String::new(),
            Some(Timestamp::Instant(instant)) => {
                self.zone.wall_clock(instant).format(layout).to_string()
            }
            Some(Timestamp::WallClock(dt)) => dt.format(layout).to_string(),
            Some(Timestamp::Invalid(_)) => INVALID_DATE.to_string(),
        }
    }

    /// `DD/MM/YYYY HH:MM`, as shown on cards and in the album view.
    pub fn to_display(&self, ts: Option<&Timestamp>) -> String {
        self.render(ts, DISPLAY_FORMAT)
    }

    /// `YYYY-MM-DD`, compared against the date filter.
    pub fn to_filter_key(&self, ts: Option<&Timestamp>) -> String {
        self.render(ts, FILTER_KEY_FORMAT)
    }

    /// `HH:MM:00`, compared lexically against the time range bounds.
    pub fn to_time_key(&self, ts: Option<&Timestamp>) -> String {
        self.render(ts, TIME_KEY_FORMAT)
    }
}
