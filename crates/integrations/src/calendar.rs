//! Static festival calendar.
//!
//! Ships a built-in list of Indian festivals dated against the current
//! year and can be replaced by a JSON file with the same entry shape.
//! Entries with unparsable dates are skipped.

use std::path::Path;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use campaign_core::providers::HolidayProvider;
use campaign_core::types::HolidayEvent;
use campaign_core::{CampaignError, CampaignResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub cultural_significance: Option<String>,
    #[serde(default)]
    pub travel_impact: Option<String>,
}

fn default_kind() -> String {
    "Festival".to_string()
}

pub struct StaticCalendar {
    entries: Vec<CalendarEntry>,
}

impl StaticCalendar {
    pub fn new(entries: Vec<CalendarEntry>) -> Self {
        Self { entries }
    }

    pub fn with_defaults(today: NaiveDate) -> Self {
        Self::new(default_entries(today.year()))
    }

    pub fn from_json(raw: &str) -> CampaignResult<Self> {
        let entries: Vec<CalendarEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries))
    }

    /// Loads `path` when given; a missing or unreadable file falls back to
    /// the built-in list.
    pub fn load(path: Option<&str>, today: NaiveDate) -> Self {
        let Some(path) = path else {
            return Self::with_defaults(today);
        };
        match std::fs::read_to_string(Path::new(path))
            .map_err(CampaignError::from)
            .and_then(|raw| Self::from_json(&raw))
        {
            Ok(calendar) => {
                info!(%path, entries = calendar.entries.len(), "Holiday calendar loaded");
                calendar
            }
            Err(e) => {
                warn!(%path, error = %e, "Holiday calendar unavailable, using built-in list");
                Self::with_defaults(today)
            }
        }
    }

    /// Events in `[today, today + days_ahead]`, closest first.
    pub fn upcoming_from(&self, today: NaiveDate, days_ahead: u32) -> Vec<HolidayEvent> {
        let horizon = today + Duration::days(i64::from(days_ahead));
        let mut events: Vec<HolidayEvent> = self
            .entries
            .iter()
            .filter_map(|entry| match NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") {
                Ok(date) => Some((entry, date)),
                Err(_) => {
                    warn!(name = %entry.name, date = %entry.date, "Skipping holiday with invalid date");
                    None
                }
            })
            .filter(|(_, date)| *date >= today && *date <= horizon)
            .map(|(entry, date)| HolidayEvent {
                name: entry.name.clone(),
                date,
                kind: entry.kind.clone(),
                cultural_significance: entry.cultural_significance.clone(),
                travel_impact: entry.travel_impact.clone(),
                days_until: (date - today).num_days(),
            })
            .collect();
        events.sort_by_key(|e| e.date);
        events
    }
}

#[async_trait]
impl HolidayProvider for StaticCalendar {
    async fn upcoming_holidays(&self, days_ahead: u32) -> CampaignResult<Vec<HolidayEvent>> {
        Ok(self.upcoming_from(Utc::now().date_naive(), days_ahead))
    }
}

fn entry(name: &str, date: String, kind: &str, significance: &str, travel: &str) -> CalendarEntry {
    CalendarEntry {
        name: name.to_string(),
        date,
        kind: kind.to_string(),
        cultural_significance: Some(significance.to_string()),
        travel_impact: Some(travel.to_string()),
    }
}

pub fn default_entries(year: i32) -> Vec<CalendarEntry> {
    let next = year + 1;
    vec![
        entry(
            "Diwali",
            format!("{year}-11-12"),
            "Major Festival",
            "Festival of lights, prosperity, and new beginnings",
            "High",
        ),
        entry(
            "Dussehra",
            format!("{year}-10-24"),
            "Major Festival",
            "Victory of good over evil",
            "High",
        ),
        entry(
            "Christmas",
            format!("{year}-12-25"),
            "Festival",
            "Celebration of giving and family",
            "Medium",
        ),
        entry(
            "New Year",
            format!("{next}-01-01"),
            "Festival",
            "Fresh starts and resolutions",
            "Medium",
        ),
        entry(
            "Holi",
            format!("{next}-03-14"),
            "Festival",
            "Festival of colors and spring",
            "Medium",
        ),
        entry(
            "Eid",
            format!("{next}-04-10"),
            "Religious Festival",
            "End of Ramadan, celebration and giving",
            "High",
        ),
    ]
}
