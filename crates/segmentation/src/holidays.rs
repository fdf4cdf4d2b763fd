//! Picks the one holiday a run campaigns around.

use campaign_core::types::{HolidayEvent, HolidayFact};

/// Type weight + travel-impact weight + proximity weight. Events 7 to 21
/// days out sit in the preparation sweet spot and score highest.
pub fn holiday_score(event: &HolidayEvent) -> u32 {
    let kind = match event.kind.as_str() {
        "Major Festival" => 10,
        "Religious Festival" => 8,
        "Festival" => 7,
        _ => 0,
    };
    let travel = match event
        .travel_impact
        .as_deref()
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("high") => 5,
        Some("medium") => 3,
        _ => 0,
    };
    let proximity = match event.days_until {
        7..=21 => 8,
        3..=30 => 5,
        _ => 0,
    };
    kind + travel + proximity
}

/// Highest score wins; ties go to the closest event.
pub fn select_primary_holiday(events: &[HolidayEvent]) -> Option<HolidayFact> {
    let mut ranked: Vec<(&HolidayEvent, u32)> =
        events.iter().map(|e| (e, holiday_score(e))).collect();
    ranked.sort_by_key(|(e, _)| e.date);
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.first().map(|(event, score)| HolidayFact {
        name: event.name.clone(),
        date: event.date,
        kind: event.kind.clone(),
        cultural_significance: event.cultural_significance.clone(),
        travel_impact: event.travel_impact.clone(),
        days_until: event.days_until,
        priority_score: *score,
    })
}
