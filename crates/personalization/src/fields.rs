//! Per-recipient placeholder vocabulary and the renderer that applies it to
//! a group's content template.

use std::collections::HashMap;

use campaign_core::types::{ContentTemplate, Customer, HolidayFact, Vehicle, WeatherFact};
use chrono::NaiveDate;

use crate::templating::TemplateEngine;

pub const DEFAULT_CUSTOMER_NAME: &str = "Valued Customer";
pub const DEFAULT_VEHICLE: &str = "your vehicle";
pub const NOT_AVAILABLE: &str = "Not Available";
pub const DEFAULT_LOCATION: &str = "your city";
pub const MAX_SUBJECT_CHARS: usize = 78;

const DATE_FORMAT: &str = "%B %d, %Y";

/// Run-level facts shared by every recipient of a run.
#[derive(Debug, Clone)]
pub struct RunFacts {
    pub location: String,
    pub weather: Option<WeatherFact>,
    pub holiday: Option<HolidayFact>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Placeholder name to display value. Every known placeholder is always
/// present, falling back to its documented default.
#[derive(Debug, Clone, Default)]
pub struct PersonalizationContext {
    vars: HashMap<String, String>,
}

impl PersonalizationContext {
    pub fn build(
        customer: &Customer,
        vehicle: Option<&Vehicle>,
        facts: &RunFacts,
        cta_text: &str,
    ) -> Self {
        let mut ctx = Self::default();
        let today = facts.today;

        ctx.set("customer_name", non_blank(&customer.name).unwrap_or(DEFAULT_CUSTOMER_NAME));
        ctx.set(
            "preferred_location",
            customer
                .preferred_location
                .as_deref()
                .and_then(non_blank)
                .unwrap_or(DEFAULT_LOCATION),
        );
        ctx.set("location", non_blank(&facts.location).unwrap_or(DEFAULT_LOCATION));
        ctx.set("cta_text", cta_text);
        ctx.set("service_interval", "6");
        ctx.set("current_date", today.format(DATE_FORMAT).to_string());

        match vehicle {
            Some(v) => {
                ctx.set("vehicle_make", non_blank(&v.make).unwrap_or(DEFAULT_VEHICLE));
                ctx.set("vehicle_model", v.model.trim());
                ctx.set("vehicle_year", v.year.to_string());
                ctx.set("vehicle_info", v.display_name());
                ctx.set("last_service_date", format_date(v.last_service_date));
                ctx.set("next_service_due", format_date(v.next_service_due));
                ctx.set("warranty_end_date", format_date(v.warranty_end));
                ctx.set("registration_date", format_date(v.registration_date));
                ctx.set(
                    "last_service_type",
                    v.last_service_type
                        .as_deref()
                        .and_then(non_blank)
                        .unwrap_or(NOT_AVAILABLE),
                );
                ctx.set(
                    "mileage",
                    v.mileage
                        .map(|km| format!("{} km", group_thousands(km)))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                );
                ctx.set("warranty_status", warranty_status(v.days_until_warranty_expiry(today)));
                ctx.set("urgency_message", urgency_message(v.days_since_service(today)));
            }
            None => {
                ctx.set("vehicle_make", DEFAULT_VEHICLE);
                ctx.set("vehicle_model", "");
                ctx.set("vehicle_year", NOT_AVAILABLE);
                ctx.set("vehicle_info", DEFAULT_VEHICLE);
                for key in [
                    "last_service_date",
                    "next_service_due",
                    "warranty_end_date",
                    "registration_date",
                    "last_service_type",
                    "mileage",
                ] {
                    ctx.set(key, NOT_AVAILABLE);
                }
                ctx.set("warranty_status", warranty_status(None));
                ctx.set("urgency_message", urgency_message(None));
            }
        }

        match &facts.weather {
            Some(w) => {
                ctx.set("weather_condition", w.condition.as_str());
                ctx.set("temperature", format!("{:.0}°C", w.temperature));
            }
            None => {
                ctx.set("weather_condition", "current");
                ctx.set("temperature", NOT_AVAILABLE);
            }
        }

        match &facts.holiday {
            Some(h) => {
                ctx.set("holiday_name", h.name.as_str());
                ctx.set("holiday_greeting", holiday_greeting(&h.name));
            }
            None => {
                ctx.set("holiday_name", "the festive season");
                ctx.set("holiday_greeting", "Wishing you a wonderful season!");
            }
        }

        ctx
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }
}

/// `Expires in N days` within 30 days, then `Active` or `Expired`; no end
/// date on record gives `Check with service center`.
pub fn warranty_status(days_until_expiry: Option<i64>) -> String {
    match days_until_expiry {
        Some(days) if days < 0 => "Expired".to_string(),
        Some(days) if days <= 30 => format!("Expires in {days} days"),
        Some(_) => "Active".to_string(),
        None => "Check with service center".to_string(),
    }
}

/// Never-serviced vehicles count as 365 days since service.
pub fn urgency_message(days_since_service: Option<i64>) -> &'static str {
    match days_since_service.unwrap_or(365) {
        d if d > 365 => "Your vehicle is overdue for service",
        d if d > 180 => "Your vehicle is due for service soon",
        _ => "Your vehicle service is up to date",
    }
}

pub fn holiday_greeting(holiday_name: &str) -> String {
    const GREETINGS: [(&str, &str); 6] = [
        ("diwali", "May this Festival of Lights bring joy and prosperity to your journey!"),
        ("holi", "Wishing you a colorful and joyful Holi celebration!"),
        ("dussehra", "May the victory of good over evil inspire your travels!"),
        ("christmas", "Wishing you a Merry Christmas and safe travels!"),
        ("new year", "Wishing you a Happy New Year filled with smooth journeys!"),
        ("eid", "Eid Mubarak! May your celebrations be filled with joy!"),
    ];
    let lower = holiday_name.to_lowercase();
    GREETINGS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, greeting)| greeting.to_string())
        .unwrap_or_else(|| format!("Wishing you a wonderful {holiday_name} celebration!"))
}

/// Caps a subject at `MAX_SUBJECT_CHARS`, cutting at a word boundary.
pub fn cap_subject(subject: &str) -> String {
    let subject = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    if subject.chars().count() <= MAX_SUBJECT_CHARS {
        return subject;
    }

    let mut capped = String::new();
    for word in subject.split(' ') {
        let extra = if capped.is_empty() { 0 } else { 1 };
        if capped.chars().count() + extra + word.chars().count() > MAX_SUBJECT_CHARS {
            break;
        }
        if extra == 1 {
            capped.push(' ');
        }
        capped.push_str(word);
    }
    if capped.is_empty() {
        capped = subject.chars().take(MAX_SUBJECT_CHARS).collect();
    }
    capped
}

pub struct Personalizer {
    engine: TemplateEngine,
}

impl Personalizer {
    pub fn new() -> Self {
        Self {
            engine: TemplateEngine::new(),
        }
    }

    /// Renders the template's subject and body for one recipient. Uses the
    /// customer's primary vehicle when `vehicle` is `None`.
    pub fn render(
        &self,
        template: &ContentTemplate,
        customer: &Customer,
        vehicle: Option<&Vehicle>,
        facts: &RunFacts,
    ) -> RenderedMessage {
        let vehicle = vehicle.or_else(|| customer.primary_vehicle());
        let ctx = PersonalizationContext::build(customer, vehicle, facts, &template.cta_text);
        RenderedMessage {
            subject: cap_subject(&self.engine.render(&template.subject_line, ctx.vars())),
            body: self.engine.render(&template.content, ctx.vars()).trim().to_string(),
        }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }
}

impl Default for Personalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
