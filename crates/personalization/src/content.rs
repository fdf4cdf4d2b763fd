//! Content generation adapter: prompts the generation service once per
//! campaign group and falls back to a deterministic local template when the
//! call fails or the reply cannot be parsed.

use std::sync::Arc;

use campaign_core::error::CampaignError;
use campaign_core::providers::{bounded, ContentGenerator};
use campaign_core::types::{
    ContentSource, ContentTemplate, GenerationPrompt, GroupKey, HolidayFact, ServiceNeed,
    TriggerKind, WeatherFact,
};
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::templating::TemplateEngine;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("malformed JSON: {0}")]
    Json(String),
    #[error("field `{0}` is missing or empty")]
    MissingField(&'static str),
}

/// Cohort metadata used to steer the copy of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagingAngle {
    pub name: String,
    pub title: String,
    pub priority: String,
    pub benefits: Vec<String>,
    pub cta: String,
}

/// Structured summary of one group handed to content generation.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub trigger: TriggerKind,
    pub location: String,
    pub group_label: String,
    pub group_key: GroupKey,
    pub member_count: usize,
    pub weather: Option<WeatherFact>,
    pub holiday: Option<HolidayFact>,
    pub angle: Option<MessagingAngle>,
}

/// Always carries a complete template. `error` is set when the template is
/// a fallback.
#[derive(Debug)]
pub struct GeneratedContent {
    pub template: ContentTemplate,
    pub error: Option<CampaignError>,
}

#[derive(Deserialize)]
struct RawContent {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subject_line: String,
    #[serde(default, alias = "content_template", alias = "body")]
    content: String,
    #[serde(default)]
    cta_text: String,
    #[serde(default, alias = "personalization_factors")]
    personalization_fields: Option<RawFields>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFields {
    List(Vec<String>),
    Map(serde_json::Map<String, serde_json::Value>),
}

/// Extracts a template from a model reply. Tolerates code fences and prose
/// around the JSON object.
pub fn parse_template(raw: &str) -> Result<ContentTemplate, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }

    let parsed: RawContent =
        serde_json::from_str(&raw[start..=end]).map_err(|e| ParseError::Json(e.to_string()))?;

    let required = [
        ("title", &parsed.title),
        ("subject_line", &parsed.subject_line),
        ("content", &parsed.content),
        ("cta_text", &parsed.cta_text),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(ParseError::MissingField(*name));
    }

    let personalization_fields = match parsed.personalization_fields {
        Some(RawFields::List(list)) => list,
        Some(RawFields::Map(map)) => map.keys().cloned().collect(),
        None => Vec::new(),
    };

    Ok(ContentTemplate {
        title: parsed.title.trim().to_string(),
        subject_line: parsed.subject_line.trim().to_string(),
        content: parsed.content.trim().to_string(),
        cta_text: parsed.cta_text.trim().to_string(),
        personalization_fields,
        source: ContentSource::Generated,
    })
}

pub struct ContentAdapter {
    generator: Arc<dyn ContentGenerator>,
    timeout_ms: u64,
    engine: TemplateEngine,
}

impl ContentAdapter {
    pub fn new(generator: Arc<dyn ContentGenerator>, timeout_ms: u64) -> Self {
        Self {
            generator,
            timeout_ms,
            engine: TemplateEngine::new(),
        }
    }

    /// One generation call for the group. Never fails: transport errors,
    /// timeouts and unparsable replies all resolve to the local fallback.
    pub async fn generate(&self, ctx: &GenerationContext) -> GeneratedContent {
        let prompt = build_prompt(ctx);
        let outcome = bounded(
            "content generation",
            self.timeout_ms,
            self.generator.generate(&prompt),
        )
        .await
        .and_then(|raw| {
            parse_template(&raw).map_err(|e| CampaignError::Generation(e.to_string()))
        });

        match outcome {
            Ok(mut template) => {
                if template.personalization_fields.is_empty() {
                    template.personalization_fields = self.engine.placeholders(&template.content);
                }
                debug!(group = %ctx.group_label, title = %template.title, "Generated group content");
                GeneratedContent {
                    template,
                    error: None,
                }
            }
            Err(err) => {
                warn!(group = %ctx.group_label, error = %err, "Content generation failed, using fallback");
                counter!("content.fallbacks", "trigger" => ctx.trigger.as_str()).increment(1);
                GeneratedContent {
                    template: self.fallback(ctx),
                    error: Some(CampaignError::Generation(format!(
                        "{}: {}",
                        ctx.group_label,
                        generation_reason(err)
                    ))),
                }
            }
        }
    }

    pub fn fallback(&self, ctx: &GenerationContext) -> ContentTemplate {
        let mut template = fallback_template(ctx);
        template.personalization_fields = self.engine.placeholders(&template.content);
        template
    }
}

fn generation_reason(err: CampaignError) -> String {
    match err {
        CampaignError::Generation(reason) => reason,
        other => other.to_string(),
    }
}

const SYSTEM_PROMPT: &str = "You write email campaigns for an automotive service centre. \
Copy is friendly, professional and specific to the customer's vehicle. \
Reply with a single JSON object and nothing else.";

pub fn build_prompt(ctx: &GenerationContext) -> GenerationPrompt {
    let mut user = String::new();
    user.push_str(&format!(
        "Write one {} campaign for a group of {} customers (group: {}, location: {}).\n",
        ctx.trigger, ctx.member_count, ctx.group_label, ctx.location
    ));

    if let Some(w) = &ctx.weather {
        user.push_str(&format!(
            "Weather: {} ({}), {:.0}°C, humidity {}%. Focus on weather-related maintenance and safety.\n",
            w.condition, w.description, w.temperature, w.humidity
        ));
    }
    if let Some(h) = &ctx.holiday {
        user.push_str(&format!(
            "Holiday: {} on {} ({}), {} days away. Cultural significance: {}. Focus on holiday travel preparation.\n",
            h.name,
            h.date,
            h.kind,
            h.days_until,
            h.cultural_significance.as_deref().unwrap_or("N/A")
        ));
    }
    if let GroupKey::ServiceNeed(need) = &ctx.group_key {
        user.push_str(&format!("Primary service need of the group: {need}.\n"));
    }
    if let Some(angle) = &ctx.angle {
        user.push_str(&format!(
            "Segment: {} ({} priority). Theme: {}. Benefits: {}. Suggested call to action: {}.\n",
            angle.name,
            angle.priority,
            angle.title,
            angle.benefits.join(", "),
            angle.cta
        ));
    }

    user.push_str(
        "\nRespond with JSON of exactly this shape:\n\
         {\"title\": \"internal campaign title\", \
         \"subject_line\": \"email subject, at most 60 characters\", \
         \"content\": \"email body using placeholders\", \
         \"cta_text\": \"button text\", \
         \"personalization_fields\": [\"customer_name\", \"vehicle_info\"]}\n\
         Available placeholders: {{customer_name}}, {{vehicle_info}}, {{vehicle_make}}, \
         {{vehicle_model}}, {{vehicle_year}}, {{last_service_date}}, {{next_service_due}}, \
         {{mileage}}, {{warranty_status}}, {{warranty_end_date}}, {{urgency_message}}, \
         {{location}}, {{weather_condition}}, {{temperature}}, {{holiday_name}}, \
         {{holiday_greeting}}.",
    );

    GenerationPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Deterministic template keyed by trigger, then messaging angle, then
/// service need. Always complete.
pub fn fallback_template(ctx: &GenerationContext) -> ContentTemplate {
    let (title, subject_line, content, cta_text) = match ctx.trigger {
        TriggerKind::Weather => weather_fallback(ctx),
        TriggerKind::Holiday => holiday_fallback(ctx),
        TriggerKind::Lifecycle | TriggerKind::Scheduled => match (&ctx.angle, &ctx.group_key) {
            (Some(angle), _) => angle_fallback(angle),
            (None, GroupKey::ServiceNeed(need)) => service_fallback(*need),
            (None, GroupKey::Location(_)) => service_fallback(ServiceNeed::GeneralService),
        },
    };

    ContentTemplate {
        title,
        subject_line,
        content,
        cta_text,
        personalization_fields: Vec::new(),
        source: ContentSource::Fallback,
    }
}

type Parts = (String, String, String, String);

fn weather_fallback(ctx: &GenerationContext) -> Parts {
    let condition = ctx
        .weather
        .as_ref()
        .map(|w| w.condition.clone())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "Changing".to_string());
    (
        format!("{condition} Weather Vehicle Care - {}", ctx.location),
        format!("Prepare Your Vehicle for {condition} Weather"),
        format!(
            "Dear {{{{customer_name}}}},\n\n\
             With {} weather in {{{{location}}}}, make sure your {{{{vehicle_info}}}} is ready for the road.\n\n\
             Weather-ready services:\n\
             - AC system check\n\
             - Tire pressure adjustment\n\
             - Battery inspection\n\
             - Brake system review\n\n\
             {{{{urgency_message}}}}.\n\n\
             Stay safe on the roads!\n\
             Your Service Team",
            condition.to_lowercase()
        ),
        "Schedule Weather Check".to_string(),
    )
}

fn holiday_fallback(ctx: &GenerationContext) -> Parts {
    let name = ctx
        .holiday
        .as_ref()
        .map(|h| h.name.clone())
        .unwrap_or_else(|| "Upcoming Holiday".to_string());
    (
        format!("{name} Vehicle Preparation - {}", ctx.location),
        format!("Prepare Your Vehicle for {name}"),
        format!(
            "Dear {{{{customer_name}}}},\n\n\
             {{{{holiday_greeting}}}}\n\n\
             With {name} approaching, make sure your {{{{vehicle_info}}}} is ready for holiday travel and celebrations.\n\n\
             Holiday offers:\n\
             - Free vehicle inspection\n\
             - 20% off service packages\n\
             - Complimentary car wash\n\n\
             Your Service Team"
        ),
        "Book Holiday Service".to_string(),
    )
}

fn angle_fallback(angle: &MessagingAngle) -> Parts {
    let short_title: String = angle.title.chars().take(40).collect();
    let benefits = angle
        .benefits
        .iter()
        .map(|b| format!("- {b}"))
        .collect::<Vec<_>>()
        .join("\n");
    (
        angle.title.clone(),
        format!("Important: {short_title}"),
        format!(
            "Dear {{{{customer_name}}}},\n\n\
             Your {{{{vehicle_info}}}} needs attention based on its current stage of life.\n\
             {{{{urgency_message}}}}.\n\n\
             What we offer:\n{benefits}\n\n\
             Your Service Team"
        ),
        angle.cta.clone(),
    )
}

fn service_fallback(need: ServiceNeed) -> Parts {
    match need {
        ServiceNeed::WarrantyExpiring => (
            "Warranty Expiring Campaign".to_string(),
            "Your Vehicle Warranty is Expiring Soon!".to_string(),
            "Dear {{customer_name}},\n\n\
             Your {{vehicle_make}} {{vehicle_model}}'s warranty is about to expire.\n\
             Warranty expiry: {{warranty_end_date}} ({{warranty_status}}).\n\n\
             Still covered:\n\
             - Engine diagnostics\n\
             - Transmission check\n\
             - Electrical system\n\
             - Safety inspections\n\n\
             Book now to save money!"
                .to_string(),
            "Book Service Now".to_string(),
        ),
        ServiceNeed::ServiceOverdue => (
            "Service Overdue Campaign".to_string(),
            "Your Vehicle Service is Overdue".to_string(),
            "Dear {{customer_name}},\n\n\
             Your {{vehicle_make}} {{vehicle_model}} is due for service.\n\n\
             Last service: {{last_service_date}}\n\
             Recommended: every {{service_interval}} months\n\n\
             Overdue services can lead to decreased performance, higher fuel consumption and breakdowns.\n\n\
             Schedule your service today!"
                .to_string(),
            "Book Service Now".to_string(),
        ),
        ServiceNeed::HighMileage | ServiceNeed::GeneralService => (
            "Vehicle Service Reminder".to_string(),
            "Your Vehicle Needs Attention".to_string(),
            "Dear {{customer_name}},\n\n\
             This is a service reminder for your {{vehicle_info}} ({{mileage}}).\n\
             {{urgency_message}}.\n\n\
             Our team would like to help you keep your vehicle in excellent condition.\n\n\
             Your Service Team"
                .to_string(),
            "Schedule Service".to_string(),
        ),
    }
}
