use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `AFTERSALES__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_location")]
    pub default_location: String,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub holidays: HolidayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderConfig {
    #[serde(default = "default_sender_email")]
    pub email: String,
    #[serde(default = "default_sender_name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_record_delay_ms")]
    pub record_delay_ms: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

/// Selection thresholds for service-need targeting.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetingConfig {
    #[serde(default = "default_overdue_days")]
    pub service_overdue_days: i64,
    #[serde(default = "default_due_soon_days")]
    pub service_due_soon_days: i64,
    #[serde(default = "default_targeting_warranty_days")]
    pub warranty_window_days: i64,
    #[serde(default = "default_high_mileage_km")]
    pub high_mileage_km: u32,
    #[serde(default = "default_min_vehicle_age_years")]
    pub min_vehicle_age_years: f64,
}

/// Cohort thresholds for lifecycle bucketing.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_new_owner_years")]
    pub new_owner_years: f64,
    #[serde(default = "default_early_owner_years")]
    pub early_owner_years: f64,
    #[serde(default = "default_mid_owner_years")]
    pub mid_owner_years: f64,
    #[serde(default = "default_high_mileage_km")]
    pub high_mileage_km: u32,
    #[serde(default = "default_ultra_high_mileage_km")]
    pub ultra_high_mileage_km: u32,
    #[serde(default = "default_lifecycle_warranty_days")]
    pub warranty_expiring_days: i64,
    #[serde(default = "default_overdue_days")]
    pub service_due_days: i64,
    #[serde(default = "default_never_serviced_days")]
    pub never_serviced_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_delivery_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HolidayConfig {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
    #[serde(default)]
    pub calendar_path: Option<String>,
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub seed_path: Option<String>,
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,
}

// Default functions
fn default_location() -> String {
    "Mumbai".to_string()
}
fn default_sender_email() -> String {
    "service@example.com".to_string()
}
fn default_sender_name() -> String {
    "Smart Campaigns".to_string()
}
fn default_batch_size() -> usize {
    50
}
fn default_record_delay_ms() -> u64 {
    100
}
fn default_batch_delay_ms() -> u64 {
    2000
}
fn default_send_timeout_ms() -> u64 {
    10_000
}
fn default_tags() -> Vec<String> {
    vec!["automated_campaign".to_string()]
}
fn default_overdue_days() -> i64 {
    180
}
fn default_due_soon_days() -> i64 {
    30
}
fn default_targeting_warranty_days() -> i64 {
    90
}
fn default_high_mileage_km() -> u32 {
    50_000
}
fn default_ultra_high_mileage_km() -> u32 {
    100_000
}
fn default_min_vehicle_age_years() -> f64 {
    3.0
}
fn default_new_owner_years() -> f64 {
    1.0
}
fn default_early_owner_years() -> f64 {
    3.0
}
fn default_mid_owner_years() -> f64 {
    5.0
}
fn default_lifecycle_warranty_days() -> i64 {
    180
}
fn default_never_serviced_days() -> i64 {
    365
}
fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}
fn default_content_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_delivery_url() -> String {
    "https://api.brevo.com/v3".to_string()
}
fn default_lookup_timeout_ms() -> u64 {
    10_000
}
fn default_generation_timeout_ms() -> u64 {
    30_000
}
fn default_days_ahead() -> u32 {
    30
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            email: default_sender_email(),
            name: default_sender_name(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            record_delay_ms: default_record_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            send_timeout_ms: default_send_timeout_ms(),
            tags: default_tags(),
        }
    }
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            service_overdue_days: default_overdue_days(),
            service_due_soon_days: default_due_soon_days(),
            warranty_window_days: default_targeting_warranty_days(),
            high_mileage_km: default_high_mileage_km(),
            min_vehicle_age_years: default_min_vehicle_age_years(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            new_owner_years: default_new_owner_years(),
            early_owner_years: default_early_owner_years(),
            mid_owner_years: default_mid_owner_years(),
            high_mileage_km: default_high_mileage_km(),
            ultra_high_mileage_km: default_ultra_high_mileage_km(),
            warranty_expiring_days: default_lifecycle_warranty_days(),
            service_due_days: default_overdue_days(),
            never_serviced_days: default_never_serviced_days(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_weather_url(),
            api_key: String::new(),
            timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_url: default_content_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_generation_timeout_ms(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_url: default_delivery_url(),
            api_key: String::new(),
        }
    }
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            days_ahead: default_days_ahead(),
            calendar_path: None,
            timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
            sender: SenderConfig::default(),
            dispatch: DispatchConfig::default(),
            targeting: TargetingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            weather: WeatherConfig::default(),
            content: ContentConfig::default(),
            delivery: DeliveryConfig::default(),
            holidays: HolidayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("AFTERSALES")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("dispatch.tags"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_business_heuristics() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.dispatch.batch_size, 50);
        assert_eq!(cfg.targeting.service_overdue_days, 180);
        assert_eq!(cfg.targeting.warranty_window_days, 90);
        assert_eq!(cfg.lifecycle.warranty_expiring_days, 180);
        assert_eq!(cfg.lifecycle.ultra_high_mileage_km, 100_000);
        assert_eq!(cfg.lifecycle.never_serviced_days, 365);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let cfg: AppConfig = serde_json::from_value(serde_json::json!({
            "dispatch": { "batch_size": 5 },
            "sender": { "email": "crm@garage.test" }
        }))
        .unwrap();
        assert_eq!(cfg.dispatch.batch_size, 5);
        assert_eq!(cfg.dispatch.batch_delay_ms, 2000);
        assert_eq!(cfg.sender.email, "crm@garage.test");
        assert_eq!(cfg.sender.name, "Smart Campaigns");
        assert_eq!(cfg.default_location, "Mumbai");
    }
}
