//! OpenWeatherMap current-conditions adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use campaign_core::config::WeatherConfig;
use campaign_core::providers::WeatherProvider;
use campaign_core::types::WeatherFact;
use campaign_core::{CampaignError, CampaignResult};

use crate::http;

pub struct OpenWeatherProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    #[serde(default)]
    description: String,
}

impl OpenWeatherProvider {
    pub fn new(cfg: &WeatherConfig) -> CampaignResult<Self> {
        Ok(Self {
            base_url: http::trim_base(&cfg.api_url),
            api_key: cfg.api_key.clone(),
            client: http::client(cfg.timeout_ms).map_err(CampaignError::Config)?,
        })
    }
}

/// Maps the provider payload onto a `WeatherFact`. A payload without any
/// condition entry reports "Unknown".
pub fn parse_weather(location: &str, body: &str) -> CampaignResult<WeatherFact> {
    let payload: CurrentWeather = serde_json::from_str(body)
        .map_err(|e| CampaignError::Lookup(format!("weather payload for {location}: {e}")))?;
    let condition = payload.weather.into_iter().next();
    Ok(WeatherFact {
        location: location.to_string(),
        temperature: payload.main.temp,
        humidity: payload.main.humidity,
        condition: condition
            .as_ref()
            .map(|c| c.main.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        description: condition.map(|c| c.description).unwrap_or_default(),
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, location: &str) -> CampaignResult<WeatherFact> {
        let url = format!("{}/weather", self.base_url);
        debug!(%location, "GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| CampaignError::Lookup(format!("weather request: {e}")))?;
        let response = http::ensure_success(response)
            .await
            .map_err(|e| CampaignError::Lookup(format!("weather service: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| CampaignError::Lookup(format!("weather body: {e}")))?;

        parse_weather(location, &body)
    }
}
