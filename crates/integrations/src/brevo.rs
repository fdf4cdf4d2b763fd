//! Brevo transactional email adapter (`POST /smtp/email`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use campaign_core::config::{DeliveryConfig, SenderConfig};
use campaign_core::providers::MessageDelivery;
use campaign_core::types::OutboundEmail;
use campaign_core::{CampaignError, CampaignResult};

use crate::http;

pub struct BrevoDelivery {
    base_url: String,
    api_key: String,
    sender: SenderConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
    tags: &'a [String],
    headers: CorrelationHeader,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CorrelationHeader {
    #[serde(rename = "X-Correlation-Id")]
    correlation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: String,
}

impl BrevoDelivery {
    pub fn new(cfg: &DeliveryConfig, sender: SenderConfig, timeout_ms: u64) -> CampaignResult<Self> {
        Ok(Self {
            base_url: http::trim_base(&cfg.api_url),
            api_key: cfg.api_key.clone(),
            sender,
            client: http::client(timeout_ms).map_err(CampaignError::Config)?,
        })
    }

    fn request_body(&self, email: &OutboundEmail) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(SendRequest {
            sender: Contact {
                email: &self.sender.email,
                name: &self.sender.name,
            },
            to: [Contact {
                email: &email.to_address,
                name: &email.to_name,
            }],
            subject: &email.subject,
            html_content: &email.html_body,
            text_content: &email.text_body,
            tags: &email.tags,
            headers: CorrelationHeader {
                correlation_id: email.correlation_id.to_string(),
            },
        })
    }
}

pub fn parse_message_id(body: &str) -> CampaignResult<String> {
    let parsed: SendResponse = serde_json::from_str(body)
        .map_err(|e| CampaignError::Dispatch(format!("unexpected delivery response: {e}")))?;
    Ok(parsed.message_id)
}

#[async_trait]
impl MessageDelivery for BrevoDelivery {
    async fn send(&self, email: &OutboundEmail) -> CampaignResult<String> {
        let url = format!("{}/smtp/email", self.base_url);
        let body = self.request_body(email)?;
        debug!(to = %email.to_address, correlation_id = %email.correlation_id, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CampaignError::Dispatch(format!("delivery request: {e}")))?;
        let response = http::ensure_success(response)
            .await
            .map_err(|e| CampaignError::Dispatch(format!("delivery service: {e}")))?;
        let text = response
            .text()
            .await
            .map_err(|e| CampaignError::Dispatch(format!("delivery body: {e}")))?;

        parse_message_id(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            to_address: "asha@example.com".into(),
            to_name: "Asha Rao".into(),
            subject: "Monsoon ready?".into(),
            html_body: "<p>Hi</p>".into(),
            text_body: "Hi".into(),
            tags: vec!["automated_campaign".into(), "weather_Mumbai".into()],
            correlation_id: Default::default(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let delivery = BrevoDelivery::new(
            &DeliveryConfig::default(),
            SenderConfig {
                email: "service@dealer.example".into(),
                name: "Dealer Service".into(),
            },
            1000,
        )
        .unwrap();
        let body = delivery.request_body(&email()).unwrap();

        assert_eq!(body["sender"]["email"], "service@dealer.example");
        assert_eq!(body["to"][0]["email"], "asha@example.com");
        assert_eq!(body["to"][0]["name"], "Asha Rao");
        assert_eq!(body["htmlContent"], "<p>Hi</p>");
        assert_eq!(body["textContent"], "Hi");
        assert_eq!(body["tags"][1], "weather_Mumbai");
        assert!(body["headers"]["X-Correlation-Id"].is_string());
    }

    #[test]
    fn test_parse_message_id() {
        let id = parse_message_id(r#"{"messageId": "<202406151200.123@smtp-relay.mailin.fr>"}"#)
            .unwrap();
        assert_eq!(id, "<202406151200.123@smtp-relay.mailin.fr>");
        assert!(matches!(
            parse_message_id(r#"{"code": "unauthorized"}"#),
            Err(CampaignError::Dispatch(_))
        ));
    }
}
