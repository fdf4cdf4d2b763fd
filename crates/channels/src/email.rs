//! Transactional email composition.
//!
//! Turns a rendered dispatch record into the envelope handed to the
//! delivery service: plain-text body, an HTML body wrapping it with a CTA
//! button, and the configured tags.

use campaign_core::types::{DispatchRecord, OutboundEmail};

pub struct EmailComposer {
    tags: Vec<String>,
}

impl EmailComposer {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    pub fn compose(&self, record: &DispatchRecord) -> OutboundEmail {
        OutboundEmail {
            to_address: record.to_address.clone(),
            to_name: record.to_name.clone(),
            subject: record.subject.clone(),
            html_body: record.html_body.clone(),
            text_body: record.text_body.clone(),
            tags: self
                .tags
                .iter()
                .cloned()
                .chain(std::iter::once(record.group_label.clone()))
                .collect(),
            correlation_id: record.correlation_id,
        }
    }
}

/// Wraps a plain-text body in a minimal responsive layout with a CTA button.
pub fn html_body(text: &str, cta_text: &str) -> String {
    let paragraphs = escape_html(text).replace('\n', "<br>");
    format!(
        r##"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    {paragraphs}
    <div style="margin-top: 30px; text-align: center;">
      <a href="#book-service" style="background-color: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block;">{cta}</a>
    </div>
  </div>
</body>
</html>"##,
        cta = escape_html(cta_text)
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::DispatchStatus;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_html_body_escapes_and_wraps() {
        let html = html_body("Dear Asha,\nBrakes & tyres <50% off>", "Book Now");
        assert!(html.contains("Dear Asha,<br>Brakes &amp; tyres &lt;50% off&gt;"));
        assert!(html.contains(">Book Now</a>"));
    }

    #[test]
    fn test_compose_appends_group_tag() {
        let record = DispatchRecord {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            group_label: "weather_Mumbai".into(),
            customer_id: 1,
            to_address: "asha@example.com".into(),
            to_name: "Asha".into(),
            subject: "Rain ahead".into(),
            text_body: "Hi".into(),
            html_body: "<p>Hi</p>".into(),
            correlation_id: Uuid::new_v4(),
            status: DispatchStatus::Created,
            message_id: None,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
        };
        let email = EmailComposer::new(vec!["automated_campaign".into()]).compose(&record);
        assert_eq!(email.tags, vec!["automated_campaign", "weather_Mumbai"]);
        assert_eq!(email.correlation_id, record.correlation_id);
    }
}
