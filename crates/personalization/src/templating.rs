//! Liquid-like placeholder renderer for message personalization.
//!
//! Supports `{{ name }}` and `{{ name | filter | filter }}`. Rendering is
//! total: every well-formed token is replaced, unknown names render as the
//! empty string and unknown filters are ignored.

use std::collections::HashMap;

type FilterFn = Box<dyn Fn(&str) -> String + Send + Sync>;

pub struct TemplateEngine {
    filters: HashMap<String, FilterFn>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut filters: HashMap<String, FilterFn> = HashMap::new();
        filters.insert("upcase".to_string(), Box::new(|s: &str| s.to_uppercase()));
        filters.insert("downcase".to_string(), Box::new(|s: &str| s.to_lowercase()));
        filters.insert(
            "capitalize".to_string(),
            Box::new(|s: &str| {
                let mut chars = s.chars();
                match chars.next() {
                    None => String::new(),
                    Some(c) => c.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
                }
            }),
        );
        filters.insert("strip".to_string(), Box::new(|s: &str| s.trim().to_string()));
        filters.insert(
            "truncate".to_string(),
            Box::new(|s: &str| {
                if s.chars().count() > 50 {
                    format!("{}...", s.chars().take(50).collect::<String>())
                } else {
                    s.to_string()
                }
            }),
        );
        filters.insert(
            "default".to_string(),
            Box::new(|s: &str| {
                if s.is_empty() {
                    "N/A".to_string()
                } else {
                    s.to_string()
                }
            }),
        );
        Self { filters }
    }

    pub fn render(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            match after_open.find("}}") {
                Some(end) => {
                    out.push_str(&self.render_token(&after_open[..end], vars));
                    rest = &after_open[end + 2..];
                }
                None => {
                    // Dangling opener: keep the text, drop the braces.
                    out.push_str(after_open);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Names referenced by `template`, in order of first appearance.
    pub fn placeholders(&self, template: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                break;
            };
            let name = token_name(&after_open[..end]);
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
            rest = &after_open[end + 2..];
        }
        names
    }

    fn render_token(&self, token: &str, vars: &HashMap<String, String>) -> String {
        let mut parts = token.split('|');
        let name = parts.next().map(str::trim).unwrap_or_default();
        let mut value = vars.get(name).cloned().unwrap_or_default();
        for filter in parts {
            if let Some(f) = self.filters.get(filter.trim()) {
                value = f(&value);
            }
        }
        value
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn token_name(token: &str) -> &str {
    token.split('|').next().map(str::trim).unwrap_or_default()
}
