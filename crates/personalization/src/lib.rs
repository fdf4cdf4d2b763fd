//! Content generation and per-recipient personalization.

pub mod content;
pub mod fields;
pub mod templating;

pub use content::{ContentAdapter, GeneratedContent, GenerationContext, MessagingAngle, ParseError};
pub use fields::{PersonalizationContext, Personalizer, RenderedMessage, RunFacts};
pub use templating::TemplateEngine;
