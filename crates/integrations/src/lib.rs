//! HTTP and file-backed adapters for the pipeline's external services.

pub mod brevo;
pub mod calendar;
pub mod http;
pub mod openai;
pub mod openweather;

pub use brevo::BrevoDelivery;
pub use calendar::{CalendarEntry, StaticCalendar};
pub use openai::ChatCompletionGenerator;
pub use openweather::OpenWeatherProvider;
