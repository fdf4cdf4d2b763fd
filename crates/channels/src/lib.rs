//! Email delivery: message composition, paced batch dispatch and
//! per-recipient status tracking.

pub mod dispatch;
pub mod email;
pub mod pacing;

pub use dispatch::{DispatchEngine, DispatchReport};
pub use email::EmailComposer;
pub use pacing::{RatePlan, RecordingPacer, TokioPacer};
