pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::TriggerConfig;
pub use error::{Result, TriggerError};
pub use events::WidgetEvent;
pub use types::*;
