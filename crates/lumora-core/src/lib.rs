pub mod config;
pub mod dialog;
pub mod error;
pub mod intent;
pub mod machine;
pub mod prompt;

pub use config::{BotConfig, ScenarioConfig};
pub use dialog::DialogueController;
pub use error::ChatError;
pub use machine::{Outcome, Slot};
