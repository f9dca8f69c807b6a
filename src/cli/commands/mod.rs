//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod index;
mod menu;
mod search;
mod serve;
mod transcribe;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::run_index;
pub use menu::run_menu;
pub use search::run_search;
pub use serve::run_serve;
pub use transcribe::run_transcribe;
