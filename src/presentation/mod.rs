pub mod config;
pub mod state;

pub use config::{Environment, Settings};
pub use state::AppState;
