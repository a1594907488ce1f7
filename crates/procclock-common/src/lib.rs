#![doc = "Common types shared across the procclock workspace."]

pub mod budget;
pub mod config;
pub mod error;
pub mod metrics;
pub mod state;
pub mod time;

pub use budget::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use state::*;
pub use time::*;
