pub mod config;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod time;

pub use error::{BriefingError, Result};
