// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod participant;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod words;
pub mod ws;
