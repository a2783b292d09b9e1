mod client;
mod collector;
mod extractor;
mod jobs;
mod provider;
mod types;

pub use collector::{CollectSettings, DEFAULT_CONCURRENCY};
pub use extractor::DEFAULT_LOG_LINES;
pub use provider::BuildbotProvider;
