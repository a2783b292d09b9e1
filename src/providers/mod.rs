mod buildbot;

pub use buildbot::{BuildbotProvider, CollectSettings, DEFAULT_CONCURRENCY, DEFAULT_LOG_LINES};
