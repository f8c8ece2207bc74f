pub mod config;
pub mod logging;
pub mod notifier;
pub mod poller;
pub mod practicum;
pub mod status;
