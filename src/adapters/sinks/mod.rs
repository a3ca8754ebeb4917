//! Notification sink adapters.

pub mod console;
pub mod log_sink;
pub mod webhook;

pub use console::ConsoleSink;
pub use log_sink::LogSink;
pub use webhook::WebhookSink;
