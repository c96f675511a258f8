// Library surface for the binary, headless integration tests and embedding.
// Terminal drawing stays in main.rs/ui.rs.
pub mod app_dirs;
pub mod classify;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod practice;
pub mod report;
pub mod results;
pub mod runtime;
pub mod session;
