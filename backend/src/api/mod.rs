//! HTTP API module.
//!
//! The server exposes the pipeline to a browser front end; the log
//! broadcaster is shared with the CLI.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
