//! RPC boundary to the tracker backend.
//!
//! The backend answers every command with pre-rendered table text (or an
//! error message). This module only moves that text; parsing lives in
//! [`crate::parser`]. Calls are single-shot: no retries and no timeouts
//! beyond what the transport itself applies.

pub mod cli;
pub mod command;
pub mod error;
pub mod http;

use async_trait::async_trait;

pub use cli::CliBackend;
pub use command::BackendCommand;
pub use error::BackendError;
pub use http::HttpBackend;

/// A transport that executes one backend command and returns its raw output.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, command: &BackendCommand) -> Result<String, BackendError>;
}
