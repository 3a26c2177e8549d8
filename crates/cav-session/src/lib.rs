//! cav-session: recorded-session persistence.
//!
//! A session is a metadata block (capture timestamp, cavity parameters,
//! mechanical mode set) plus the history channels. Two encodings:
//! structured JSON (lossless, full channel set) and tabular CSV
//! (row-per-sample derived columns). Loading never mutates existing
//! in-memory state; a failed load leaves the caller's store untouched.

pub mod io;
pub mod types;

pub use io::{load_csv, load_json, save_csv, save_json};
pub use types::{SessionData, SessionMeta};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed session data: {what}")]
    Malformed { what: String },
}
