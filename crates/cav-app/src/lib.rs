//! cav-app: service layer between the simulation engine and front ends.
//!
//! Owns the background stepping worker and exposes the foreground control
//! surface: parameter get/set, start/stop/reset, recording toggle, playback,
//! scans, and session save/load. All requests are non-blocking hand-offs to
//! the worker except parameter access, which is synchronous.

pub mod compile;
pub mod error;
pub mod playback;
pub mod service;

pub use compile::{Runtime, compile_config};
pub use error::{AppError, AppResult};
pub use playback::PlaybackController;
pub use service::{ServiceStatus, SessionFormat, SimulatorService};
