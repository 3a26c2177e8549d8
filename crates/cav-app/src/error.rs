//! Error types for the cav-app service layer.

/// Application error type that wraps errors from the backend crates and
/// provides a unified interface for front ends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cav-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<cav_config::ConfigError> for AppError {
    fn from(err: cav_config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<cav_mech::MechError> for AppError {
    fn from(err: cav_mech::MechError) -> Self {
        AppError::Init(err.to_string())
    }
}

impl From<cav_sim::SimError> for AppError {
    fn from(err: cav_sim::SimError) -> Self {
        match err {
            cav_sim::SimError::Init { .. } => AppError::Init(err.to_string()),
            _ => AppError::Simulation(err.to_string()),
        }
    }
}

impl From<cav_sim::ScanError> for AppError {
    fn from(err: cav_sim::ScanError) -> Self {
        AppError::Scan(err.to_string())
    }
}

impl From<cav_session::SessionError> for AppError {
    fn from(err: cav_session::SessionError) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<cav_core::CavError> for AppError {
    fn from(err: cav_core::CavError) -> Self {
        AppError::Backend {
            message: err.to_string(),
        }
    }
}
