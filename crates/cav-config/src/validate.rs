//! Configuration validation.

use crate::schema::SimConfig;
use crate::{ConfigError, ConfigResult};

pub fn validate_config(config: &SimConfig) -> ConfigResult<()> {
    if !(config.dt > 0.0) {
        return Err(ConfigError::Validation {
            what: "dt must be positive",
        });
    }
    if !(config.f0_hz > 0.0) {
        return Err(ConfigError::Validation {
            what: "f0 must be positive",
        });
    }
    if !(config.ql > 0.0) {
        return Err(ConfigError::Validation {
            what: "QL must be positive",
        });
    }
    if !(config.roq > 0.0) {
        return Err(ConfigError::Validation {
            what: "R/Q must be positive",
        });
    }
    if !(config.beta > 0.0) {
        return Err(ConfigError::Validation {
            what: "beta must be positive",
        });
    }
    if config.buf_size == 0 {
        return Err(ConfigError::Validation {
            what: "buf_size must be positive",
        });
    }
    if config.t_fill >= config.t_flat {
        return Err(ConfigError::Validation {
            what: "t_fill must be less than t_flat",
        });
    }
    if config.t_flat > config.buf_size {
        return Err(ConfigError::Validation {
            what: "t_flat must fit within buf_size",
        });
    }
    if config.pulse_len == 0 {
        return Err(ConfigError::Validation {
            what: "pulse_len must be positive",
        });
    }
    if !(config.microphonics_sigma >= 0.0) {
        return Err(ConfigError::Validation {
            what: "microphonics_sigma must be non-negative",
        });
    }
    if config.history_capacity == 0 {
        return Err(ConfigError::Validation {
            what: "history_capacity must be positive",
        });
    }
    if !(config.slowdown >= 0.0) {
        return Err(ConfigError::Validation {
            what: "slowdown must be non-negative",
        });
    }
    if config.modes.is_empty() {
        return Err(ConfigError::Validation {
            what: "at least one mechanical mode is required",
        });
    }
    for mode in &config.modes {
        if !(mode.freq_hz > 0.0) || !(mode.quality > 0.0) {
            return Err(ConfigError::Validation {
                what: "mode frequency and quality must be positive",
            });
        }
        if !mode.coupling.is_finite() {
            return Err(ConfigError::Validation {
                what: "mode coupling must be finite",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        validate_config(&SimConfig::default()).unwrap();
    }

    #[test]
    fn bad_windows_rejected() {
        let config = SimConfig {
            t_fill: 1300,
            t_flat: 510,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn empty_mode_table_rejected() {
        let config = SimConfig {
            modes: vec![],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
