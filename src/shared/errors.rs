//! Error handling for the simulator

use thiserror::Error;

/// Engine errors. Both variants are fatal to the trial that raised them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Pool state would become invalid (non-positive reserves, fee rate >= 1, NaN)
    #[error("Domain error: {0}")]
    Domain(String),

    /// Invalid sizing or parameter input, rejected at construction
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SimError {
    pub fn domain(msg: impl Into<String>) -> Self {
        SimError::Domain(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Simulation error: {0}")]
    SimulationError(#[from] SimError),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ReportError(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_error_converts_into_app_error() {
        let err: AppError = SimError::domain("reserve_x would be -1").into();
        assert!(matches!(err, AppError::SimulationError(SimError::Domain(_))));
        assert_eq!(err.to_string(), "Simulation error: Domain error: reserve_x would be -1");
    }

    #[test]
    fn test_toml_error_is_config_error() {
        let parse: Result<toml::Value, _> = toml::from_str("pool = [");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
