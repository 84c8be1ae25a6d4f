use crate::kinds::{AgentKind, MarketMode};
use thiserror::Error;

/// Rejected configuration, raised before any simulation state is built
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Population is empty")]
    EmptyPopulation,

    #[error("Agent kind {kind} cannot trade in {mode:?} mode")]
    ModeMismatch { kind: AgentKind, mode: MarketMode },

    #[error("Shock period {period} must fall strictly inside 1..{terminal}")]
    ShockOutsideRun { period: u64, terminal: u64 },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fail unless `value` is a probability
pub fn check_probability(name: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("{value} is not in [0, 1]")))
    }
}

/// Fail unless `value` is finite and strictly positive
pub fn check_positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("{value} must be > 0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks() {
        assert!(check_probability("p", 0.5).is_ok());
        assert!(check_probability("p", 1.5).is_err());
        assert!(check_positive("b", 10.0).is_ok());
        assert!(check_positive("b", 0.0).is_err());
        assert!(check_positive("b", f64::NAN).is_err());
    }

    #[test]
    fn test_message_names_parameter() {
        let err = check_probability("bit_prob", -0.1).unwrap_err();
        assert!(err.to_string().contains("bit_prob"));
    }
}
