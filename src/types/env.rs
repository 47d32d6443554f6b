// ABOUTME: The two promotion tiers: staging and production.
// ABOUTME: Display names feed labels and filenames; state keys stay test/prod for compatibility.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid environment: '{0}' (expected test, staging, prod, or production)")]
pub struct ParseEnvironmentError(pub String);

/// Promotion tier for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Staging, Environment::Production];

    /// Name used in container labels, container names, and proxy config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Key used in state.json and the project config's environments map.
    /// The on-disk names predate the staging/production terminology.
    pub fn state_key(&self) -> &'static str {
        match self {
            Environment::Staging => "test",
            Environment::Production => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staging" | "test" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ParseEnvironmentError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(
            "staging".parse::<Environment>().unwrap(),
            Environment::Staging
        );
        assert_eq!(
            "prod".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn display_and_state_key_differ() {
        assert_eq!(Environment::Staging.as_str(), "staging");
        assert_eq!(Environment::Staging.state_key(), "test");
        assert_eq!(Environment::Production.as_str(), "production");
        assert_eq!(Environment::Production.state_key(), "prod");
    }
}
