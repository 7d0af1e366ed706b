//! Tunables for threshold decryption.
//!
//! Group parameters are compile-time constants (see `crypto::group`); the only runtime knob is
//! how far plaintext recovery is allowed to search.
//!
//! ```
//! use electionguard_tally::config::DecryptionConfig;
//!
//! let config = DecryptionConfig::from_json(r#"{ "max_tally": 5000 }"#).unwrap();
//! assert_eq!(config.max_tally, 5000);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default upper bound on any decrypted selection tally.
pub const DEFAULT_MAX_TALLY: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptionConfig {
    /// Largest count plaintext recovery will search for.  The search for a tally is further
    /// capped at the number of cast ballots, so this only matters for very large elections.
    pub max_tally: u64,
}

impl Default for DecryptionConfig {
    fn default() -> Self {
        DecryptionConfig {
            max_tally: DEFAULT_MAX_TALLY,
        }
    }
}

impl DecryptionConfig {
    pub fn new(max_tally: u64) -> Result<Self, ConfigError> {
        let config = DecryptionConfig { max_tally };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.  Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DecryptionConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tally == 0 {
            return Err(ConfigError::ZeroMaxTally);
        }
        Ok(())
    }

    /// Search bound for a tally built from `cast_count` ballots.
    pub fn tally_bound(&self, cast_count: u64) -> u64 {
        self.max_tally.min(cast_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = DecryptionConfig::from_json("{}").unwrap();
        assert_eq!(config, DecryptionConfig::default());
        assert_eq!(config.max_tally, DEFAULT_MAX_TALLY);
    }

    #[test]
    fn zero_bound_is_rejected() {
        assert_eq!(
            DecryptionConfig::from_json(r#"{ "max_tally": 0 }"#),
            Err(ConfigError::ZeroMaxTally)
        );
        assert!(DecryptionConfig::new(0).is_err());
        assert!(matches!(
            DecryptionConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bound_is_capped_by_cast_count() {
        let config = DecryptionConfig::new(10).unwrap();
        assert_eq!(config.tally_bound(3), 3);
        assert_eq!(config.tally_bound(30), 10);
    }
}
