//! Validation policy.
//!
//! Everything here has a default matching ICAO 9303 practice, so
//! `Config::default()` is a usable production configuration. Embedders that
//! keep settings in a file can load it with [`Config::from_json`]; missing
//! fields fall back to their defaults.

use {
    anyhow::{anyhow, Context, Result},
    serde::{Deserialize, Serialize},
    tracing::warn,
};

/// How to handle correctable deviations from ICAO 9303 structure rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leniency {
    /// Accept silently.
    Allow,

    /// Accept, but log a warning.
    #[default]
    Warn,

    /// Be strict and return an error.
    Strict,
}

impl Leniency {
    /// Applies the policy to a violated rule.
    ///
    /// Returns an error only in [`Leniency::Strict`] mode.
    pub fn check(self, msg: &'static str) -> Result<()> {
        match self {
            Self::Strict => Err(anyhow!(msg)),
            Self::Warn => {
                warn!("{msg}");
                Ok(())
            }
            Self::Allow => Ok(()),
        }
    }

    /// Applies the policy when `cond` does not hold.
    pub fn ensure(self, cond: bool, msg: &'static str) -> Result<()> {
        if cond {
            Ok(())
        } else {
            self.check(msg)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Maximum number of issuer hops from an end-entity to its trust anchor.
    pub max_chain_depth: usize,

    /// Treat CRLs outside their `thisUpdate..=nextUpdate` window as
    /// inapplicable and report `CRL_EXPIRED`.
    pub strict_crl: bool,

    /// Run the revocation step for the DSC during Passive Authentication.
    pub check_revocation: bool,

    /// Whether a DSC whose revocation could not be checked (no CRL) still
    /// counts as a valid chain.
    pub accept_unchecked_revocation: bool,

    /// ICAO 9303 structure rules on CMS SignedData (version, crls field,
    /// digest algorithms).
    pub structure: Leniency,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chain_depth:             5,
            strict_crl:                  true,
            check_revocation:            false,
            accept_unchecked_revocation: true,
            structure:                   Leniency::Warn,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid configuration")?;
        anyhow::ensure!(config.max_chain_depth > 0, "maxChainDepth must be positive");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_chain_depth, 5);
        assert!(config.strict_crl);
        assert!(!config.check_revocation);
        assert_eq!(config.structure, Leniency::Warn);
    }

    #[test]
    fn test_from_json_partial() -> Result<()> {
        let config = Config::from_json(r#"{ "checkRevocation": true, "structure": "strict" }"#)?;
        assert!(config.check_revocation);
        assert_eq!(config.structure, Leniency::Strict);
        assert_eq!(config.max_chain_depth, 5);
        Ok(())
    }

    #[test]
    fn test_from_json_rejects_zero_depth() {
        assert!(Config::from_json(r#"{ "maxChainDepth": 0 }"#).is_err());
    }

    #[test]
    fn test_leniency() {
        assert!(Leniency::Allow.check("x").is_ok());
        assert!(Leniency::Warn.check("x").is_ok());
        assert!(Leniency::Strict.check("x").is_err());
        assert!(Leniency::Strict.ensure(true, "x").is_ok());
    }
}
