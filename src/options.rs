//! Reader and writer configuration.
//!
//! Defaults are strict: every leniency is an explicit opt-in, and each switch
//! downgrades exactly one failure mode to an absent value, never to a guess.

use chrono::FixedOffset;

use crate::error::{GpxError, Result};

/// Reader configuration.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Substituted for a missing `creator` attribute on the root element.
    /// `None` keeps the default behavior: a root without a creator is
    /// skipped entirely.
    pub default_creator: Option<String>,

    /// Accept roots whose `version` attribute is not "1.1".
    pub ignore_version: bool,

    /// Treat an unparseable `<time>` value as absent instead of failing the
    /// read.
    pub ignore_bad_timestamps: bool,

    /// Offset applied to timestamps that carry no offset of their own.
    /// `None` resolves them against the system local zone.
    pub reference_offset: Option<FixedOffset>,
}

impl ReadOptions {
    /// Self-contradictory option combinations are rejected here, before any
    /// input is touched.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(creator) = &self.default_creator
            && creator.trim().is_empty()
        {
            return Err(GpxError::Config(
                "default_creator must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

/// Writer configuration.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Extra namespace bindings, as (prefix, URI) pairs, declared on the
    /// root element so extension content renders with stable prefixes.
    /// Matching declarations inside re-emitted extension fragments are
    /// suppressed.
    pub namespaces: Vec<(String, String)>,
}

impl WriteOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        for (i, (prefix, uri)) in self.namespaces.iter().enumerate() {
            if prefix.is_empty() || uri.is_empty() {
                return Err(GpxError::Config(
                    "namespace prefix and URI must be non-empty".to_string(),
                ));
            }
            if prefix == "xml" || prefix == "xmlns" {
                return Err(GpxError::Config(format!(
                    "namespace prefix '{prefix}' is reserved"
                )));
            }
            if self.namespaces[..i].iter().any(|(p, _)| p == prefix) {
                return Err(GpxError::Config(format!(
                    "namespace prefix '{prefix}' is bound twice"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_read_options_are_strict() {
        let opts = ReadOptions::default();
        assert!(opts.default_creator.is_none());
        assert!(!opts.ignore_version);
        assert!(!opts.ignore_bad_timestamps);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_empty_default_creator_rejected() {
        let opts = ReadOptions {
            default_creator: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(GpxError::Config(_))));
    }

    #[test]
    fn test_namespace_validation() {
        let ok = WriteOptions {
            namespaces: vec![("gpxtpx".to_string(), "http://example.com/tpx".to_string())],
        };
        assert!(ok.validate().is_ok());

        let reserved = WriteOptions {
            namespaces: vec![("xmlns".to_string(), "http://example.com".to_string())],
        };
        assert!(reserved.validate().is_err());

        let duplicate = WriteOptions {
            namespaces: vec![
                ("a".to_string(), "http://one".to_string()),
                ("a".to_string(), "http://two".to_string()),
            ],
        };
        assert!(duplicate.validate().is_err());

        let empty = WriteOptions {
            namespaces: vec![(String::new(), "http://one".to_string())],
        };
        assert!(empty.validate().is_err());
    }
}
