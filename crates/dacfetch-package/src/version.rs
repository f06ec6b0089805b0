//! NuGet version grammar.
//!
//! A NuGet version is one to four dot-separated numeric components, an
//! optional release label introduced by `-` and optional build metadata
//! introduced by `+`. Missing numeric components default to zero, so
//! `1.0`, `1.0.0` and `1.0.0.0` all denote the same version.

use std::{fmt, str::FromStr};

use crate::error::PackageError;

/// A parsed NuGet package version.
///
/// Equality and hashing follow the normalized string form produced by
/// [`Display`](fmt::Display).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NuGetVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    release_labels: Vec<String>,
    metadata: Option<String>,
}

impl NuGetVersion {
    /// Parses `value` using the NuGet version grammar.
    ///
    /// Returns `None` when the text is not a valid version.
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }

        let (rest, metadata) = match value.split_once('+') {
            Some((rest, metadata)) => {
                if !is_valid_dotted(metadata) {
                    return None;
                }
                (rest, Some(metadata.to_string()))
            }
            None => (value, None),
        };

        let (core, release_labels) = match rest.split_once('-') {
            Some((core, release)) => {
                if !is_valid_dotted(release) {
                    return None;
                }
                (core, release.split('.').map(String::from).collect())
            }
            None => (rest, Vec::new()),
        };

        let parts = core.split('.').collect::<Vec<_>>();
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            *slot = part.parse().ok().filter(|n| *n <= i32::MAX as u64)?;
        }

        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            release_labels,
            metadata,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    /// The normalized version without build metadata, lowercased.
    ///
    /// This is the form registries use in package download paths.
    pub fn to_path_segment(&self) -> String {
        let mut out = self.numeric_string();
        if self.is_prerelease() {
            out.push('-');
            out.push_str(&self.release_labels.join("."));
        }
        out.to_lowercase()
    }

    fn numeric_string(&self) -> String {
        if self.revision > 0 {
            format!(
                "{}.{}.{}.{}",
                self.major, self.minor, self.patch, self.revision
            )
        } else {
            format!("{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

fn is_valid_dotted(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for NuGetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.numeric_string())?;
        if self.is_prerelease() {
            write!(f, "-{}", self.release_labels.join("."))?;
        }
        if let Some(metadata) = &self.metadata {
            write!(f, "+{metadata}")?;
        }
        Ok(())
    }
}

impl FromStr for NuGetVersion {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PackageError::InvalidVersion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(input: &str) -> String {
        NuGetVersion::parse(input).unwrap().to_string()
    }

    #[test]
    fn test_parse_normalizes_components() {
        assert_eq!(normalized("1.0.0"), "1.0.0");
        assert_eq!(normalized("1.0"), "1.0.0");
        assert_eq!(normalized("1"), "1.0.0");
        assert_eq!(normalized("01.002.3"), "1.2.3");
        assert_eq!(normalized("1.0.0.0"), "1.0.0");
        assert_eq!(normalized("160.2.3.4"), "160.2.3.4");
    }

    #[test]
    fn test_parse_release_and_metadata() {
        let version = NuGetVersion::parse("1.2.3-Beta.1+build.42").unwrap();
        assert!(version.is_prerelease());
        assert!(!NuGetVersion::parse("1.2.3+build.42").unwrap().is_prerelease());
        assert_eq!(version.to_string(), "1.2.3-Beta.1+build.42");
        assert_eq!(version.to_path_segment(), "1.2.3-beta.1");

        assert_eq!(normalized("1.0.0-rc-1"), "1.0.0-rc-1");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for input in [
            "",
            "invalid",
            "1.0.0.0.0",
            "1..0",
            "1.0.",
            ".1",
            "1.0.0-",
            "1.0.0+",
            "1.0.0-beta..1",
            "1.0.0-be_ta",
            " 1.0.0",
            "-1.0.0",
            "1.a.0",
            "99999999999.0.0",
        ] {
            assert!(NuGetVersion::parse(input).is_none(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_equality_is_on_normalized_form() {
        assert_eq!(
            NuGetVersion::parse("1.0").unwrap(),
            NuGetVersion::parse("1.0.0.0").unwrap()
        );
        assert_ne!(
            NuGetVersion::parse("1.0.0").unwrap(),
            NuGetVersion::parse("1.0.1").unwrap()
        );
    }

    #[test]
    fn test_from_str_error_message() {
        let err = "invalid".parse::<NuGetVersion>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "The version 'invalid' is not a valid NuGet version"
        );
    }

    #[test]
    fn test_path_segment_drops_revision_zero() {
        let version = NuGetVersion::parse("2.0.0.0").unwrap();
        assert_eq!(version.to_path_segment(), "2.0.0");
        assert_eq!(
            NuGetVersion::parse("2.0.0.1+meta").unwrap().to_path_segment(),
            "2.0.0.1"
        );
    }
}
