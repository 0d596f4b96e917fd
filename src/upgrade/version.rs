//! Semantic versions of tasklog releases.
//!
//! Release tags look like `v1.2.3` or `v1.2.3-beta.1`. Pre-releases order below
//! the stable release of the same `major.minor.patch`; among pre-releases the
//! channel name orders `alpha < beta < rc`, and the numeric counter breaks ties
//! within a channel.

use crate::core::UpdateError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An immutable `major.minor.patch[-prerelease]` version.
///
/// Build metadata (`+...`) is rejected so that equality and ordering agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(semver::Version);

impl Version {
    /// Parse a version string, tolerating a leading `v`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Parse`] when the text is not strictly
    /// `major.minor.patch[-prerelease]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tasklog::upgrade::Version;
    ///
    /// let v = Version::parse("v1.2.0-beta.3").unwrap();
    /// assert_eq!(v.to_string(), "1.2.0-beta.3");
    /// assert_eq!(v.prerelease(), "beta.3");
    /// assert!(Version::parse("dev").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        let trimmed = text.trim();
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parsed = semver::Version::parse(stripped).map_err(|e| UpdateError::Parse {
            input: text.to_string(),
            reason: e.to_string(),
        })?;

        if !parsed.build.is_empty() {
            return Err(UpdateError::Parse {
                input: text.to_string(),
                reason: "build metadata is not allowed in release versions".to_string(),
            });
        }

        Ok(Self(parsed))
    }

    /// Major component.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.0.major
    }

    /// Minor component.
    #[must_use]
    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    /// Patch component.
    #[must_use]
    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// The pre-release label (e.g. `alpha.1`), or `""` for a stable release.
    #[must_use]
    pub fn prerelease(&self) -> &str {
        self.0.pre.as_str()
    }

    /// Whether this is a stable release.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.0.pre.is_empty()
    }

    /// The channel part of the pre-release label (`alpha` for `alpha.1`).
    ///
    /// Returns `None` for stable releases.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        if self.is_stable() {
            return None;
        }
        self.prerelease().split('.').next()
    }

    /// Whether `self` orders strictly after `other`.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // semver precedence: stable > pre-release, identifiers compared
        // lexically with numeric identifiers compared numerically.
        self.0.cmp_precedence(&other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
