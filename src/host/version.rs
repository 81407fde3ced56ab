//! Host build metadata and release-era classification.
//!
//! The host ships no stable API contract, but its build metadata string is reliable
//! and carries the release number this adapter keys its layout expectations off.
//! Two behavioral cutoffs matter here:
//!
//! - Release 13 started normalizing online-index keys to lowercase.
//! - Release 17 started shipping obfuscated internal member names; some
//!   distributions re-map those back to readable names, which is why the mapping
//!   mode is carried separately from the version.

use std::fmt;

use strum::{Display, EnumIter};

use crate::{Error, Result};

/// First release that normalizes online-index keys to lowercase.
const CASE_FOLD_RELEASE: u32 = 13;

/// First release that ships obfuscated internal member names.
const OBFUSCATION_RELEASE: u32 = 17;

/// A parsed host release number.
///
/// Parsed from the build metadata string, e.g. `"17.2"` or `"20.4-R0.1-SNAPSHOT"`;
/// anything after the first `-` is a distribution suffix and ignored.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HostVersion {
    /// Major release number
    pub major: u32,
    /// Minor release number
    pub minor: u32,
    /// Patch release number
    pub patch: u32,
}

impl HostVersion {
    /// Creates a version from its components
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        HostVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parses a build metadata string of the form `major[.minor[.patch]][-suffix]`.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedBuild`] if the string carries no parsable
    /// release number.
    pub fn parse(raw: &str) -> Result<Self> {
        let release = raw.split('-').next().unwrap_or(raw).trim();
        if release.is_empty() {
            return Err(Error::UnsupportedBuild(format!("empty build metadata {raw:?}")));
        }

        let mut parts = release.split('.');
        let mut component = |name: &str| -> Result<u32> {
            match parts.next() {
                None => Ok(0),
                Some(s) => s
                    .parse::<u32>()
                    .map_err(|_| Error::UnsupportedBuild(format!("invalid {name} in {raw:?}"))),
            }
        };

        let major = component("major release")?;
        let minor = component("minor release")?;
        let patch = component("patch release")?;
        Ok(HostVersion::new(major, minor, patch))
    }

    /// `true` if this version is at or above the given major release
    #[must_use]
    pub fn is_or_over(&self, major: u32) -> bool {
        self.major >= major
    }

    /// `true` if this version is below the given major release
    #[must_use]
    pub fn is_below(&self, major: u32) -> bool {
        self.major < major
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Whether the build's internal member names are obfuscated or readable.
///
/// Distributions that re-map obfuscated names back to readable ones exist for
/// every era, so this is build metadata in its own right rather than a pure
/// version fact.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mappings {
    /// Internal member names are human-readable
    Readable,
    /// Internal member names are obfuscated short names
    Obfuscated,
}

/// Build metadata of the running host, the input to era classification.
#[derive(Clone, Debug)]
pub struct HostBuild {
    /// Parsed release number
    pub version: HostVersion,
    /// Mapping mode of internal member names
    pub mappings: Mappings,
}

impl HostBuild {
    /// Creates build metadata from a version and a mapping mode
    #[must_use]
    pub fn new(version: HostVersion, mappings: Mappings) -> Self {
        HostBuild { version, mappings }
    }

    /// Parses build metadata from a raw version string and a mapping mode.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedBuild`] if the version string is unparsable.
    pub fn parse(raw: &str, mappings: Mappings) -> Result<Self> {
        Ok(HostBuild::new(HostVersion::parse(raw)?, mappings))
    }
}

/// Major version era of the host, classified once by the capability probe.
///
/// Eras group releases by the internal-layout behaviors this adapter must
/// branch on, not by feature content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, EnumIter)]
pub enum VersionEra {
    /// Before release 13: case-preserving index keys, readable member names
    Legacy,
    /// Releases 13 through 16: lowercased index keys, readable member names
    Interim,
    /// Release 17 and later: lowercased index keys, obfuscated member names
    /// unless the distribution re-maps them
    Modern,
}

impl VersionEra {
    /// Classifies a host version into its era
    #[must_use]
    pub fn of(version: &HostVersion) -> Self {
        if version.is_below(CASE_FOLD_RELEASE) {
            VersionEra::Legacy
        } else if version.is_below(OBFUSCATION_RELEASE) {
            VersionEra::Interim
        } else {
            VersionEra::Modern
        }
    }

    /// `true` if hosts of this era normalize online-index keys to lowercase
    #[must_use]
    pub fn folds_index_keys(&self) -> bool {
        *self >= VersionEra::Interim
    }

    /// `true` if hosts of this era ship obfuscated member names by default
    #[must_use]
    pub fn ships_obfuscated_names(&self) -> bool {
        *self >= VersionEra::Modern
    }
}
