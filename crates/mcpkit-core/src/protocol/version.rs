//! Protocol version parsing and the supported-version set.
//!
//! Versions use the MCP `YYYY-MM-DD` form. Parsing failures are malformed
//! payloads; a well-formed but unknown version is a distinct failure
//! (`ProtocolError::UnsupportedVersion`) so callers can answer with the
//! internal-error code the handshake mandates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MCP protocol version in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("version must be in YYYY-MM-DD format")]
    InvalidFormat,
    #[error("version components must be valid numbers")]
    InvalidComponent,
    #[error("month must be between 1 and 12")]
    MonthOutOfRange,
    #[error("day must be between 1 and 31")]
    DayOutOfRange,
}

impl ProtocolVersion {
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Parse a version string in the format "YYYY-MM-DD".
    pub fn parse(version_str: &str) -> Result<Self, VersionParseError> {
        let parts: Vec<&str> = version_str.split('-').collect();
        if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
            return Err(VersionParseError::InvalidFormat);
        }

        let year = parts[0]
            .parse::<u16>()
            .map_err(|_| VersionParseError::InvalidComponent)?;
        let month = parts[1]
            .parse::<u8>()
            .map_err(|_| VersionParseError::InvalidComponent)?;
        let day = parts[2]
            .parse::<u8>()
            .map_err(|_| VersionParseError::InvalidComponent)?;

        if !(1..=12).contains(&month) {
            return Err(VersionParseError::MonthOutOfRange);
        }
        if !(1..=31).contains(&day) {
            return Err(VersionParseError::DayOutOfRange);
        }

        Ok(Self { year, month, day })
    }

    /// Latest version this framework speaks.
    pub const fn latest() -> Self {
        Self::new(2025, 6, 18)
    }

    /// All supported versions, oldest first.
    pub fn supported() -> &'static [ProtocolVersion] {
        const SUPPORTED: [ProtocolVersion; 2] = [
            ProtocolVersion::new(2024, 11, 5),
            ProtocolVersion::new(2025, 6, 18),
        ];
        &SUPPORTED
    }

    pub fn is_supported(&self) -> bool {
        Self::supported().contains(self)
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Check a client-offered version string against the supported set.
///
/// Returns the echoed version on success. Any failure — unparseable or
/// well-formed-but-unknown — is reported as the original string so the
/// handshake error message can quote the client's offer verbatim.
pub fn negotiate(offered: &str) -> Result<ProtocolVersion, String> {
    match ProtocolVersion::parse(offered) {
        Ok(version) if version.is_supported() => Ok(version),
        _ => Err(offered.to_string()),
    }
}
