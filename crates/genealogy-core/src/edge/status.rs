//! Lifecycle status carried on each installation edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GenealogyError;

/// Lifecycle marker of an installation edge.
///
/// `Issued` means currently installed, `Removed` means installed and later
/// taken out, `Unknown` covers everything the query layer could not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Status {
    Issued,
    Removed,
    #[default]
    Unknown,
}

impl Status {
    /// Canonical label, as emitted by the query layer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "Issued",
            Self::Removed => "Removed",
            Self::Unknown => "Unknown",
        }
    }

    /// Strict, case-insensitive parse of a canonical label.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "issued" => Some(Self::Issued),
            "removed" => Some(Self::Removed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Total parse used for edge rows: a missing or unrecognized value is
    /// `Unknown` so that partial rows still take part in the build.
    #[must_use]
    pub fn lenient(raw: Option<&str>) -> Self {
        raw.and_then(Self::from_label).unwrap_or_default()
    }

    /// Serde adapter for row fields: never fails on the value itself.
    pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::lenient(raw.as_deref()))
    }
}

impl FromStr for Status {
    type Err = GenealogyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| GenealogyError::InvalidStatus(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Status {
    /// Strict: configuration values must name a real status.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Status::from_label("Issued"), Some(Status::Issued));
        assert_eq!(Status::from_label(" removed "), Some(Status::Removed));
        assert_eq!(Status::from_label("UNKNOWN"), Some(Status::Unknown));
        assert_eq!(Status::from_label("scrapped"), None);
    }

    #[test]
    fn lenient_parse_falls_back_to_unknown() {
        assert_eq!(Status::lenient(None), Status::Unknown);
        assert_eq!(Status::lenient(Some("")), Status::Unknown);
        assert_eq!(Status::lenient(Some("garbage")), Status::Unknown);
        assert_eq!(Status::lenient(Some("Removed")), Status::Removed);
    }

    #[test]
    fn strict_parse_rejects_unknown_labels() {
        let err = "Scrapped".parse::<Status>().unwrap_err();
        assert!(matches!(err, GenealogyError::InvalidStatus(ref s) if s == "Scrapped"));
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&Status::Removed).unwrap();
        assert_eq!(json, "\"Removed\"");
    }
}
