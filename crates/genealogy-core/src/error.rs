use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripted batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    RootNotFound,
    CycleDetected,
    InvalidStatus,
    EdgeSourceFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::RootNotFound => "E2001",
            Self::CycleDetected => "E2003",
            Self::InvalidStatus => "E2005",
            Self::EdgeSourceFailed => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::RootNotFound => "Root assembly not found in edge table",
            Self::CycleDetected => "Genealogy cycle cut during tree build",
            Self::InvalidStatus => "Invalid lifecycle status value",
            Self::EdgeSourceFailed => "Edge table could not be loaded",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in genealogy.toml and retry."),
            Self::RootNotFound => Some(
                "Check the root identity (ParentSN) and the [[top_level]] patterns in the config.",
            ),
            Self::CycleDetected => {
                Some("A part is linked back to one of its ancestors; inspect the source rows.")
            }
            Self::InvalidStatus => Some("Use one of: Issued, Removed, Unknown."),
            Self::EdgeSourceFailed => Some(
                "Use a JSON array of edge rows or a SQLite snapshot with a genealogy_edges table.",
            ),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while loading edge data or building a genealogy.
///
/// Pruning and flattening are total and never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum GenealogyError {
    /// No edge row matched any configured top-level pattern.
    #[error("no top-level rows for root {root} (patterns: {})", patterns.join("; "))]
    RootNotFound { root: String, patterns: Vec<String> },

    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid status {0:?}: expected Issued, Removed or Unknown")]
    InvalidStatus(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edge table JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("edge table SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl GenealogyError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RootNotFound { .. } => ErrorCode::RootNotFound,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::InvalidStatus(_) => ErrorCode::InvalidStatus,
            Self::Io { .. } | Self::Json(_) | Self::Sqlite(_) => ErrorCode::EdgeSourceFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = GenealogyError> = std::result::Result<T, E>;
