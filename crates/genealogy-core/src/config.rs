use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edge::{EdgeRow, Status};
use crate::error::{GenealogyError, Result};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "genealogy.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenealogyConfig {
    /// Status whose nodes (and their subtrees) are pruned.
    #[serde(default = "default_removal_status")]
    pub removal_status: Status,
    /// Rules selecting the beginning nodes of a build, in priority order.
    #[serde(default = "default_top_level")]
    pub top_level: Vec<TopLevelPattern>,
    #[serde(default)]
    pub clean: CleanConfig,
}

impl Default for GenealogyConfig {
    fn default() -> Self {
        Self {
            removal_status: default_removal_status(),
            top_level: default_top_level(),
            clean: CleanConfig::default(),
        }
    }
}

/// Substring rule matching a top-level installation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLevelPattern {
    /// Substring of the parent description (the root or an anchor assembly).
    pub parent_description: String,
    /// Substring of the child description (the assembly of interest).
    pub child_description: String,
}

impl TopLevelPattern {
    #[must_use]
    pub fn new(parent_description: &str, child_description: &str) -> Self {
        Self {
            parent_description: parent_description.to_string(),
            child_description: child_description.to_string(),
        }
    }

    /// Whether both descriptions of `row` contain this rule's substrings.
    #[must_use]
    pub fn matches_description(&self, row: &EdgeRow) -> bool {
        row.parent_description.contains(self.parent_description.as_str())
            && row.child_description.contains(self.child_description.as_str())
    }

    /// Whether `row` is a top-level row of `root` in a table that may hold
    /// other roots: the descriptions match and the parent serial is `root`.
    #[must_use]
    pub fn matches(&self, row: &EdgeRow, root: &str) -> bool {
        self.matches_description(row) && row.parent_serial.as_deref() == Some(root)
    }

    /// `PARENT -> CHILD`, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} -> {}", self.parent_description, self.child_description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Collapse `(child, parent)` pairs that carry a `Removed` row.
    #[serde(default = "default_true")]
    pub collapse_removed: bool,
    /// Keep only rows whose child description contains one of these.
    #[serde(default)]
    pub child_descriptions: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            collapse_removed: default_true(),
            child_descriptions: Vec::new(),
        }
    }
}

/// Parse a config file.
///
/// # Errors
///
/// Returns [`GenealogyError::Io`] if the file cannot be read and
/// [`GenealogyError::Config`] if it is not valid config TOML.
pub fn load_config(path: &Path) -> Result<GenealogyConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| GenealogyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<GenealogyConfig>(&content).map_err(|source| GenealogyError::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the effective config.
///
/// Precedence: `explicit` path, then `genealogy.toml` in `cwd`, then
/// `<config_dir>/genealogy/config.toml`, then built-in defaults. Returns the
/// path that was used, if any.
///
/// # Errors
///
/// Returns an error if the chosen file exists but cannot be parsed, or if an
/// explicit path cannot be read.
pub fn resolve_config(
    explicit: Option<&Path>,
    cwd: &Path,
) -> Result<(GenealogyConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }

    let candidates = [
        Some(cwd.join(CONFIG_FILE_NAME)),
        dirs::config_dir().map(|dir| dir.join("genealogy/config.toml")),
    ];

    for path in candidates.into_iter().flatten() {
        if path.exists() {
            debug!(path = %path.display(), "using config file");
            return Ok((load_config(&path)?, Some(path)));
        }
    }

    Ok((GenealogyConfig::default(), None))
}

const fn default_true() -> bool {
    true
}

const fn default_removal_status() -> Status {
    Status::Removed
}

fn default_top_level() -> Vec<TopLevelPattern> {
    vec![TopLevelPattern::new("STARLINK SATELLITE", "THRUSTER ASSEMBLY")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::tests::row;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg, GenealogyConfig::default());
        assert_eq!(cfg.removal_status, Status::Removed);
        assert!(cfg.clean.collapse_removed);
    }

    #[test]
    fn patterns_and_clean_section_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            r#"
removal_status = "Removed"

[[top_level]]
parent_description = "STARLINK SATELLITE"
child_description = "THRUSTER ASSEMBLY"

[[top_level]]
parent_description = "PRIMARY STRUCT"
child_description = "REGULATOR ASSEMBLY"

[clean]
collapse_removed = false
child_descriptions = ["THRUSTER ASSEMBLY", "PERMANENT MAGNET"]
"#,
        );
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.top_level.len(), 2);
        assert_eq!(cfg.top_level[1].parent_description, "PRIMARY STRUCT");
        assert!(!cfg.clean.collapse_removed);
        assert_eq!(cfg.clean.child_descriptions.len(), 2);
    }

    #[test]
    fn unknown_removal_status_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "removal_status = \"Scrapped\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, GenealogyError::Config { .. }));
        assert_eq!(err.code(), crate::error::ErrorCode::ConfigParseError);
    }

    #[test]
    fn explicit_path_wins_and_missing_explicit_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "removal_status = \"Unknown\"\n");
        let (cfg, used) = resolve_config(Some(&path), dir.path()).expect("resolve");
        assert_eq!(cfg.removal_status, Status::Unknown);
        assert_eq!(used.as_deref(), Some(path.as_path()));

        let missing = dir.path().join("nope.toml");
        assert!(resolve_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn cwd_file_is_discovered() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(dir.path(), "removal_status = \"Issued\"\n");
        let (cfg, used) = resolve_config(None, dir.path()).expect("resolve");
        assert_eq!(cfg.removal_status, Status::Issued);
        assert!(used.is_some());
    }

    #[test]
    fn pattern_matching_uses_substrings_and_parent_serial() {
        let mut edge = row(
            ("SL02-100", "STARLINK SATELLITE V2", "t0"),
            ("TA-7", "THRUSTER ASSEMBLY, KRYPTON", "t1"),
            Status::Issued,
        );
        edge.parent_serial = Some("11072".into());

        let pattern = TopLevelPattern::new("STARLINK SATELLITE", "THRUSTER ASSEMBLY");
        assert!(pattern.matches(&edge, "11072"));
        assert!(!pattern.matches(&edge, "99999"));

        edge.parent_serial = None;
        assert!(pattern.matches_description(&edge));
        assert!(!pattern.matches(&edge, "11072"));
        assert_eq!(pattern.describe(), "STARLINK SATELLITE -> THRUSTER ASSEMBLY");
    }
}
