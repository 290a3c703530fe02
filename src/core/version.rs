//! Extension version discovery.
//!
//! The version lives in a source file as the first single-quoted literal,
//! e.g. `__version__ = '2.1.0'`.

use std::path::Path;

use crate::planner::PlanError;

/// Extract the text between the first pair of single quotes.
pub fn parse_version(contents: &str) -> Option<&str> {
    let mut parts = contents.splitn(3, '\'');
    parts.next()?;
    let version = parts.next()?;
    // An unterminated quote leaves only two parts.
    parts.next()?;
    Some(version)
}

/// Read and parse the version file.
pub fn read_version(path: &Path) -> Result<String, PlanError> {
    let contents = std::fs::read_to_string(path).map_err(|e| PlanError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let version = parse_version(&contents).ok_or_else(|| PlanError::VersionParse {
        path: path.to_path_buf(),
    })?;

    if parse_version_flexible(version).is_none() {
        tracing::warn!(
            "version `{}` in {} is not a semantic version",
            version,
            path.display()
        );
    }

    Ok(version.to_string())
}

/// Parse a version string into semver::Version, handling incomplete versions.
///
/// Handles versions like "2.1.0", "2.1.0.dev1", or "2.1".
pub fn parse_version_flexible(version_str: &str) -> Option<semver::Version> {
    let clean_version = version_str
        .trim()
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or(version_str)
        .trim_end_matches('.');

    if let Ok(v) = clean_version.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = clean_version.split('.').collect();
    let major = parts.first().and_then(|s| s.parse().ok())?;
    let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let patch = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_version_first_quotes() {
        assert_eq!(parse_version("__version__ = '2.1.0'\n"), Some("2.1.0"));
        assert_eq!(parse_version("v = '1.0'\nother = '9.9'"), Some("1.0"));
        assert_eq!(parse_version("__version__ = \"2.1.0\""), None);
        assert_eq!(parse_version("__version__ = '2.1.0"), None);
    }

    #[test]
    fn test_parse_version_flexible() {
        assert_eq!(
            parse_version_flexible("2.1.0.dev1"),
            Some(semver::Version::new(2, 1, 0))
        );
        assert_eq!(
            parse_version_flexible("2.1"),
            Some(semver::Version::new(2, 1, 0))
        );
        assert_eq!(parse_version_flexible("dev"), None);
    }

    #[test]
    fn test_read_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("version.py");
        std::fs::write(&path, "__version__ = '2.1.0'\n").unwrap();

        assert_eq!(read_version(&path).unwrap(), "2.1.0");
    }

    #[test]
    fn test_read_version_without_quotes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("version.py");
        std::fs::write(&path, "__version__ = 2\n").unwrap();

        assert!(matches!(
            read_version(&path),
            Err(PlanError::VersionParse { .. })
        ));
    }
}
