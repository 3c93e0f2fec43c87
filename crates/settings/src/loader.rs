//! Load initial settings from a JSON document.
//!
//! ```json
//! {
//!   "theme": "dark",
//!   "ignoredAPIs": { "HTMLCanvasElement.toDataURL": true },
//!   "urls": [ { "url": "example.com", "showNotifications": false } ]
//! }
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, MemorySettings, Result, Scope};

/// On-disk settings document.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    /// URL-scoped overrides.
    #[serde(default)]
    urls: Vec<UrlEntry>,
    /// Global values.
    #[serde(flatten)]
    values: Map<String, Value>,
}

/// Overrides for one scope.
#[derive(Debug, Deserialize)]
struct UrlEntry {
    /// Domain or `^…$` pattern.
    url: String,
    /// Scoped values.
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl MemorySettings {
    /// Parse a settings document and return a loaded store.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Self::parse(source, None)
    }

    /// Read and parse a settings file and return a loaded store.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| Error::Read {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        Self::parse(&source, Some(path))
    }

    /// Shared parse path.
    fn parse(source: &str, path: Option<&Path>) -> Result<Self> {
        let file: SettingsFile = serde_json::from_str(source).map_err(|e| Error::Parse {
            path: path.map(Path::to_path_buf),
            line: e.line(),
            col: e.column(),
            message: e.to_string(),
        })?;
        let store = Self::new();
        for (k, v) in file.values {
            store.seed(k, v, None);
        }
        for entry in file.urls {
            let scope = Scope::parse(&entry.url);
            for (k, v) in entry.values {
                store.seed(k, v, Some(scope.clone()));
            }
        }
        store.mark_loaded();
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::{SettingsStore, keys};

    #[test]
    fn loads_globals_and_scopes() {
        let s = MemorySettings::from_json_str(
            r#"{
                "theme": "dark",
                "ignoredAPIs": {"x": true},
                "urls": [{"url": "example.com", "showNotifications": false}]
            }"#,
        )
        .unwrap();
        assert!(s.is_loaded());
        assert_eq!(s.theme(), "dark");
        assert!(s.ignored_apis().contains("x"));
        let u = Url::parse("https://example.com/").unwrap();
        assert_eq!(s.get(keys::SHOW_NOTIFICATIONS, Some(&u)), Some(json!(false)));
    }

    #[test]
    fn parse_errors_carry_location() {
        let err = MemorySettings::from_json_str("{\n  \"theme\": }").unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn reads_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"theme": "light"}}"#).unwrap();
        let s = MemorySettings::load_from_path(f.path()).unwrap();
        assert_eq!(s.theme(), "light");

        let missing = MemorySettings::load_from_path(Path::new("/nonexistent/settings.json"));
        assert!(matches!(missing, Err(Error::Read { .. })));
    }
}
