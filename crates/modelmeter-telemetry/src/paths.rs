//! Path resolution for the on-disk data directory

use std::path::PathBuf;

/// Resolves the standard locations under the modelmeter data directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Data directory in the user's home (`~/.modelmeter`).
    pub fn new() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;
        Ok(Self { data_dir: home.join(".modelmeter") })
    }

    /// Use an explicit directory instead of the home default.
    pub fn at(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("telemetry.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_new() {
        let paths = Paths::new().unwrap();
        assert!(paths.data_dir.ends_with(".modelmeter"));
    }

    #[test]
    fn test_paths_at_override() {
        let paths = Paths::at(PathBuf::from("/tmp/mm-test"));
        assert_eq!(paths.db_path(), PathBuf::from("/tmp/mm-test/telemetry.db"));
        assert_eq!(paths.config_path(), PathBuf::from("/tmp/mm-test/config.json"));
        assert!(paths.exports_dir().ends_with("exports"));
    }
}
