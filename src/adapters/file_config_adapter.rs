//! INI file configuration adapter.

use crate::domain::error::DtbuildError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::fs;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DtbuildError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DtbuildError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_string(&content).map_err(|reason| DtbuildError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}
