use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Declarative form of the command line, for deployments that pin their
/// stream setup in a file. Every field is optional; flags given on the
/// command line win over manifest values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionManifest {
    pub module: Option<PathBuf>,
    pub size: Option<Extent>,
    pub window: Option<Extent>,
    pub fps: Option<f32>,
    pub filter: Option<FilterSetting>,
    pub pointer: Option<bool>,
    pub still_color: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    Linear,
    Nearest,
}

impl SessionManifest {
    pub fn from_toml_str(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
