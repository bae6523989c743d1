use serde::Deserialize;
use std::path::PathBuf;

/// Sample export configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory the sample file is created in
    /// Default: "."
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// File name prefix; a random suffix keeps files from colliding
    /// Default: "rtts-"
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { directory: default_directory(), prefix: default_prefix() }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix() -> String {
    "rtts-".to_string()
}
