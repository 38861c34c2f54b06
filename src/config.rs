//! Demo configuration. Read once at startup from a JSON file; every section has defaults.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Classifier artifact location
    pub model: ModelConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// How many rows each page view shows
    pub render: RenderConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact file: `.onnx` (ONNX Runtime) or `.json` (scorecard)
    pub path: PathBuf,
    /// Optional expected-column schema for ONNX artifacts
    pub schema_path: Option<PathBuf>,
    /// Intra-op threads for ONNX Runtime
    pub onnx_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Rows of the raw upload shown in the preview
    pub preview_rows: usize,
    /// Rows of the scored table shown on the page
    pub result_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ids_model.onnx"),
            schema_path: None,
            onnx_threads: 1,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_rows: 10,
            result_rows: 20,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl DemoConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<DemoConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
