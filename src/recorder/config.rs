//! Recorder configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_BUFFER_SIZE;

/// Environment variable that can switch off node-tag autocompression.
pub const AUTOCOMPRESS_ENV: &str = "PIPETRACE_AUTOCOMPRESS";

/// How and where a recorder writes its trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Output file, opened on the first `turn_on`.
    #[serde(default = "default_file_name")]
    pub file_name: PathBuf,
    /// Wrap the output in an LZ4 frame.
    #[serde(default)]
    pub compressed: bool,
    /// Size of the output buffer in bytes. 0 writes through.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Write the text format instead of the binary one.
    #[serde(default)]
    pub ascii: bool,
    /// Drop whole-node tag sets that repeat the previous value.
    #[serde(default = "default_autocompress")]
    pub autocompress: bool,
    /// Track per-edge bandwidth watermarks.
    #[serde(default)]
    pub track_bandwidth: bool,
}

fn default_file_name() -> PathBuf {
    PathBuf::from("trace.ptr")
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_autocompress() -> bool {
    true
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            compressed: false,
            buffer_size: default_buffer_size(),
            ascii: false,
            autocompress: default_autocompress(),
            track_bandwidth: false,
        }
    }
}

impl RecorderConfig {
    /// Default configuration writing to `file_name`.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Default configuration adjusted by the environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `PIPETRACE_AUTOCOMPRESS`: `0`, `false` or `off` disables
    /// autocompression, anything else leaves the setting alone.
    pub fn with_env(mut self) -> Self {
        if let Ok(value) = std::env::var(AUTOCOMPRESS_ENV) {
            if env_disables(&value) {
                self.autocompress = false;
            }
        }
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn ascii(mut self, ascii: bool) -> Self {
        self.ascii = ascii;
        self
    }

    pub fn autocompress(mut self, autocompress: bool) -> Self {
        self.autocompress = autocompress;
        self
    }

    pub fn track_bandwidth(mut self, track_bandwidth: bool) -> Self {
        self.track_bandwidth = track_bandwidth;
        self
    }
}

fn env_disables(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off"
    )
}
