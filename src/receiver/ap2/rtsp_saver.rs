//! Captures raw RTSP request/response bytes to disk, gated by
//! `info.rtsp.saver.{enable,path,file}`. Protocol debugging only: never
//! consulted by the codec or session state machine, so a disabled or
//! failed-to-open saver has no effect on request handling.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors opening the capture file.
#[derive(Debug, thiserror::Error)]
pub enum RtspSaverError {
    /// The capture file could not be opened for appending.
    #[error("failed to open RTSP capture file {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Appends tagged, peer-addressed raw bytes to a single capture file.
pub struct RtspSaver {
    file: Mutex<File>,
}

impl RtspSaver {
    /// Open (or create) the capture file at `path` for appending.
    pub fn open(path: &Path) -> Result<Self, RtspSaverError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| RtspSaverError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Record an inbound request's raw bytes.
    pub fn record_request(&self, peer: &str, bytes: &[u8]) {
        self.write_tagged(peer, "REQUEST", bytes);
    }

    /// Record an outbound response's raw bytes.
    pub fn record_response(&self, peer: &str, bytes: &[u8]) {
        self.write_tagged(peer, "RESPONSE", bytes);
    }

    fn write_tagged(&self, peer: &str, tag: &str, bytes: &[u8]) {
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        let _ = writeln!(file, "--- {tag} {peer} ---");
        let _ = file.write_all(bytes);
        let _ = writeln!(file);
    }
}
