use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::app::{ProgressEvent, ProgressSink, RunMetadata};
use crate::error::MetadataError;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_metadata(metadata: &RunMetadata) -> io::Result<()> {
        let json = Self::to_json(metadata).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    /// Writes the metadata next to `path` and renames it into place.
    pub fn write_metadata(path: &Utf8Path, metadata: &RunMetadata) -> Result<(), MetadataError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MetadataError::Filesystem(err.to_string()))?;
        let json = Self::to_json(metadata)
            .map_err(|err| MetadataError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("seqrun-meta")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetadataError::Filesystem(err.to_string()))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.write_all(b"\n"))
            .map_err(|err| MetadataError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| MetadataError::Filesystem(err.to_string()))?;
        info!(path = %path, samples = metadata.samples.len(), "wrote run metadata");
        Ok(())
    }

    fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
        serde_json::to_string_pretty(value)
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}
