//! FileProcessor - appends payloads to a JSON-lines spool file

use contracts::{ContractError, MessageProcessor, ProcessorPayload};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, instrument};

/// Configuration for FileProcessor
#[derive(Debug, Clone)]
pub struct FileProcessorConfig {
    /// Spool directory
    pub base_path: PathBuf,
}

impl FileProcessorConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'base_path' parameter".to_string())?;

        Ok(Self { base_path })
    }
}

/// Processor that spools each payload as one JSON line
///
/// Output goes to `<base_path>/<name>.jsonl`.
pub struct FileProcessor {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileProcessor {
    /// Create a new FileProcessor, creating the spool directory if needed
    pub fn new(name: impl Into<String>, config: FileProcessorConfig) -> std::io::Result<Self> {
        let name = name.into();
        fs::create_dir_all(&config.base_path)?;

        let path = config.base_path.join(format!("{name}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        debug!(processor = %name, path = %path.display(), "FileProcessor opened");

        Ok(Self {
            name,
            path,
            file: Mutex::new(file),
        })
    }

    /// Create from params map (for the registry)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileProcessorConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    /// Spool file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, payload: &ProcessorPayload) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(payload)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        file.flush()
    }
}

impl MessageProcessor for FileProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_processor_send",
        skip(self, payload),
        fields(processor = %self.name, message_id = %payload.saved_message_id)
    )]
    fn send_message(&self, payload: &ProcessorPayload) -> Result<bool, ContractError> {
        self.append(payload).map_err(|e| {
            ContractError::processor_send(
                &self.name,
                format!("failed to write {}: {e}", self.path.display()),
            )
        })?;
        Ok(true)
    }
}
