use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Format version written into every parameter log.
pub const LOG_VERSION: u32 = 1;

/// One saved parameter block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry<T> {
    /// Local time of the save, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub params: T,
}

/// Append-only history of parameter blocks for one object.
///
/// Stored as a JSON document:
///
/// ```json
/// { "version": 1, "history": [ { "timestamp": "...", "params": { ... } } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamLog<T> {
    pub version: u32,
    pub history: Vec<LogEntry<T>>,
}

impl<T> Default for ParamLog<T> {
    fn default() -> Self {
        ParamLog {
            version: LOG_VERSION,
            history: Vec::new(),
        }
    }
}

impl<T: Serialize + DeserializeOwned> ParamLog<T> {
    /// Read the log at `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(ParamLog::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading parameter log {}", path.display()))?;
        let doc: ParamLog<T> = serde_json::from_str(&text)
            .with_context(|| format!("parsing parameter log {}", path.display()))?;
        if doc.version > LOG_VERSION {
            bail!(
                "parameter log {} has version {}, this build understands up to {LOG_VERSION}",
                path.display(),
                doc.version
            );
        }
        Ok(doc)
    }

    /// Most recently saved parameters.
    pub fn latest(&self) -> Option<&T> {
        self.history.last().map(|entry| &entry.params)
    }

    /// Add `params` as a new timestamped entry at the end of the log at
    /// `path`. Earlier entries are carried over untouched.
    pub fn append(path: &Path, params: &T) -> Result<usize>
    where
        T: Clone,
    {
        let mut doc = ParamLog::<T>::load(path)?;
        doc.version = LOG_VERSION;
        doc.history.push(LogEntry {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            params: params.clone(),
        });
        let text = serde_json::to_string_pretty(&doc).context("serializing parameter log")?;
        fs::write(path, text + "\n")
            .with_context(|| format!("writing parameter log {}", path.display()))?;
        log::info!("appended entry {} to {}", doc.history.len(), path.display());
        Ok(doc.history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Knobs {
        lw: f64,
        annotations: bool,
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ParamLog::<Knobs>::load(&dir.path().join("none.parm.json")).unwrap();
        assert!(log.history.is_empty());
        assert_eq!(log.latest(), None);
    }

    #[test]
    fn append_keeps_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plotJ000000.parm.json");

        let first = Knobs { lw: 1.0, annotations: true };
        let second = Knobs { lw: 2.5, annotations: false };
        assert_eq!(ParamLog::append(&path, &first).unwrap(), 1);
        assert_eq!(ParamLog::append(&path, &second).unwrap(), 2);

        let log = ParamLog::<Knobs>::load(&path).unwrap();
        assert_eq!(log.version, LOG_VERSION);
        assert_eq!(log.history.len(), 2);
        assert_eq!(log.history[0].params, first);
        assert_eq!(log.latest(), Some(&second));
    }

    #[test]
    fn newer_versions_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.parm.json");
        fs::write(&path, r#"{"version": 99, "history": []}"#).unwrap();
        assert!(ParamLog::<Knobs>::load(&path).is_err());
    }
}
