use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::Row;
use super::{Sheet, StoreError};

/// Local sheet: one JSON object per line. Columns it does not know about are
/// kept intact when a cell is updated.
pub struct JsonlSheet {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonlSheet {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(StoreError::Unavailable(format!(
                    "{} is a directory",
                    path.display()
                )))
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file does not exist yet");
            }
            Err(e) => return Err(StoreError::Unavailable(format!("{}: {}", path.display(), e))),
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    async fn read_lines(&self) -> Result<Vec<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::Unavailable(format!("{}: {}", self.path.display(), e))),
        }
    }

    /// Write to a sibling temp file, then rename over the original.
    async fn replace_lines(&self, lines: &[String]) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("jsonl.tmp");
        let mut content = lines.join("\n");
        content.push('\n');
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

#[async_trait]
impl Sheet for JsonlSheet {
    async fn rows(&self) -> Result<Vec<Row>, StoreError> {
        let lines = self.read_lines().await?;
        Ok(lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str::<Row>(line).unwrap_or_else(|e| {
                    // Keep the slot so positions still line up with the file.
                    warn!(line = i + 1, error = %e, "Unreadable store row");
                    Row::default()
                })
            })
            .collect())
    }

    async fn append(&self, row: &Row) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut line = serde_json::to_string(row).map_err(|e| StoreError::Write(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        file.flush().await.map_err(|e| StoreError::Write(e.to_string()))
    }

    async fn update_answer(&self, position: usize, answer: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut lines = self.read_lines().await?;
        let line = lines
            .get_mut(position)
            .ok_or(StoreError::RowNotFound(position))?;

        let mut value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| StoreError::Write(e.to_string()))?;
        let obj = value
            .as_object_mut()
            .ok_or_else(|| StoreError::Write(format!("row {} is not an object", position)))?;
        obj.insert("answer".to_string(), serde_json::Value::String(answer.to_string()));
        *line = serde_json::to_string(&value).map_err(|e| StoreError::Write(e.to_string()))?;

        self.replace_lines(&lines).await
    }
}
