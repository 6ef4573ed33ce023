//! File-based checkpoint store
//!
//! One JSON file per checkpoint, optionally zstd-compressed. Writes go to a
//! temporary file that is renamed into place.
//!
//! ```text
//! checkpoints/
//! └── {thread_id}/
//!     ├── checkpoint_00001.json[.zst]
//!     ├── checkpoint_00002.json[.zst]
//!     └── checkpoint_00003.json[.zst]
//! ```

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{CheckpointStore, StateSnapshot};
use crate::error::CheckpointError;
use crate::state::ResearchState;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    base_path: PathBuf,
    compression: bool,
}

impl FileCheckpointStore {
    pub fn new(base_path: impl Into<PathBuf>, compression: bool) -> Self {
        Self {
            base_path: base_path.into(),
            compression,
        }
    }

    /// Thread ids become directory names. Bytes outside `[A-Za-z0-9_-]` are
    /// written as `%XX`, so distinct ids never share a directory and no id
    /// can escape the base directory.
    fn thread_dir(&self, thread_id: &str) -> PathBuf {
        self.base_path.join(encode_thread_id(thread_id))
    }

    fn checkpoint_file(&self, dir: &Path, seq: usize) -> PathBuf {
        if self.compression {
            dir.join(format!("checkpoint_{seq:05}.json.zst"))
        } else {
            dir.join(format!("checkpoint_{seq:05}.json"))
        }
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), ZSTD_LEVEL)
            .map_err(|e| CheckpointError::Compression(format!("init failed: {e}")))?;
        encoder
            .write_all(data)
            .map_err(|e| CheckpointError::Compression(format!("write failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| CheckpointError::Compression(format!("finish failed: {e}")))
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        zstd::stream::decode_all(data).map_err(|e| CheckpointError::Compression(format!("decompression failed: {e}")))
    }

    fn parse_seq(path: &Path) -> Option<usize> {
        let filename = path.file_name()?.to_str()?;
        if !(filename.ends_with(".json") || filename.ends_with(".json.zst")) {
            return None;
        }
        filename.strip_prefix("checkpoint_")?.split('.').next()?.parse().ok()
    }

    /// Checkpoint files of a thread, ordered by sequence number
    async fn list_checkpoints(&self, dir: &Path) -> Result<Vec<(usize, PathBuf)>, CheckpointError> {
        if !fs::try_exists(dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(seq) = Self::parse_seq(&path) {
                files.push((seq, path));
            }
        }
        files.sort_by_key(|(seq, _)| *seq);
        Ok(files)
    }

    async fn read_state(path: &Path) -> Result<ResearchState, CheckpointError> {
        let data = fs::read(path).await?;
        let json = if path.extension().is_some_and(|ext| ext == "zst") {
            Self::decompress(&data)?
        } else {
            data
        };
        Ok(serde_json::from_slice(&json)?)
    }
}

fn encode_thread_id(thread_id: &str) -> String {
    if thread_id.is_empty() {
        // never produced by a non-empty id: `%` is always followed by two hex digits
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(thread_id.len());
    for byte in thread_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get_state(&self, thread_id: &str) -> Result<Option<ResearchState>, CheckpointError> {
        let dir = self.thread_dir(thread_id);
        match self.list_checkpoints(&dir).await?.last() {
            Some((_, path)) => Ok(Some(Self::read_state(path).await?)),
            None => Ok(None),
        }
    }

    async fn put_state(&self, thread_id: &str, state: &ResearchState) -> Result<(), CheckpointError> {
        let dir = self.thread_dir(thread_id);
        fs::create_dir_all(&dir).await?;

        let seq = self.list_checkpoints(&dir).await?.last().map_or(1, |(seq, _)| seq + 1);

        let json = serde_json::to_vec_pretty(state)?;
        let data = if self.compression { Self::compress(&json)? } else { json };

        let temp_path = dir.join(format!("checkpoint_{seq:05}.tmp"));
        let final_path = self.checkpoint_file(&dir, seq);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &final_path).await?;
        debug!(thread_id, seq, path = %final_path.display(), "Checkpoint written");
        Ok(())
    }

    async fn get_state_history(&self, thread_id: &str) -> Result<Vec<StateSnapshot>, CheckpointError> {
        let dir = self.thread_dir(thread_id);
        let mut history = Vec::new();
        for (_, path) in self.list_checkpoints(&dir).await? {
            let state = Self::read_state(&path).await?;
            history.push(StateSnapshot::from(&state));
        }
        Ok(history)
    }
}
