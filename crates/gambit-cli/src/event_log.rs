use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use gambit_core::current_unix_timestamp_ms;
use gambit_types::{InboundMessage, Reply};
use serde::Serialize;

/// One dispatched message and the replies it produced.
#[derive(Debug, Serialize)]
pub(crate) struct DispatchRecord<'a> {
    pub(crate) conversation_id: &'a str,
    pub(crate) actor: &'a str,
    pub(crate) text: &'a str,
    pub(crate) replies: Vec<String>,
    pub(crate) timestamp_unix_ms: u64,
}

impl<'a> DispatchRecord<'a> {
    pub(crate) fn new(message: &'a InboundMessage, replies: &[Reply]) -> Self {
        Self {
            conversation_id: &message.conversation_id,
            actor: &message.sender.full_name,
            text: &message.text,
            replies: replies.iter().map(Reply::to_payload).collect(),
            timestamp_unix_ms: current_unix_timestamp_ms(),
        }
    }
}

/// Append-only JSONL file shared across dispatch workers.
#[derive(Clone)]
pub(crate) struct JsonlEventLog {
    path: PathBuf,
    file: Arc<Mutex<std::fs::File>>,
}

impl JsonlEventLog {
    pub(crate) fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub(crate) fn append(&self, record: &DispatchRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(record).context("failed to encode log event")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("event log mutex is poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}
