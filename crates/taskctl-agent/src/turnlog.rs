//! Turn Logger: append-only, one JSON Lines file per agent id, for replay and
//! debugging. Disabled entirely when no log directory is configured — the
//! rest of the runtime never has to know the difference.

use std::path::PathBuf;

use taskctl_core::types::Turn;
use tokio::io::AsyncWriteExt;

pub struct TurnLogger {
    dir: Option<PathBuf>,
}

impl TurnLogger {
    pub fn new(dir: Option<&str>) -> Self {
        Self { dir: dir.map(PathBuf::from) }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub async fn append(&self, turn: &Turn) -> std::io::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let agent_dir = dir.join(turn.agent_id.as_str());
        tokio::fs::create_dir_all(&agent_dir).await?;

        let mut line = serde_json::to_string(turn)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(agent_dir.join("turns.jsonl"))
            .await?;
        file.write_all(line.as_bytes()).await
    }
}
