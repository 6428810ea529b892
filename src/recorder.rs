//! Research-grade step traces. Each recording session owns a bounded channel
//! drained by one writer thread; when the channel is full the frame is
//! dropped so recording can never stall the simulation.

use crate::game::types::{Action, GameSnapshot};
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

const RECORD_DIR: &str = "records";
const QUEUE_CAPACITY: usize = 1000;

/// One frame of training data.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step_id: u64,
    pub ts: i64,
    pub state: GameSnapshot,
    pub action: Action,
    pub reward: f64,
    pub done: bool,
}

pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug)]
pub struct Recorder {
    queue: Option<mpsc::Sender<StepRecord>>,
    dropped: u64,
}

impl Recorder {
    /// Opens `records/game_<session>_<ts>.jsonl` and starts the writer.
    pub fn create(session_id: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(RECORD_DIR).context("failed to create records dir")?;
        let filename = format!("game_{session_id}_{}.jsonl", unix_millis() / 1000);
        let path: PathBuf = [RECORD_DIR, &filename].iter().collect();
        let file = File::create(&path)
            .with_context(|| format!("failed to create record file {}", path.display()))?;

        let (queue, mut frames) = mpsc::channel::<StepRecord>(QUEUE_CAPACITY);
        std::thread::Builder::new()
            .name("recorder-writer".to_string())
            .spawn(move || {
                let mut writer = BufWriter::new(file);
                while let Some(record) = frames.blocking_recv() {
                    match serde_json::to_vec(&record) {
                        Ok(mut line) => {
                            line.push(b'\n');
                            if writer.write_all(&line).is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(?error, "failed to encode step record");
                        }
                    }
                }
                let _ = writer.flush();
            })
            .context("failed to spawn recorder writer")?;

        tracing::info!(file = %filename, "recording started");
        Ok(Self {
            queue: Some(queue),
            dropped: 0,
        })
    }

    /// Non-blocking enqueue; frames are dropped when the writer is behind.
    pub fn record_step(&mut self, record: StepRecord) {
        let Some(queue) = &self.queue else { return };
        if queue.try_send(record).is_err() {
            self.dropped += 1;
        }
    }

    /// Flushes and stops the writer. Safe to call more than once.
    pub fn close(&mut self) {
        if self.queue.take().is_some() {
            if self.dropped > 0 {
                tracing::warn!(dropped = self.dropped, "recorder dropped frames");
            }
            tracing::info!("recording stopped");
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.close();
    }
}
