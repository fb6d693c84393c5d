//! Append-only JSONL metrics sink.
//!
//! One object per evaluated candidate. Write failures are logged and
//! otherwise ignored; metrics never affect trading state.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Candidate, FilterDecision};

/// One metrics line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub run_id: Uuid,
    pub ts: DateTime<Utc>,
    pub basket: String,
    pub strategy: String,
    pub legs: usize,
    pub shares_per_leg: Decimal,
    pub cost: Decimal,
    pub payout: Decimal,
    pub edge: Decimal,
    pub edge_pct: Decimal,
    pub exec_edge: Option<Decimal>,
    pub filtered: bool,
    pub reason: Option<String>,
    pub streak: u32,
}

impl MetricsRow {
    #[must_use]
    pub fn new(
        run_id: Uuid,
        candidate: &Candidate,
        decision: &FilterDecision,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            ts,
            basket: candidate.basket_key().to_string(),
            strategy: candidate.strategy().to_string(),
            legs: candidate.legs().len(),
            shares_per_leg: candidate.shares_per_leg(),
            cost: candidate.cost(),
            payout: candidate.payout(),
            edge: candidate.edge(),
            edge_pct: candidate.edge_pct(),
            exec_edge: decision.exec_edge,
            filtered: decision.filtered,
            reason: decision.reason.map(|r| r.as_str().to_string()),
            streak: decision.streak,
        }
    }
}

/// JSONL writer. Opens lazily and keeps the handle for the run.
pub struct MetricsSink {
    path: PathBuf,
    run_id: Uuid,
    writer: Option<BufWriter<File>>,
}

impl MetricsSink {
    /// New sink with a fresh run id.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            run_id: Uuid::new_v4(),
            writer: None,
        }
    }

    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("metrics writer unavailable"))
    }

    fn write_row(&mut self, row: &MetricsRow) -> crate::error::Result<()> {
        let line = serde_json::to_string(row)?;
        let writer = self.open()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Append one row; errors are logged and dropped.
    pub fn record(&mut self, candidate: &Candidate, decision: &FilterDecision, ts: DateTime<Utc>) {
        let row = MetricsRow::new(self.run_id, candidate, decision, ts);
        if let Err(e) = self.write_row(&row) {
            warn!(error = %e, path = %self.path.display(), "Failed to write metrics row");
            // Reopen on the next write.
            self.writer = None;
        }
    }
}
