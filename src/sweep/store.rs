//! Durable storage for the sweep target and swap history
//!
//! `sweep.json` holds the current target and is replaced atomically.
//! `sweeps.jsonl` is append-only; every append is fsynced before the caller
//! may report success, so a crash never loses an acknowledged swap.

use crate::sweep::{SwapRecord, SwapStatus, SweepConfig};
use crate::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SWEEP_CONFIG_FILE: &str = "sweep.json";
pub const HISTORY_FILE: &str = "sweeps.jsonl";

/// How many records config queries show. Storage itself is unbounded.
pub const HISTORY_DISPLAY_LIMIT: usize = 10;

pub struct SweepStore {
    config_path: PathBuf,
    history_path: PathBuf,
}

impl SweepStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            config_path: data_dir.join(SWEEP_CONFIG_FILE),
            history_path: data_dir.join(HISTORY_FILE),
        }
    }

    pub fn target(&self) -> Result<Option<SweepConfig>> {
        if !self.config_path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.config_path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Replace the sweep target atomically.
    pub fn set_target(&self, config: &SweepConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.config_path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(config)?)?;
        std::fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }

    /// Append one record and fsync before returning.
    pub fn append(&self, record: &SwapRecord) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Full history in append order, one record per attempt (the last line
    /// written for an attempt wins).
    pub fn history(&self) -> Result<Vec<SwapRecord>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.history_path)?;
        let mut records: Vec<SwapRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: SwapRecord = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    warn!(lineno, error = %e, "Skipping unreadable history line");
                    continue;
                }
            };
            match index.get(&record.attempt_id) {
                Some(&i) => records[i] = record,
                None => {
                    index.insert(record.attempt_id.clone(), records.len());
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// The most recent `limit` records, newest last.
    pub fn recent(&self, limit: usize) -> Result<Vec<SwapRecord>> {
        let mut records = self.history()?;
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        Ok(records)
    }

    /// Attempts whose last known status is still `pending`.
    pub fn pending(&self) -> Result<Vec<SwapRecord>> {
        Ok(self
            .history()?
            .into_iter()
            .filter(|r| r.status == SwapStatus::Pending)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256, U256};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(attempt_id: &str, status: SwapStatus) -> SwapRecord {
        SwapRecord {
            attempt_id: attempt_id.to_string(),
            timestamp: Utc::now(),
            token: Address::repeat_byte(0x22),
            amount_in_wei: U256::from(1_000u64),
            amount_out_raw: Some(U256::from(5u64)),
            pool_version: Some(crate::router::PoolVersion::V3),
            fee_tier: Some(3_000),
            v4_hooks: None,
            tx_hash: Some(B256::repeat_byte(0xab)),
            status,
            error: None,
        }
    }

    #[test]
    fn target_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());
        assert!(store.target().unwrap().is_none());

        let config = SweepConfig {
            target_token: Address::repeat_byte(0x33),
            token_symbol: "TOKE".to_string(),
            network: "base".to_string(),
        };
        store.set_target(&config).unwrap();
        assert_eq!(store.target().unwrap(), Some(config));
    }

    #[test]
    fn append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());

        store.append(&record("a", SwapStatus::Pending)).unwrap();
        store.append(&record("b", SwapStatus::Confirmed)).unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].attempt_id, "a");
        assert_eq!(history[1].attempt_id, "b");
    }

    #[test]
    fn superseding_line_wins_without_rewriting_the_file() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());

        let first = record("a", SwapStatus::Pending);
        store.append(&first).unwrap();
        store
            .append(&first.with_status(SwapStatus::Confirmed, None))
            .unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SwapStatus::Confirmed);

        // Both lines remain on disk.
        let raw = std::fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[test]
    fn recent_caps_at_limit_keeping_newest() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());
        for i in 0..15 {
            store
                .append(&record(&format!("r{}", i), SwapStatus::Confirmed))
                .unwrap();
        }

        let recent = store.recent(HISTORY_DISPLAY_LIMIT).unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].attempt_id, "r5");
        assert_eq!(recent[9].attempt_id, "r14");
    }

    #[test]
    fn pending_filters_terminal_attempts() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());

        store.append(&record("a", SwapStatus::Pending)).unwrap();
        store.append(&record("b", SwapStatus::Failed)).unwrap();
        let resolved = record("c", SwapStatus::Pending);
        store.append(&resolved).unwrap();
        store
            .append(&resolved.with_status(SwapStatus::Confirmed, None))
            .unwrap();

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempt_id, "a");
    }

    #[test]
    fn unreadable_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = SweepStore::open(dir.path());
        store.append(&record("a", SwapStatus::Confirmed)).unwrap();

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join(HISTORY_FILE))
            .unwrap();
        writeln!(file, "{{not json").unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
    }
}
