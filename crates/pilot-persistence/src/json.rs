//! JSON-file-backed store.
//!
//! Layout under the data directory:
//! - `settings.json`, `trades.json`, `performance.json`: whole-collection
//!   JSON documents, rewritten atomically (temp file + rename) on mutation.
//! - `analyses.jsonl`: append-only JSON Lines audit of every analysis
//!   pass; partial corruption only affects individual lines.

use crate::error::{StoreError, StoreResult};
use crate::store::{AnalysisStore, PerformanceStore, SettingsStore, TradeStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use pilot_core::{AnalysisRecord, DailyPerformance, Settings, Trade};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Default)]
struct State {
    settings: Option<Settings>,
    trades: HashMap<String, Trade>,
    performance: HashMap<NaiveDate, DailyPerformance>,
}

/// File-backed implementation of all four repositories.
pub struct JsonStore {
    dir: PathBuf,
    state: Mutex<State>,
}

impl JsonStore {
    /// Open (or create) a store rooted at `dir`, loading existing data.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let state = State {
            settings: load_json(&dir.join("settings.json"))?,
            trades: load_json(&dir.join("trades.json"))?.unwrap_or_default(),
            performance: load_json(&dir.join("performance.json"))?.unwrap_or_default(),
        };

        info!(
            dir = %dir.display(),
            trades = state.trades.len(),
            "Opened JSON store"
        );

        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    fn write_collection<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        {
            let mut file = File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, value)?;
            file.flush()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn flush_trades(&self, state: &State) -> StoreResult<()> {
        self.write_collection("trades.json", &state.trades)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // A corrupt collection must not take the agent down; start
                // fresh and keep the broken file for inspection.
                warn!(path = %path.display(), error = %e, "Corrupt collection, ignoring");
                let _ = std::fs::rename(path, path.with_extension("corrupt"));
                Ok(None)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(e)),
    }
}

#[async_trait]
impl SettingsStore for JsonStore {
    async fn load(&self) -> StoreResult<Option<Settings>> {
        Ok(self.state.lock().settings.clone())
    }

    async fn save(&self, settings: &Settings) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.settings = Some(settings.clone());
        self.write_collection("settings.json", settings)
    }
}

#[async_trait]
impl TradeStore for JsonStore {
    async fn insert(&self, trade: &Trade) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.trades.insert(trade.id.clone(), trade.clone());
        self.flush_trades(&state)
    }

    async fn update(&self, trade: &Trade) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.trades.contains_key(&trade.id) {
            return Err(StoreError::NotFound(trade.id.clone()));
        }
        state.trades.insert(trade.id.clone(), trade.clone());
        self.flush_trades(&state)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Trade>> {
        Ok(self.state.lock().trades.get(id).cloned())
    }

    async fn open_trades(&self) -> StoreResult<Vec<Trade>> {
        Ok(self
            .state
            .lock()
            .trades
            .values()
            .filter(|t| t.is_open())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalysisStore for JsonStore {
    async fn append(&self, record: &AnalysisRecord) -> StoreResult<()> {
        // Append mode: an interrupted write can only damage the last line.
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("analyses.jsonl"))?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for JsonStore {
    async fn get(&self, date: NaiveDate) -> StoreResult<Option<DailyPerformance>> {
        Ok(self.state.lock().performance.get(&date).cloned())
    }

    async fn upsert(&self, performance: &DailyPerformance) -> StoreResult<()> {
        let mut state = self.state.lock();
        state
            .performance
            .insert(performance.date, performance.clone());
        self.write_collection("performance.json", &state.performance)
    }
}
