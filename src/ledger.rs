use anyhow::Result;
use sled::{Db, Tree};
use std::sync::Arc;

use crate::models::TradeHistoryRecord;

/// Most-recent records kept; older entries are evicted on append.
pub const HISTORY_CAPACITY: usize = 10;

const HISTORY_TREE: &str = "trade_history";
const HISTORY_KEY: &[u8] = b"records";

/// Append-only, capacity-bounded trade history. The only durable state in
/// the core: survives process restart via sled.
#[derive(Clone)]
pub struct TradeHistoryLedger {
    _db: Arc<Db>,
    // K: HISTORY_KEY, V: Vec<TradeHistoryRecord> (json, newest-first)
    records: Tree,
}

impl TradeHistoryLedger {
    pub fn open(path: &str) -> Result<Self> {
        let _db = Arc::new(sled::open(path)?);
        Ok(Self {
            records: _db.open_tree(HISTORY_TREE)?,
            _db,
        })
    }

    /// Appends a record at the front and evicts beyond capacity. Concurrent
    /// attempts may finish together, so the read-modify-write runs as a
    /// compare-and-swap loop: a lost race re-reads and re-applies, and every
    /// terminal attempt keeps exactly one record.
    pub fn append(&self, record: TradeHistoryRecord) -> Result<()> {
        loop {
            let current = self.records.get(HISTORY_KEY)?;
            let mut records: Vec<TradeHistoryRecord> = match &current {
                Some(data) => serde_json::from_slice(data)?,
                None => Vec::new(),
            };
            records.insert(0, record.clone());
            records.truncate(HISTORY_CAPACITY);
            let kept = records.len();
            let updated = serde_json::to_vec(&records)?;
            if self
                .records
                .compare_and_swap(HISTORY_KEY, current, Some(updated))?
                .is_ok()
            {
                self.records.flush()?;
                println!("[Ledger] Recorded trade, {} record(s) kept", kept);
                return Ok(());
            }
        }
    }

    /// Returns the stored history, newest-first.
    pub fn list(&self) -> Result<Vec<TradeHistoryRecord>> {
        match self.records.get(HISTORY_KEY)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(Vec::new()),
        }
    }
}
