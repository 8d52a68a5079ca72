//! Tick-window providers.
//!
//! The `TickProvider` trait is the boundary to the external historical-data
//! source. A miss is an empty vector, not an error; errors are reserved for
//! a provider that could not answer at all (unreadable file, bad rows).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::TickSnapshot;

/// Failures of a provider to answer a request.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of historical tick windows.
pub trait TickProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Snapshots with `start_ts <= timestamp < start_ts + duration_secs`, ordered by timestamp.
    ///
    /// An empty vector signals a miss.
    fn get_tick_window(
        &self,
        pool_address: &str,
        start_ts: i64,
        duration_secs: i64,
    ) -> Result<Vec<TickSnapshot>, ProviderError>;
}

/// Provider over snapshots held in memory, keyed by pool address.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    pools: HashMap<String, Vec<TickSnapshot>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add snapshots for a pool. Snapshots are kept sorted by timestamp.
    pub fn insert(&mut self, pool_address: impl Into<String>, snapshots: Vec<TickSnapshot>) {
        let entry = self.pools.entry(pool_address.into()).or_default();
        entry.extend(snapshots);
        entry.sort_by_key(|s| s.timestamp);
    }

    pub fn with_pool(mut self, pool_address: impl Into<String>, snapshots: Vec<TickSnapshot>) -> Self {
        self.insert(pool_address, snapshots);
        self
    }

    pub fn snapshot_count(&self, pool_address: &str) -> usize {
        self.pools.get(pool_address).map_or(0, Vec::len)
    }
}

impl TickProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn get_tick_window(
        &self,
        pool_address: &str,
        start_ts: i64,
        duration_secs: i64,
    ) -> Result<Vec<TickSnapshot>, ProviderError> {
        let Some(snapshots) = self.pools.get(pool_address) else {
            return Ok(Vec::new());
        };
        let end_ts = start_ts.saturating_add(duration_secs);
        let lo = snapshots.partition_point(|s| s.timestamp < start_ts);
        let hi = snapshots.partition_point(|s| s.timestamp < end_ts);
        Ok(snapshots[lo..hi].to_vec())
    }
}

/// One CSV row: a snapshot plus the pool it belongs to.
#[derive(Debug, Deserialize)]
struct CsvRow {
    pool_address: String,
    timestamp: i64,
    tick: i32,
    volume_usd: f64,
    fees_usd: f64,
    #[serde(default)]
    pool_fees_usd_from_inputs: f64,
    #[serde(default)]
    pool_fees_usd_two_sided: f64,
    fees_token0: f64,
    fees_token1: f64,
    reference_price: f64,
}

impl CsvRow {
    fn into_parts(self) -> (String, TickSnapshot) {
        let snapshot = TickSnapshot {
            timestamp: self.timestamp,
            tick: self.tick,
            volume_usd: self.volume_usd,
            fees_usd: self.fees_usd,
            pool_fees_usd_from_inputs: self.pool_fees_usd_from_inputs,
            pool_fees_usd_two_sided: self.pool_fees_usd_two_sided,
            fees_token0: self.fees_token0,
            fees_token1: self.fees_token1,
            reference_price: self.reference_price,
        };
        (self.pool_address, snapshot)
    }
}

/// Provider backed by a CSV export of snapshots.
///
/// Expected header: `pool_address,timestamp,tick,volume_usd,fees_usd,
/// pool_fees_usd_from_inputs,pool_fees_usd_two_sided,fees_token0,fees_token1,reference_price`.
#[derive(Debug, Clone)]
pub struct CsvTickProvider {
    inner: InMemoryProvider,
}

impl CsvTickProvider {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, ProviderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut by_pool: HashMap<String, Vec<TickSnapshot>> = HashMap::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            let (pool, snapshot) = row?.into_parts();
            by_pool.entry(pool).or_default().push(snapshot);
        }

        let mut inner = InMemoryProvider::new();
        let rows: usize = by_pool.values().map(Vec::len).sum();
        for (pool, snapshots) in by_pool {
            inner.insert(pool, snapshots);
        }
        log::debug!("loaded {rows} snapshots from csv");
        Ok(Self { inner })
    }

    pub fn snapshot_count(&self, pool_address: &str) -> usize {
        self.inner.snapshot_count(pool_address)
    }
}

impl TickProvider for CsvTickProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn get_tick_window(
        &self,
        pool_address: &str,
        start_ts: i64,
        duration_secs: i64,
    ) -> Result<Vec<TickSnapshot>, ProviderError> {
        self.inner.get_tick_window(pool_address, start_ts, duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(timestamp: i64, tick: i32) -> TickSnapshot {
        TickSnapshot {
            timestamp,
            tick,
            volume_usd: 100.0,
            fees_usd: 0.3,
            pool_fees_usd_from_inputs: 0.3,
            pool_fees_usd_two_sided: 0.6,
            fees_token0: 0.15,
            fees_token1: 0.0001,
            reference_price: 1500.0,
        }
    }

    #[test]
    fn window_is_half_open() {
        let provider = InMemoryProvider::new()
            .with_pool("0xpool", (0..10).map(|i| snap(i * 60, i as i32)).collect());
        let window = provider.get_tick_window("0xpool", 120, 180).unwrap();
        let stamps: Vec<i64> = window.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![120, 180, 240]);
    }

    #[test]
    fn window_near_time_limit_does_not_overflow() {
        let p = InMemoryProvider::new().with_pool("0xpool", vec![snap(i64::MAX - 5, 1)]);
        let got = p.get_tick_window("0xpool", i64::MAX - 10, 3_600).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn unknown_pool_is_a_miss() {
        let provider = InMemoryProvider::new();
        assert!(provider.get_tick_window("0xnone", 0, 3600).unwrap().is_empty());
    }

    #[test]
    fn insert_keeps_order() {
        let mut provider = InMemoryProvider::new();
        provider.insert("p", vec![snap(120, 2), snap(0, 0)]);
        provider.insert("p", vec![snap(60, 1)]);
        let ticks: Vec<i32> = provider
            .get_tick_window("p", 0, 1000)
            .unwrap()
            .iter()
            .map(|s| s.tick)
            .collect();
        assert_eq!(ticks, vec![0, 1, 2]);
    }

    #[test]
    fn csv_rows_are_grouped_by_pool() {
        let data = "\
pool_address,timestamp,tick,volume_usd,fees_usd,pool_fees_usd_from_inputs,pool_fees_usd_two_sided,fees_token0,fees_token1,reference_price
0xa,60,10,100.0,0.3,0.3,0.6,0.15,0.0001,1500.0
0xa,0,9,100.0,0.3,0.3,0.6,0.15,0.0001,1500.0
0xb,0,-5,50.0,0.15,0.15,0.3,0.07,0.00005,1500.0
";
        let provider = CsvTickProvider::from_reader(data.as_bytes()).unwrap();
        assert_eq!(provider.snapshot_count("0xa"), 2);
        assert_eq!(provider.snapshot_count("0xb"), 1);
        let window = provider.get_tick_window("0xa", 0, 3600).unwrap();
        assert_eq!(window[0].tick, 9);
        assert_eq!(window[1].tick, 10);
    }

    #[test]
    fn csv_bad_row_is_error() {
        let data = "pool_address,timestamp,tick\n0xa,notanumber,1\n";
        assert!(CsvTickProvider::from_reader(data.as_bytes()).is_err());
    }
}
