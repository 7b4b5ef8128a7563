//! Append-only, newline-delimited history log

use crate::errors::{MonitorError, Result};
use crate::models::HistoryRecord;
use chrono::NaiveDateTime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Outcome of a retention sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub kept: usize,
    pub removed: usize,
}

/// History log shared by every sweep.
///
/// Appends and compaction take the same lock. Scans never lock: compaction
/// replaces the file with a rename, so a reader sees either the old or the
/// new log in full.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Open the store at `path`. The file may be absent, its directory may not.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if !dir.is_dir() {
            return Err(MonitorError::Config(format!(
                "history directory does not exist: {}",
                dir.display()
            )));
        }

        debug!("History store opened at {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line
    pub async fn append(&self, record: &HistoryRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| store_error("open for append", &self.path, e))?;

        file.write_all(&line)
            .await
            .map_err(|e| store_error("append to", &self.path, e))?;
        file.flush()
            .await
            .map_err(|e| store_error("flush", &self.path, e))?;

        Ok(())
    }

    /// Records for `url` stamped at or after `since`, in file order.
    ///
    /// An unreadable log degrades to an empty result.
    pub async fn scan(&self, url: &str, since: NaiveDateTime) -> Vec<HistoryRecord> {
        match self.try_scan(url, since).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Reading history for {} failed, returning no records: {}", url, e);
                Vec::new()
            }
        }
    }

    /// Like [`HistoryStore::scan`] but reports read failures
    pub async fn try_scan(&self, url: &str, since: NaiveDateTime) -> Result<Vec<HistoryRecord>> {
        let lines = self.read_lines().await?;

        Ok(lines
            .iter()
            .filter_map(|line| parse_line(line))
            .filter(|record| record.url == url && record.timestamp >= since)
            .collect())
    }

    /// Drop every record older than `cutoff`, for all urls.
    ///
    /// Surviving lines are kept byte-for-byte and in order. The new log is
    /// written next to the old one and renamed over it, so a failure leaves
    /// the previous log untouched.
    #[instrument(skip(self))]
    pub async fn compact(&self, cutoff: NaiveDateTime) -> Result<CompactionStats> {
        let _guard = self.write_lock.lock().await;

        let lines = self.read_lines().await?;
        if lines.is_empty() && !self.path.exists() {
            debug!("No history to compact at {}", self.path.display());
            return Ok(CompactionStats::default());
        }

        let mut kept = Vec::with_capacity(lines.len());
        let mut removed = 0;

        for line in lines {
            match parse_line(&line) {
                Some(record) if record.timestamp >= cutoff => kept.push(line),
                _ => removed += 1,
            }
        }

        let mut contents = String::new();
        for line in &kept {
            contents.push_str(line);
            contents.push('\n');
        }

        let tmp_path = self.tmp_path();
        if let Err(e) = replace_file(&tmp_path, &self.path, contents.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(store_error("compact", &self.path, e));
        }

        let stats = CompactionStats {
            kept: kept.len(),
            removed,
        };
        info!(
            "Compacted history {}: kept {}, removed {}",
            self.path.display(),
            stats.kept,
            stats.removed
        );
        Ok(stats)
    }

    async fn read_lines(&self) -> Result<Vec<String>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error("open", &self.path, e)),
        };

        let mut reader = BufReader::new(file).lines();
        let mut lines = Vec::new();

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|e| store_error("read", &self.path, e))?
        {
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }

        Ok(lines)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".compact.tmp");
        self.path.with_file_name(name)
    }
}

/// Write `contents` to `tmp` and rename it over `dest`
async fn replace_file(tmp: &Path, dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, dest).await
}

fn parse_line(line: &str) -> Option<HistoryRecord> {
    match serde_json::from_str::<HistoryRecord>(line) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!("Skipping malformed history line: {}", e);
            None
        }
    }
}

fn store_error(action: &str, path: &Path, err: std::io::Error) -> MonitorError {
    MonitorError::Store(format!("failed to {} {}: {}", action, path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(url: &str, timestamp: NaiveDateTime, is_up: bool) -> HistoryRecord {
        HistoryRecord {
            timestamp,
            url: url.to_string(),
            status: if is_up { 200 } else { 0 },
            is_up,
            response_time_ms: if is_up { 42.5 } else { 0.0 },
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::open(dir.path().join("cron.log")).unwrap()
    }

    #[tokio::test]
    async fn test_append_then_scan_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(&record("https://a.test", at(1, 1), true)).await.unwrap();
        let last = record("https://a.test", at(1, 2), false);
        store.append(&last).await.unwrap();

        let records = store.scan("https://a.test", NaiveDateTime::MIN).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records.last(), Some(&last));
    }

    #[tokio::test]
    async fn test_scan_filters_url_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(&record("https://a.test", at(1, 1), true)).await.unwrap();
        store.append(&record("https://b.test", at(1, 2), true)).await.unwrap();
        store.append(&record("https://a.test", at(1, 3), false)).await.unwrap();

        let records = store.scan("https://a.test", at(1, 2)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, at(1, 3));

        // The lower bound is inclusive.
        let records = store.scan("https://b.test", at(1, 2)).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_scans_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.scan("https://a.test", NaiveDateTime::MIN).await.is_empty());
        assert_eq!(store.compact(at(1, 0)).await.unwrap(), CompactionStats::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(&record("https://a.test", at(1, 1), true)).await.unwrap();
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .await
            .unwrap();
        file.write_all(b"{broken\n\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);
        store.append(&record("https://a.test", at(1, 2), true)).await.unwrap();

        let records = store.scan("https://a.test", NaiveDateTime::MIN).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_compact_removes_only_older_records_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(&record("https://a.test", at(1, 0), true)).await.unwrap();
        store.append(&record("https://b.test", at(2, 0), true)).await.unwrap();
        store.append(&record("https://a.test", at(3, 0), false)).await.unwrap();
        store.append(&record("https://b.test", at(4, 0), true)).await.unwrap();
        store.append(&record("https://a.test", at(5, 0), true)).await.unwrap();

        let stats = store.compact(at(3, 0)).await.unwrap();
        assert_eq!(stats, CompactionStats { kept: 3, removed: 2 });

        let a = store.scan("https://a.test", NaiveDateTime::MIN).await;
        let a_times: Vec<_> = a.iter().map(|r| r.timestamp).collect();
        assert_eq!(a_times, vec![at(3, 0), at(5, 0)]);

        let b = store.scan("https://b.test", NaiveDateTime::MIN).await;
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].timestamp, at(4, 0));

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_compact_then_append_keeps_log_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(&record("https://a.test", at(1, 0), true)).await.unwrap();
        store.compact(at(2, 0)).await.unwrap();
        store.append(&record("https://a.test", at(6, 0), true)).await.unwrap();

        let records = store.scan("https://a.test", NaiveDateTime::MIN).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, at(6, 0));
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = HistoryStore::open(dir.path().join("missing").join("cron.log"));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }
}
