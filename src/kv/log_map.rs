//! Durable region: `BTreeMap` cache over an append-only log
//!
//! Every mutation is appended to `<dir>/<region>.log` and fsynced before the
//! cache is updated. On open the log is replayed from the start; the latest
//! record for a key wins and `delete` records act as tombstones.
//!
//! Compaction rewrites the live entries into a fresh log and atomically
//! renames it over the old one.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{KvError, KvResult};
use super::map::OrderedMap;
use super::record::{decode_record, encode_record, Decoded, LogEntry, PayloadTooLarge};
use crate::observability::{log_event_with_fields, Event};

/// Dead records tolerated before compaction is considered on open.
pub const COMPACTION_MIN_DEAD: u64 = 64;

/// An ordered map persisted as a checksummed append-only log.
pub struct LogMap<K, V> {
    region: String,
    path: PathBuf,
    file: File,
    entries: BTreeMap<K, V>,
    /// Records currently in the log file, live or superseded
    records: u64,
    /// End of the last record known to be fully written
    len: u64,
}

impl<K, V> LogMap<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned + Send + Sync,
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Opens (or creates) the region `region` inside `dir` and replays it.
    ///
    /// # Errors
    ///
    /// - `KvError::Io` if the directory or file cannot be created or read
    /// - `KvError::Corruption` if a complete record fails its checksum
    /// - `KvError::Codec` if a verified payload does not decode
    pub fn open(dir: &Path, region: &str) -> KvResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            KvError::io(
                region,
                format!("failed to create region directory {}", dir.display()),
                e,
            )
        })?;

        let path = dir.join(format!("{}.log", region));
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(KvError::io(region, "failed to read log", e)),
        };

        let (entries, records, valid_len) = Self::replay(region, &bytes)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| KvError::io(region, format!("failed to open {}", path.display()), e))?;

        if (valid_len as usize) < bytes.len() {
            file.set_len(valid_len)
                .and_then(|_| file.sync_all())
                .map_err(|e| KvError::io(region, "failed to truncate torn tail", e))?;
            log_event_with_fields(
                Event::LogTailTruncated,
                &[
                    ("region", region),
                    ("offset", &valid_len.to_string()),
                    ("dropped_bytes", &(bytes.len() as u64 - valid_len).to_string()),
                ],
            );
        }

        let mut map = Self {
            region: region.to_string(),
            path,
            file,
            entries,
            records,
            len: valid_len,
        };

        if map.should_compact() {
            map.compact()?;
        }

        Ok(map)
    }

    /// Replays raw log bytes. Returns the live entries, the number of
    /// records seen, and the length of the verified prefix.
    fn replay(region: &str, bytes: &[u8]) -> KvResult<(BTreeMap<K, V>, u64, u64)> {
        let mut entries = BTreeMap::new();
        let mut records = 0u64;
        let mut offset = 0usize;

        loop {
            let decoded = decode_record(bytes, offset).map_err(|m| {
                KvError::corruption(
                    region,
                    offset as u64,
                    format!(
                        "checksum mismatch: expected {:08x}, computed {:08x}",
                        m.expected, m.actual
                    ),
                )
            })?;

            match decoded {
                Decoded::Record { payload, next } => {
                    let entry: LogEntry<K, V> = serde_json::from_slice(payload)
                        .map_err(|e| KvError::codec(region, e))?;
                    match entry {
                        LogEntry::Put { key, value } => {
                            entries.insert(key, value);
                        }
                        LogEntry::Delete { key } => {
                            entries.remove(&key);
                        }
                    }
                    records += 1;
                    offset = next;
                }
                Decoded::TornTail | Decoded::End => break,
            }
        }

        Ok((entries, records, offset as u64))
    }

    fn should_compact(&self) -> bool {
        let dead = self.dead_records();
        dead >= COMPACTION_MIN_DEAD && dead > self.entries.len() as u64
    }

    /// Records in the log that no longer contribute a live entry.
    pub fn dead_records(&self) -> u64 {
        self.records.saturating_sub(self.entries.len() as u64)
    }

    /// Region name.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes and frames one entry.
    fn frame(&self, entry: &LogEntry<K, V>) -> KvResult<Vec<u8>> {
        let payload = serde_json::to_vec(entry).map_err(|e| KvError::codec(&self.region, e))?;
        encode_record(&payload).map_err(|PayloadTooLarge { len }| {
            KvError::codec(
                &self.region,
                format!("record payload of {} bytes exceeds the u32 length prefix", len),
            )
        })
    }

    /// Appends one record and fsyncs it.
    ///
    /// A failed append truncates the file back to where the record started,
    /// so later records never land behind a fragment.
    fn append(&mut self, entry: &LogEntry<K, V>) -> KvResult<()> {
        let record = self.frame(entry)?;
        let start = self.len;

        // Bytes past `len` are left over from an append whose rollback failed
        let on_disk = self
            .file
            .metadata()
            .map_err(|e| KvError::io(&self.region, "failed to stat log", e))?
            .len();
        if on_disk > start {
            self.file
                .set_len(start)
                .map_err(|e| KvError::io(&self.region, "failed to drop partial record", e))?;
        }

        let written = self
            .file
            .write_all(&record)
            .map_err(|e| KvError::io(&self.region, "failed to append record", e))
            .and_then(|_| {
                self.file
                    .sync_data()
                    .map_err(|e| KvError::io(&self.region, "fsync failed after append", e))
            });

        if let Err(e) = written {
            // Retried by the next append if this fails too
            let _ = self.file.set_len(start);
            return Err(e);
        }

        self.len = start + record.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Rewrites the log so it holds exactly one record per live entry.
    pub fn compact(&mut self) -> KvResult<()> {
        let tmp_path = self.path.with_extension("log.compact");
        let before = self.records;
        let mut len = 0u64;

        {
            let mut tmp = File::create(&tmp_path)
                .map_err(|e| KvError::io(&self.region, "failed to create compaction file", e))?;
            for (key, value) in &self.entries {
                let entry = LogEntry::Put {
                    key: key.clone(),
                    value: value.clone(),
                };
                let record = self.frame(&entry)?;
                tmp.write_all(&record)
                    .map_err(|e| KvError::io(&self.region, "failed to write compaction file", e))?;
                len += record.len() as u64;
            }
            tmp.sync_all()
                .map_err(|e| KvError::io(&self.region, "fsync failed on compaction file", e))?;
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| KvError::io(&self.region, "failed to install compacted log", e))?;

        self.file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| KvError::io(&self.region, "failed to reopen compacted log", e))?;
        self.records = self.entries.len() as u64;
        self.len = len;

        log_event_with_fields(
            Event::LogCompacted,
            &[
                ("region", &self.region),
                ("records_before", &before.to_string()),
                ("records_after", &self.records.to_string()),
            ],
        );

        Ok(())
    }
}

impl<K, V> OrderedMap<K, V> for LogMap<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned + Send + Sync,
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) -> KvResult<Option<V>> {
        self.append(&LogEntry::Put {
            key: key.clone(),
            value: value.clone(),
        })?;
        Ok(self.entries.insert(key, value))
    }

    fn remove(&mut self, key: &K) -> KvResult<Option<V>> {
        if !self.entries.contains_key(key) {
            return Ok(None);
        }
        self.append(&LogEntry::Delete { key: key.clone() })?;
        Ok(self.entries.remove(key))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.entries.iter())
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}
