//! Durable code store: an in-memory index backed by a write-ahead log.
//!
//! On-disk format, one frame per [`Mutation`]:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized Mutation)]
//! ```
//!
//! A mutation is appended and flushed before the index changes, while the
//! index write lock is held, so log order matches transition order.
//!
//! The log file is locked exclusively for the lifetime of the store, so one
//! process owns a log at a time. On open the log is replayed front to back.
//! Damage at the very end of the file, left by an interrupted append, is cut
//! off so later appends stay well-framed. Damage anywhere else fails the open
//! and leaves the file untouched.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use admit_types::{Code, CodeRecord};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::{Mutation, RecordIndex};
use crate::traits::{ActivateOutcome, CodeStore, CreateSummary, MarkUsedOutcome};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Largest payload a frame may carry.
const MAX_FRAME_LEN: usize = 1024;

/// Flush/sync strategy for the log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Configuration for [`WalCodeStore`].
#[derive(Clone, Debug, Default)]
pub struct WalConfig {
    pub sync_mode: SyncMode,
}

struct LogWriter {
    file: File,
    /// End of the last complete frame.
    offset: u64,
}

impl LogWriter {
    fn append(&mut self, batch: &[Mutation], sync_mode: &SyncMode) -> StoreResult<()> {
        let mut buf = Vec::new();
        for mutation in batch {
            encode_frame(mutation, &mut buf)?;
        }

        if let Err(e) = self.write_and_sync(&buf, sync_mode) {
            // Cut off whatever part of the frame reached the file.
            if let Err(trunc) = self.file.set_len(self.offset) {
                warn!(offset = self.offset, error = %trunc, "failed to roll back partial WAL append");
            }
            return Err(e);
        }

        self.offset += buf.len() as u64;
        debug!(entries = batch.len(), len = buf.len(), offset = self.offset, "WAL append");
        Ok(())
    }

    fn write_and_sync(&mut self, buf: &[u8], sync_mode: &SyncMode) -> StoreResult<()> {
        self.file.write_all(buf)?;
        self.file.flush()?;
        if *sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

fn encode_frame(mutation: &Mutation, out: &mut Vec<u8>) -> StoreResult<()> {
    let payload =
        bincode::serialize(mutation).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(StoreError::Serialization(format!(
            "WAL entry of {} bytes exceeds {MAX_FRAME_LEN}",
            payload.len()
        )));
    }
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

/// Decode every frame in `data`.
///
/// Returns the mutations and the byte length of the well-framed prefix.
/// A damaged region is accepted only as the tail of the log.
fn decode_frames(data: &[u8]) -> StoreResult<(Vec<Mutation>, u64)> {
    let mut mutations = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        match read_frame(&data[offset..]) {
            Ok((mutation, frame_len)) => {
                mutations.push(mutation);
                offset += frame_len;
            }
            Err(reason) if is_torn_tail(&data[offset..]) => {
                warn!(offset, file_len = data.len(), %reason, "torn WAL tail; stopping replay");
                break;
            }
            Err(reason) => {
                return Err(StoreError::Corrupt {
                    offset: offset as u64,
                    reason,
                });
            }
        }
    }

    Ok((mutations, offset as u64))
}

/// Decode the frame at the start of `data`, with its encoded length.
fn read_frame(data: &[u8]) -> Result<(Mutation, usize), String> {
    if data.len() < HEADER_SIZE {
        return Err(format!("{} trailing bytes, short of a frame header", data.len()));
    }
    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let expected_crc = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if length == 0 || length > MAX_FRAME_LEN {
        return Err(format!("invalid frame length {length}"));
    }

    let end = HEADER_SIZE + length;
    let Some(payload) = data.get(HEADER_SIZE..end) else {
        return Err(format!("frame of {length} bytes runs past end of log"));
    };
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(format!(
            "CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
        ));
    }

    let mutation = bincode::deserialize(payload).map_err(|e| format!("undecodable entry: {e}"))?;
    Ok((mutation, end))
}

/// Whether damaged bytes at the end of the log are what one interrupted
/// append leaves behind: shorter than the largest frame, with no intact
/// frame starting anywhere inside.
fn is_torn_tail(tail: &[u8]) -> bool {
    tail.len() < HEADER_SIZE + MAX_FRAME_LEN
        && (1..tail.len()).all(|i| read_frame(&tail[i..]).is_err())
}

/// Crash-recoverable code store.
///
/// Reads are served from the in-memory index. The log file stays locked
/// while the store is open; a second open of the same path, from this
/// process or another, fails with [`StoreError::Unavailable`].
///
/// Each conditional write holds
/// the index write lock across its check, its log append and its index
/// update. If the append fails the caller gets an error and the index is
/// unchanged.
pub struct WalCodeStore {
    path: PathBuf,
    index: RwLock<RecordIndex>,
    log: Mutex<LogWriter>,
    config: WalConfig,
}

impl WalCodeStore {
    /// Open (or create) the log at `path` and replay it.
    pub fn open(path: &Path, config: WalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        file.try_lock_exclusive().map_err(|e| {
            StoreError::Unavailable(format!(
                "{} is locked by another process: {e}",
                path.display()
            ))
        })?;

        let data = fs::read(path)?;
        let (mutations, valid_len) = decode_frames(&data)?;
        if valid_len < data.len() as u64 {
            warn!(valid_len, file_len = data.len(), "truncating torn WAL tail");
            file.set_len(valid_len)?;
        }

        let mut index = RecordIndex::new();
        let replayed = mutations.len();
        for mutation in mutations {
            index.apply(mutation);
        }
        info!(path = %path.display(), replayed, records = index.len(), "WAL store opened");

        Ok(Self {
            path: path.to_path_buf(),
            index: RwLock::new(index),
            log: Mutex::new(LogWriter {
                file,
                offset: valid_len,
            }),
            config,
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the log.
    pub fn log_len(&self) -> StoreResult<u64> {
        Ok(self.log.lock().map_err(|_| StoreError::LockPoisoned)?.offset)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, RecordIndex>> {
        self.index.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, RecordIndex>> {
        self.index.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Append a batch to the log. Always called with the index write lock held.
    fn commit(&self, batch: &[Mutation]) -> StoreResult<()> {
        let mut log = self.log.lock().map_err(|_| StoreError::LockPoisoned)?;
        log.append(batch, &self.config.sync_mode)
    }
}

impl CodeStore for WalCodeStore {
    fn get(&self, code: &Code) -> StoreResult<Option<CodeRecord>> {
        Ok(self.read()?.get(code).cloned())
    }

    fn try_create_many(&self, codes: &[String]) -> StoreResult<CreateSummary> {
        self.write()?.try_create_many(codes, |batch| self.commit(batch))
    }

    fn try_activate(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<ActivateOutcome> {
        self.write()?.try_activate(code, now, |batch| self.commit(batch))
    }

    fn try_mark_used(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<MarkUsedOutcome> {
        self.write()?.try_mark_used(code, now, |batch| self.commit(batch))
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}

impl std::fmt::Debug for WalCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalCodeStore")
            .field("path", &self.path)
            .field("record_count", &self.count().unwrap_or_default())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::{Read, Seek, SeekFrom};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 21, 0, 0).unwrap()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reopen_restores_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.wal");

        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["a", "b", "c"])).unwrap();
            store.try_activate(&code("a"), t0()).unwrap();
            store.try_activate(&code("b"), t0()).unwrap();
            store
                .try_mark_used(&code("b"), t0() + Duration::minutes(5))
                .unwrap();
        }

        let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        let a = store.get(&code("a")).unwrap().unwrap();
        assert_eq!(a.activated_at, Some(t0()));
        assert!(a.used_at.is_none());

        let b = store.get(&code("b")).unwrap().unwrap();
        assert_eq!(b.used_at, Some(t0() + Duration::minutes(5)));

        assert_eq!(store.get(&code("c")).unwrap().unwrap(), CodeRecord::new(code("c")));
    }

    #[test]
    fn no_op_writes_do_not_grow_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalCodeStore::open(&dir.path().join("n.wal"), WalConfig::default()).unwrap();
        store.try_create_many(&lines(&["a"])).unwrap();
        store.try_activate(&code("a"), t0()).unwrap();
        let len = store.log_len().unwrap();

        store.try_create_many(&lines(&["a", " "])).unwrap();
        store.try_activate(&code("a"), t0()).unwrap();
        store.try_activate(&code("ghost"), t0()).unwrap();
        assert_eq!(store.log_len().unwrap(), len);
    }

    #[test]
    fn replay_keeps_first_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("first.wal");
        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["a"])).unwrap();
            store.try_activate(&code("a"), t0()).unwrap();
            store
                .try_activate(&code("a"), t0() + Duration::minutes(1))
                .unwrap();
        }
        let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
        assert_eq!(store.get(&code("a")).unwrap().unwrap().activated_at, Some(t0()));
    }

    #[test]
    fn torn_tail_is_dropped_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.wal");
        let full_len;
        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["a"])).unwrap();
            store.try_activate(&code("a"), t0()).unwrap();
            full_len = store.log_len().unwrap();
        }

        // Remove the last 4 bytes: the activation frame is now torn.
        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(full_len - 4).unwrap();
        }

        let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
        let record = store.get(&code("a")).unwrap().unwrap();
        assert!(record.activated_at.is_none());
        assert!(store.log_len().unwrap() < full_len - 4);

        // New appends land after the valid prefix and survive another reopen.
        store.try_activate(&code("a"), t0()).unwrap();
        drop(store);
        let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
        assert_eq!(store.get(&code("a")).unwrap().unwrap().activated_at, Some(t0()));
    }

    /// XOR one byte of the file at `pos`.
    fn flip_byte(path: &Path, pos: u64, mask: u8) {
        let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(pos)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= mask;
        file.seek(SeekFrom::Start(pos)).unwrap();
        file.write_all(&buf).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn mid_log_crc_mismatch_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crc.wal");
        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["a"])).unwrap();
            store.try_create_many(&lines(&["b"])).unwrap();
        }
        let len = fs::metadata(&path).unwrap().len();

        flip_byte(&path, HEADER_SIZE as u64, 0xFF);

        let err = WalCodeStore::open(&path, WalConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { offset: 0, .. }), "{err}");
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn damaged_length_mid_log_fails_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("len.wal");
        let activate_b_at;
        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["1001", "1002"])).unwrap();
            activate_b_at = store.log_len().unwrap();
            store.try_activate(&code("1002"), t0()).unwrap();
            store.try_activate(&code("1001"), t0()).unwrap();
            store
                .try_mark_used(&code("1001"), t0() + Duration::minutes(1))
                .unwrap();
        }
        let len = fs::metadata(&path).unwrap().len();

        flip_byte(&path, activate_b_at, 0x40);

        let err = WalCodeStore::open(&path, WalConfig::default()).unwrap_err();
        assert!(
            matches!(err, StoreError::Corrupt { offset, .. } if offset == activate_b_at),
            "{err}"
        );
        // The used mark is still on disk.
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn damaged_final_entry_is_treated_as_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last.wal");
        let last_at;
        {
            let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
            store.try_create_many(&lines(&["a"])).unwrap();
            last_at = store.log_len().unwrap();
            store.try_create_many(&lines(&["b"])).unwrap();
        }

        flip_byte(&path, last_at + HEADER_SIZE as u64, 0xFF);

        let store = WalCodeStore::open(&path, WalConfig::default()).unwrap();
        assert!(store.get(&code("a")).unwrap().is_some());
        assert!(store.get(&code("b")).unwrap().is_none());
        assert_eq!(store.log_len().unwrap(), last_at);
    }

    #[test]
    fn second_open_of_same_log_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.wal");
        let first = WalCodeStore::open(&path, WalConfig::default()).unwrap();

        let err = WalCodeStore::open(&path, WalConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)), "{err}");

        drop(first);
        assert!(WalCodeStore::open(&path, WalConfig::default()).is_ok());
    }

    #[test]
    fn empty_log_opens_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalCodeStore::open(&dir.path().join("nested/dir/e.wal"), WalConfig::default())
            .unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.log_len().unwrap(), 0);
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.wal");
        let config = WalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let store = WalCodeStore::open(&path, config).unwrap();
        store.try_create_many(&lines(&["a"])).unwrap();
        assert!(store.log_len().unwrap() > 0);
    }

    #[test]
    fn racing_mark_used_logs_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.wal");
        let store = Arc::new(WalCodeStore::open(&path, WalConfig::default()).unwrap());
        store.try_create_many(&lines(&["a"])).unwrap();
        let before = store.log_len().unwrap();
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.try_mark_used(&code("a"), t0()).unwrap()
                })
            })
            .collect();
        let marked = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|o| matches!(o, MarkUsedOutcome::Marked(_)))
            .count();
        assert_eq!(marked, 1);

        let (mutations, _) = decode_frames(&fs::read(&path).unwrap()).unwrap();
        let used_entries = mutations
            .iter()
            .filter(|m| matches!(m, Mutation::MarkUsed { .. }))
            .count();
        assert_eq!(used_entries, 1);
        assert!(store.log_len().unwrap() > before);
    }

    #[test]
    fn decode_frames_roundtrip() {
        let mut buf = Vec::new();
        let entries = vec![
            Mutation::Create { code: code("a") },
            Mutation::Activate { code: code("a"), at: t0() },
        ];
        for m in &entries {
            encode_frame(m, &mut buf).unwrap();
        }
        let (decoded, valid) = decode_frames(&buf).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(valid, buf.len() as u64);
    }

    #[test]
    fn short_tail_after_intact_frames_is_torn() {
        let mut buf = Vec::new();
        encode_frame(&Mutation::Create { code: code("a") }, &mut buf).unwrap();
        let valid_len = buf.len() as u64;
        buf.extend_from_slice(&[7, 0, 0]);
        let (decoded, valid) = decode_frames(&buf).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(valid, valid_len);
    }
}
