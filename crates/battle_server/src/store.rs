//! Battle persistence.
//!
//! A battle is persisted as its latest snapshot plus the append-only event
//! log that produced it. The snapshot makes loading cheap; the log makes the
//! snapshot verifiable by replay.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use battle_core::battle::BattleState;
use battle_core::events::Event;
use battle_core::ids::BattleId;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, ServerError};

const SNAPSHOT_FILE: &str = "snapshot.bin";
const EVENTS_FILE: &str = "events.bin";
/// Bytes of the little-endian length written before every event record.
const RECORD_HEADER: usize = 4;

/// Storage backend for battle snapshots and event logs.
pub trait BattleStore: Send + Sync + fmt::Debug {
    /// Overwrite the stored snapshot of `state.battle_id`.
    fn save_snapshot(&self, state: &BattleState) -> Result<()>;

    /// The latest snapshot, or `None` if the battle was never stored.
    fn load_snapshot(&self, battle_id: BattleId) -> Result<Option<BattleState>>;

    /// Append one applied event to the battle's log.
    fn append_event(&self, battle_id: BattleId, event: &Event) -> Result<()>;

    /// The full event log in application order. Empty for unknown battles.
    fn load_events(&self, battle_id: BattleId) -> Result<Vec<Event>>;

    /// Every stored battle.
    fn battle_ids(&self) -> Result<Vec<BattleId>>;
}

#[derive(Debug, Default)]
struct StoredBattle {
    snapshot: Option<BattleState>,
    events: Vec<Event>,
}

/// Volatile store for tests and the headless simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    battles: Mutex<HashMap<BattleId, StoredBattle>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<BattleId, StoredBattle>>> {
        self.battles
            .lock()
            .map_err(|_| ServerError::Storage("memory store lock poisoned".to_string()))
    }
}

impl BattleStore for MemoryStore {
    fn save_snapshot(&self, state: &BattleState) -> Result<()> {
        self.lock()?
            .entry(state.battle_id)
            .or_default()
            .snapshot = Some(state.clone());
        Ok(())
    }

    fn load_snapshot(&self, battle_id: BattleId) -> Result<Option<BattleState>> {
        Ok(self
            .lock()?
            .get(&battle_id)
            .and_then(|stored| stored.snapshot.clone()))
    }

    fn append_event(&self, battle_id: BattleId, event: &Event) -> Result<()> {
        self.lock()?
            .entry(battle_id)
            .or_default()
            .events
            .push(event.clone());
        Ok(())
    }

    fn load_events(&self, battle_id: BattleId) -> Result<Vec<Event>> {
        Ok(self
            .lock()?
            .get(&battle_id)
            .map(|stored| stored.events.clone())
            .unwrap_or_default())
    }

    fn battle_ids(&self) -> Result<Vec<BattleId>> {
        let mut ids: Vec<BattleId> = self.lock()?.keys().copied().collect();
        ids.sort_by_key(BattleId::as_u128);
        Ok(ids)
    }
}

/// Durable store with one directory per battle under `root`.
///
/// Snapshots are rewritten through a temporary sibling and renamed into
/// place. The event log is append-only: each event is a bincode record
/// behind a `u32` length, and a failed append is truncated away again.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the battle's files.
    #[must_use]
    pub fn battle_dir(&self, battle_id: BattleId) -> PathBuf {
        self.root.join(battle_id.0.simple().to_string())
    }

    fn write_atomic(&self, battle_id: BattleId, file: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.battle_dir(battle_id);
        fs::create_dir_all(&dir)?;
        let temp = dir.join(format!("{file}.tmp"));
        fs::write(&temp, bytes)?;
        fs::rename(&temp, dir.join(file))?;
        Ok(())
    }

    fn read_optional(&self, battle_id: BattleId, file: &str) -> Result<Option<Vec<u8>>> {
        let path = self.battle_dir(battle_id).join(file);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl BattleStore for FileStore {
    fn save_snapshot(&self, state: &BattleState) -> Result<()> {
        let bytes = state.to_bytes()?;
        self.write_atomic(state.battle_id, SNAPSHOT_FILE, &bytes)?;
        debug!(battle_id = %state.battle_id, bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }

    fn load_snapshot(&self, battle_id: BattleId) -> Result<Option<BattleState>> {
        match self.read_optional(battle_id, SNAPSHOT_FILE)? {
            Some(bytes) => Ok(Some(BattleState::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn append_event(&self, battle_id: BattleId, event: &Event) -> Result<()> {
        let body = bincode::serialize(event).map_err(|e| ServerError::Storage(e.to_string()))?;
        let length = u32::try_from(body.len())
            .map_err(|_| ServerError::Storage(format!("event of {} bytes", body.len())))?;
        let mut record = Vec::with_capacity(RECORD_HEADER + body.len());
        record.extend_from_slice(&length.to_le_bytes());
        record.extend_from_slice(&body);

        let dir = self.battle_dir(battle_id);
        fs::create_dir_all(&dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(EVENTS_FILE))?;
        let start = file.metadata()?.len();

        if let Err(err) = file.write_all(&record).and_then(|()| file.sync_data()) {
            if let Err(truncate) = file.set_len(start) {
                warn!(%battle_id, error = %truncate, "Could not roll back partial event record");
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn load_events(&self, battle_id: BattleId) -> Result<Vec<Event>> {
        let Some(bytes) = self.read_optional(battle_id, EVENTS_FILE)? else {
            return Ok(Vec::new());
        };
        decode_records(&bytes)
    }

    fn battle_ids(&self) -> Result<Vec<BattleId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(uuid) = name.to_str().and_then(|n| Uuid::parse_str(n).ok()) {
                ids.push(BattleId::from_uuid(uuid));
            }
        }
        ids.sort_by_key(BattleId::as_u128);
        Ok(ids)
    }
}

fn decode_records(mut bytes: &[u8]) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < RECORD_HEADER {
            return Err(ServerError::Storage(format!(
                "event log truncated after {} records",
                events.len()
            )));
        }
        let (head, rest) = bytes.split_at(RECORD_HEADER);
        let mut header = [0_u8; RECORD_HEADER];
        header.copy_from_slice(head);
        let length = u32::from_le_bytes(header) as usize;
        if rest.len() < length {
            return Err(ServerError::Storage(format!(
                "event log truncated inside record {}",
                events.len()
            )));
        }
        let (body, rest) = rest.split_at(length);
        events.push(bincode::deserialize(body).map_err(|e| ServerError::Storage(e.to_string()))?);
        bytes = rest;
    }
    Ok(events)
}
