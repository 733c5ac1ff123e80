//! In-memory registry of live battles.
//!
//! Each loaded battle sits behind its own `tokio::sync::Mutex`, so commands
//! for one battle are applied one at a time while other battles proceed in
//! parallel. The outer map lock is only held to look up or insert entries.
//!
//! A slot leaves the map only while its own lock is held, and is marked
//! retired on the way out. Tasks that fetched the slot earlier see the mark
//! once they get the lock and fetch again, so there is never more than one
//! live manager per battle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use battle_core::battle::BattleState;
use battle_core::error::BattleError;
use battle_core::events::Event;
use battle_core::ids::BattleId;
use battle_core::manager::BattleManager;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};
use crate::store::BattleStore;

/// A loaded battle and when it was last touched.
#[derive(Debug)]
pub struct LoadedBattle {
    manager: BattleManager,
    last_access: Instant,
    retired: bool,
}

impl LoadedBattle {
    fn new(manager: BattleManager) -> Self {
        Self {
            manager,
            last_access: Instant::now(),
            retired: false,
        }
    }

    /// Whether this slot was dropped from the registry.
    ///
    /// A retired manager must not be mutated; fetch the battle again.
    #[must_use]
    pub const fn is_retired(&self) -> bool {
        self.retired
    }
}

type Slot = Arc<Mutex<LoadedBattle>>;

/// Registry of live battles backed by a [`BattleStore`].
#[derive(Debug)]
pub struct BattleRegistry {
    store: Arc<dyn BattleStore>,
    battles: RwLock<HashMap<BattleId, Slot>>,
    verify_on_load: bool,
}

impl BattleRegistry {
    /// Create a registry over `store`.
    ///
    /// With `verify_on_load`, battles loaded from the store are replayed from
    /// genesis and rejected if the replay diverges from the snapshot.
    pub fn new(store: Arc<dyn BattleStore>, verify_on_load: bool) -> Self {
        Self {
            store,
            battles: RwLock::new(HashMap::new()),
            verify_on_load,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn BattleStore> {
        &self.store
    }

    /// Register a new battle, persisting its initial snapshot.
    pub async fn create(&self, state: BattleState) -> Result<BattleId> {
        let battle_id = state.battle_id;
        let mut battles = self.battles.write().await;
        if battles.contains_key(&battle_id) || self.store.load_snapshot(battle_id)?.is_some() {
            return Err(
                BattleError::InvalidPayload(format!("battle {battle_id} already exists")).into(),
            );
        }

        self.store.save_snapshot(&state)?;
        battles.insert(
            battle_id,
            Arc::new(Mutex::new(LoadedBattle::new(BattleManager::new(state)))),
        );
        info!(%battle_id, "Battle created");
        Ok(battle_id)
    }

    /// The battle's slot, loading it from the store if it is not in memory.
    pub async fn get_or_load(&self, battle_id: BattleId) -> Result<Slot> {
        if let Some(slot) = self.battles.read().await.get(&battle_id) {
            return Ok(Arc::clone(slot));
        }

        let mut battles = self.battles.write().await;
        // Another task may have loaded it while we waited for the write lock.
        if let Some(slot) = battles.get(&battle_id) {
            return Ok(Arc::clone(slot));
        }

        let manager = self.load(battle_id)?;
        let slot = Arc::new(Mutex::new(LoadedBattle::new(manager)));
        battles.insert(battle_id, Arc::clone(&slot));
        Ok(slot)
    }

    fn load(&self, battle_id: BattleId) -> Result<BattleManager> {
        let snapshot = self
            .store
            .load_snapshot(battle_id)?
            .ok_or(ServerError::BattleNotFound(battle_id))?;
        let events = self.store.load_events(battle_id)?;
        let event_count = events.len();
        let manager = BattleManager::rehydrate(snapshot, events);

        if self.verify_on_load {
            if let Err(err) = manager.verify_replay() {
                let Some(rebuilt) = roll_forward(manager.state(), manager.events()) else {
                    warn!(%battle_id, error = %err, "Stored battle failed replay verification");
                    return Err(err.into());
                };
                // The last snapshot write failed after its event was logged.
                self.store.save_snapshot(rebuilt.state())?;
                info!(%battle_id, events = event_count, "Stale snapshot rebuilt from event log");
                return Ok(rebuilt);
            }
        }

        debug!(%battle_id, events = event_count, "Battle loaded from store");
        Ok(manager)
    }

    async fn lock_live(&self, battle_id: BattleId) -> Result<(Slot, OwnedMutexGuard<LoadedBattle>)> {
        loop {
            let slot = self.get_or_load(battle_id).await?;
            let loaded = Arc::clone(&slot).lock_owned().await;
            if !loaded.retired {
                return Ok((slot, loaded));
            }
            debug!(%battle_id, "Slot retired while waiting, fetching again");
        }
    }

    /// Run `f` with exclusive access to the battle.
    ///
    /// The battle is loaded first if needed. The closure runs while the
    /// battle's lock is held, so it must not block. When `f` fails with a
    /// persistence error the battle is retired before the lock is released
    /// and reloads from the store on next access.
    pub async fn with_battle<T, F>(&self, battle_id: BattleId, f: F) -> Result<T>
    where
        F: FnOnce(&mut BattleManager) -> Result<T>,
    {
        let (slot, mut loaded) = self.lock_live(battle_id).await?;
        loaded.last_access = Instant::now();
        let result = f(&mut loaded.manager);

        if let Err(err) = &result {
            if err.is_persistence_failure() {
                warn!(%battle_id, error = %err, "Retiring battle after failed write");
                self.retire(battle_id, &slot, &mut loaded).await;
            }
        }
        result
    }

    async fn retire(&self, battle_id: BattleId, slot: &Slot, loaded: &mut LoadedBattle) {
        loaded.retired = true;
        let mut battles = self.battles.write().await;
        if battles
            .get(&battle_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            battles.remove(&battle_id);
            debug!(%battle_id, "Battle dropped from memory");
        }
    }

    /// Read-only snapshot of a battle's current state.
    pub async fn state(&self, battle_id: BattleId) -> Result<BattleState> {
        self.with_battle(battle_id, |manager| Ok(manager.state().clone()))
            .await
    }

    /// Drop battles idle for at least `max_idle` from memory.
    ///
    /// Battles that are currently locked are never evicted. Evicted battles
    /// reload from the store on next access.
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<BattleId> {
        let mut battles = self.battles.write().await;
        let now = Instant::now();

        let mut idle = Vec::new();
        for (battle_id, slot) in battles.iter() {
            // A locked battle is in use and stays loaded.
            if let Ok(mut loaded) = slot.try_lock() {
                if now.duration_since(loaded.last_access) >= max_idle {
                    loaded.retired = true;
                    idle.push(*battle_id);
                }
            }
        }

        for battle_id in &idle {
            battles.remove(battle_id);
        }
        if !idle.is_empty() {
            debug!(evicted = idle.len(), remaining = battles.len(), "Evicted idle battles");
        }
        idle
    }

    /// Drop a battle from memory, waiting for any command in progress.
    pub async fn forget(&self, battle_id: BattleId) {
        let Some(slot) = self.battles.read().await.get(&battle_id).cloned() else {
            return;
        };
        let mut loaded = slot.lock().await;
        if !loaded.retired {
            self.retire(battle_id, &slot, &mut loaded).await;
        }
    }

    /// Number of battles currently held in memory.
    pub async fn loaded_count(&self) -> usize {
        self.battles.read().await.len()
    }
}

/// Replay `events` over the genesis of `snapshot`, accepting the result only
/// if the snapshot matches some prefix of the log.
fn roll_forward(snapshot: &BattleState, events: &[Event]) -> Option<BattleManager> {
    let mut manager = BattleManager::new(snapshot.genesis());
    let mut matched = manager.state() == snapshot;
    for event in events {
        manager.apply_event(event.clone()).ok()?;
        matched = matched || manager.state() == snapshot;
    }
    matched.then_some(manager)
}
