// src/store.rs
use crate::models::{decode_passes, encode_passes, Pass};
use crate::storage::SecureStorage;
use std::collections::HashSet;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

pub type SubscriptionId = u64;

type Observer = Box<dyn FnMut(&[Pass]) + Send>;
type PersistListener = Arc<dyn Fn(&PersistOutcome) + Send + Sync>;

/// Result of one background write of the pass list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved { count: usize },
    Failed { error: String },
}

#[derive(Default)]
struct PersistStatus {
    last: Option<PersistOutcome>,
    listeners: Vec<PersistListener>,
}

enum WriterCommand {
    Write { blob: String, count: usize },
    Flush(Sender<()>),
}

struct Writer {
    tx: Sender<WriterCommand>,
    handle: JoinHandle<()>,
}

fn lock_status(status: &Mutex<PersistStatus>) -> MutexGuard<'_, PersistStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the list of passes and keeps the stored copy in step with it.
///
/// All mutation goes through `&mut self`, so there is exactly one writer.
/// Every change after [`PassStore::load`] serializes the whole list and hands
/// it to a background writer thread; `add` and `delete_by_id` never wait on
/// storage. Writes are issued in mutation order.
pub struct PassStore {
    passes: Vec<Pass>,
    loaded: bool,
    storage_key: String,
    storage: Arc<dyn SecureStorage>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
    status: Arc<Mutex<PersistStatus>>,
    writer: Option<Writer>,
}

impl PassStore {
    /// Creates an empty, not-yet-loaded store. Call [`PassStore::load`] next.
    pub fn new(storage: Arc<dyn SecureStorage>, storage_key: &str) -> Self {
        let status = Arc::new(Mutex::new(PersistStatus::default()));
        let writer = spawn_writer(Arc::clone(&storage), storage_key.to_string(), Arc::clone(&status));

        PassStore {
            passes: Vec::new(),
            loaded: false,
            storage_key: storage_key.to_string(),
            storage,
            observers: Vec::new(),
            next_subscription: 0,
            status,
            writer: Some(writer),
        }
    }

    /// Creates a store and immediately loads it from storage.
    pub fn open(storage: Arc<dyn SecureStorage>, storage_key: &str) -> Self {
        let mut store = PassStore::new(storage, storage_key);
        store.load();
        store
    }

    /// Adopts the stored pass list. Runs once; later calls are ignored.
    ///
    /// Read and parse failures leave the list empty and are only logged.
    /// Passes added before loading finished are kept after the stored ones and
    /// written out together with them.
    pub fn load(&mut self) {
        if self.loaded {
            log::warn!("PassStore::load called twice for key {:?}; ignoring", self.storage_key);
            return;
        }
        log::info!("Loading passes from storage key {:?}", self.storage_key);

        let stored = match self.storage.get(&self.storage_key) {
            Ok(Some(blob)) => match decode_passes(&blob) {
                Ok(passes) => passes,
                Err(e) => {
                    log::error!("Failed to parse stored passes, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                log::info!("No stored passes under {:?}", self.storage_key);
                Vec::new()
            }
            Err(e) => {
                log::error!("Failed to load passes from secure storage, starting empty: {}", e);
                Vec::new()
            }
        };

        let pending = std::mem::take(&mut self.passes);
        let (passes, repaired) = with_unique_ids(stored.into_iter().chain(pending.iter().cloned()));
        self.passes = passes;
        self.loaded = true;
        log::info!("Loaded {} pass(es)", self.passes.len());

        if repaired || !pending.is_empty() {
            self.schedule_persist();
        }
        self.notify();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Appends a new pass with a fresh id. Arguments are stored as given.
    pub fn add(&mut self, name: &str, data: &str, kind: &str) -> Pass {
        let pass = Pass::new(name.to_string(), data.to_string(), kind.to_string());
        log::debug!("Adding pass {} ({:?}, type {:?})", pass.id, pass.name, pass.kind);
        self.passes.push(pass.clone());
        self.schedule_persist();
        self.notify();
        pass
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Pass> {
        self.passes.iter().find(|pass| pass.id == id)
    }

    /// Removes the pass with `id`. Unknown ids are a no-op.
    pub fn delete_by_id(&mut self, id: &str) {
        match self.passes.iter().position(|pass| pass.id == id) {
            Some(index) => {
                let removed = self.passes.remove(index);
                log::debug!("Deleted pass {} ({:?})", removed.id, removed.name);
                self.schedule_persist();
                self.notify();
            }
            None => log::debug!("delete_by_id: no pass with id {:?}", id),
        }
    }

    /// Current passes in insertion order.
    pub fn list(&self) -> &[Pass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Registers an observer called with the new list after every change.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[Pass]) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub_id, _)| *sub_id != id);
        self.observers.len() != before
    }

    /// Registers a callback run on the writer thread after each write attempt.
    pub fn on_persist<F>(&self, listener: F)
    where
        F: Fn(&PersistOutcome) + Send + Sync + 'static,
    {
        lock_status(&self.status).listeners.push(Arc::new(listener));
    }

    pub fn last_persist_outcome(&self) -> Option<PersistOutcome> {
        lock_status(&self.status).last.clone()
    }

    /// The error from the most recent write, if that write failed.
    pub fn last_persist_error(&self) -> Option<String> {
        match self.last_persist_outcome() {
            Some(PersistOutcome::Failed { error }) => Some(error),
            _ => None,
        }
    }

    /// Blocks until every write scheduled so far has completed.
    pub fn flush(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if writer.tx.send(WriterCommand::Flush(ack_tx)).is_err() {
            log::error!("Pass writer thread is gone; cannot flush");
            return;
        }
        if ack_rx.recv().is_err() {
            log::error!("Pass writer thread exited before acknowledging flush");
        }
    }

    fn schedule_persist(&self) {
        if !self.loaded {
            log::debug!("Skipping persist while initial load is pending");
            return;
        }
        let blob = match encode_passes(&self.passes) {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Failed to serialize passes: {}", e);
                record_outcome(&self.status, PersistOutcome::Failed { error: e.to_string() });
                return;
            }
        };
        let Some(writer) = &self.writer else {
            return;
        };
        let command = WriterCommand::Write { blob, count: self.passes.len() };
        if writer.tx.send(command).is_err() {
            log::error!("Pass writer thread is gone; change not persisted");
            record_outcome(
                &self.status,
                PersistOutcome::Failed { error: "writer thread stopped".to_string() },
            );
        }
    }

    fn notify(&mut self) {
        for (_, observer) in self.observers.iter_mut() {
            observer(self.passes.as_slice());
        }
    }
}

impl Drop for PassStore {
    fn drop(&mut self) {
        if let Some(Writer { tx, handle }) = self.writer.take() {
            // Closing the channel lets the writer drain what is queued and exit.
            drop(tx);
            if handle.join().is_err() {
                log::error!("Pass writer thread panicked");
            }
        }
    }
}

fn spawn_writer(storage: Arc<dyn SecureStorage>, storage_key: String, status: Arc<Mutex<PersistStatus>>) -> Writer {
    let (tx, rx) = mpsc::channel::<WriterCommand>();
    let handle = thread::spawn(move || {
        for command in rx {
            match command {
                WriterCommand::Write { blob, count } => {
                    let outcome = match storage.set(&storage_key, &blob) {
                        Ok(()) => {
                            log::debug!("Persisted {} pass(es) under {:?}", count, storage_key);
                            PersistOutcome::Saved { count }
                        }
                        Err(e) => {
                            log::error!("Failed to save passes to secure storage: {}", e);
                            PersistOutcome::Failed { error: e.to_string() }
                        }
                    };
                    record_outcome(&status, outcome);
                }
                WriterCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        log::debug!("Pass writer for {:?} stopped", storage_key);
    });
    Writer { tx, handle }
}

fn record_outcome(status: &Mutex<PersistStatus>, outcome: PersistOutcome) {
    let listeners = {
        let mut status = lock_status(status);
        status.last = Some(outcome.clone());
        status.listeners.clone()
    };
    for listener in listeners {
        listener(&outcome);
    }
}

/// Gives any pass whose id was already seen a fresh one. Returns whether any changed.
fn with_unique_ids(passes: impl Iterator<Item = Pass>) -> (Vec<Pass>, bool) {
    let mut seen = HashSet::new();
    let mut repaired = false;
    let passes = passes
        .map(|mut pass| {
            if !seen.insert(pass.id.clone()) {
                let fresh = Uuid::new_v4().to_string();
                log::warn!("Duplicate pass id {:?} ({:?}); reassigning to {}", pass.id, pass.name, fresh);
                pass.id = fresh.clone();
                seen.insert(fresh);
                repaired = true;
            }
            pass
        })
        .collect();
    (passes, repaired)
}
