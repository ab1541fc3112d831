//! In-memory fakes of the core ports for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use markwatch_core::domain::{StorageKey, TreeNode};
use markwatch_core::ports::{
    IKeyValueStore, IStorageObserver, IStructuredStore, ITreeObserver, ITreeProvider,
    StorageChange, WatchHandle,
};

// ============================================================================
// Structured store fakes
// ============================================================================

#[derive(Default)]
pub struct MemoryStructuredStore {
    values: Mutex<HashMap<StorageKey, Value>>,
    observers: Arc<Mutex<Vec<Arc<dyn IStorageObserver>>>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryStructuredStore {
    pub fn with(pairs: Vec<(StorageKey, Value)>) -> Self {
        let store = Self::default();
        store.values.lock().unwrap().extend(pairs);
        store
    }

    pub fn value(&self, key: StorageKey) -> Option<Value> {
        self.values.lock().unwrap().get(&key).cloned()
    }
}

#[async_trait::async_trait]
impl IStructuredStore for MemoryStructuredStore {
    fn area(&self) -> &str {
        "local"
    }

    async fn get(&self, keys: &[StorageKey]) -> anyhow::Result<HashMap<StorageKey, Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("structured store unavailable");
        }
        let values = self.values.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| values.get(key).map(|value| (*key, value.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<StorageKey, Value>) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("structured store is read-only");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut changes = Vec::new();
        {
            let mut values = self.values.lock().unwrap();
            for (key, value) in entries {
                let old_value = values.insert(key, value.clone());
                changes.push(StorageChange {
                    key,
                    old_value,
                    new_value: Some(value),
                });
            }
        }
        let observers = self.observers.lock().unwrap().clone();
        for observer in observers {
            observer.on_changed(&changes, "local");
        }
        Ok(())
    }

    fn subscribe(&self, observer: Arc<dyn IStorageObserver>) -> WatchHandle {
        self.observers.lock().unwrap().push(observer);
        let observers = self.observers.clone();
        WatchHandle::new(move || observers.lock().unwrap().clear())
    }
}

pub struct FailingStructuredStore;

#[async_trait::async_trait]
impl IStructuredStore for FailingStructuredStore {
    fn area(&self) -> &str {
        "local"
    }

    async fn get(&self, _keys: &[StorageKey]) -> anyhow::Result<HashMap<StorageKey, Value>> {
        anyhow::bail!("structured store unavailable")
    }

    async fn set(&self, _entries: HashMap<StorageKey, Value>) -> anyhow::Result<()> {
        anyhow::bail!("structured store unavailable")
    }

    fn subscribe(&self, _observer: Arc<dyn IStorageObserver>) -> WatchHandle {
        WatchHandle::noop()
    }
}

// ============================================================================
// Key-value store fake
// ============================================================================

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, Value>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn with(key: &str, value: Value) -> Self {
        let store = Self::default();
        store.values.lock().unwrap().insert(key.to_string(), value);
        store
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("key-value store unavailable");
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("key-value store quota exceeded");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Tree provider fakes
// ============================================================================

/// Serves a replaceable tree and counts fetches
#[derive(Default)]
pub struct StaticTreeProvider {
    tree: Mutex<Vec<TreeNode>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl StaticTreeProvider {
    pub fn new(tree: Vec<TreeNode>) -> Self {
        Self {
            tree: Mutex::new(tree),
            ..Self::default()
        }
    }

    pub fn set_tree(&self, tree: Vec<TreeNode>) {
        *self.tree.lock().unwrap() = tree;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ITreeProvider for StaticTreeProvider {
    async fn get_tree(&self) -> anyhow::Result<Vec<TreeNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("bookmark tree unavailable");
        }
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn watch(&self, _observer: Arc<dyn ITreeObserver>) -> anyhow::Result<WatchHandle> {
        Ok(WatchHandle::noop())
    }
}

/// Blocks every fetch until the test releases it
pub struct GatedTreeProvider {
    pub inner: StaticTreeProvider,
    gate: Semaphore,
    started: Notify,
}

impl GatedTreeProvider {
    pub fn new(tree: Vec<TreeNode>) -> Self {
        Self {
            inner: StaticTreeProvider::new(tree),
            gate: Semaphore::new(0),
            started: Notify::new(),
        }
    }

    /// Waits until a fetch is blocked on the gate
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets `n` blocked or future fetches through
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait::async_trait]
impl ITreeProvider for GatedTreeProvider {
    async fn get_tree(&self) -> anyhow::Result<Vec<TreeNode>> {
        self.started.notify_one();
        self.gate.acquire().await?.forget();
        self.inner.get_tree().await
    }

    async fn watch(&self, _observer: Arc<dyn ITreeObserver>) -> anyhow::Result<WatchHandle> {
        Ok(WatchHandle::noop())
    }
}

/// A bar folder holding one leaf per `(id, title, url)`
pub fn bar_tree(leaves: &[(&str, &str, &str)]) -> Vec<TreeNode> {
    let children = leaves
        .iter()
        .map(|(id, title, url)| TreeNode::bookmark(*id, *title, *url).with_parent("1"))
        .collect();
    vec![TreeNode::folder(
        "0",
        None,
        "",
        vec![TreeNode::folder("1", Some("0"), "Bar", children)],
    )]
}
