// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::types::{NodeId, TypeGraph};
use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

static NEXT_STATE_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque token naming one state map.
///
/// Every call to [`StateKey::new`] returns a key distinct from all others in
/// the process, so independent extensions never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StateKey(u64);

impl StateKey {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(NEXT_STATE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

type StateMap = BTreeMap<NodeId, Value>;

/// Side tables of per-node metadata, keyed by `(StateKey, NodeId)`.
///
/// Writes are exact. Reads through [`StateMaps::get`] walk the node's origin
/// chain, so metadata attached to a source node is visible on every node
/// derived from it until a derived node gets its own entry.
#[derive(Default)]
pub struct StateMaps {
    maps: RwLock<BTreeMap<StateKey, StateMap>>,
}

// Cloning takes a snapshot; the clone evolves independently.
impl Clone for StateMaps {
    fn clone(&self) -> Self {
        Self {
            maps: RwLock::new(self.maps.read().clone()),
        }
    }
}

impl fmt::Debug for StateMaps {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.maps.read().iter()).finish()
    }
}

impl StateMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: StateKey, node: NodeId, value: Value) {
        self.maps.write().entry(key).or_default().insert(node, value);
    }

    pub fn delete(&self, key: StateKey, node: NodeId) -> Option<Value> {
        self.maps.write().get_mut(&key)?.remove(&node)
    }

    /// Entry stored for exactly `node`, ignoring its origin chain.
    pub fn get_exact(&self, key: StateKey, node: NodeId) -> Option<Value> {
        self.maps.read().get(&key)?.get(&node).cloned()
    }

    pub fn get(&self, graph: &TypeGraph, key: StateKey, node: NodeId) -> Option<Value> {
        let maps = self.maps.read();
        let map = maps.get(&key)?;
        graph
            .lineage(node)
            .find_map(|n| map.get(&n))
            .cloned()
    }

    /// Drops entries of nodes whose index is `len` or above.
    pub(crate) fn discard_from(&self, len: usize) {
        for map in self.maps.write().values_mut() {
            map.retain(|n, _| n.index() < len);
        }
    }

    pub fn entries(&self, key: StateKey) -> Vec<(NodeId, Value)> {
        match self.maps.read().get(&key) {
            Some(map) => map.iter().map(|(n, v)| (*n, v.clone())).collect(),
            None => vec![],
        }
    }

    pub fn len(&self, key: StateKey) -> usize {
        self.maps.read().get(&key).map_or(0, |m| m.len())
    }

    pub fn is_empty(&self, key: StateKey) -> bool {
        self.len(key) == 0
    }
}
