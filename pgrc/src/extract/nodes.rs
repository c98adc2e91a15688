//! Net-scoped node identity
//!
//! A node is the point (layer, x, y) within one net. `NodeTable` hands out dense
//! ids in first-seen order and never reassigns them, so every reference to the
//! same point resolves to the same node. Coordinates live in parallel arrays
//! indexed by id, which keeps bulk serialization a linear scan.

use std::collections::HashMap;

/// Dense per-net node id
pub type NodeId = u32;

/// Per-net interned layer id
pub type LayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub layer: LayerId,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    index: HashMap<NodeKey, NodeId>,
    layer_ids: HashMap<String, LayerId>,
    layer_names: Vec<String>,
    layers: Vec<LayerId>,
    xs: Vec<i64>,
    ys: Vec<i64>,
    next_id: NodeId,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            index: HashMap::with_capacity(nodes),
            layers: Vec::with_capacity(nodes),
            xs: Vec::with_capacity(nodes),
            ys: Vec::with_capacity(nodes),
            ..Self::default()
        }
    }

    /// Intern a layer name
    pub fn intern_layer(&mut self, name: &str) -> LayerId {
        if let Some(&id) = self.layer_ids.get(name) {
            return id;
        }
        let id = self.layer_names.len() as LayerId;
        self.layer_names.push(name.to_string());
        self.layer_ids.insert(name.to_string(), id);
        id
    }

    pub fn layer_id(&self, name: &str) -> Option<LayerId> {
        self.layer_ids.get(name).copied()
    }

    pub fn layer_name(&self, layer: LayerId) -> &str {
        &self.layer_names[layer as usize]
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    /// Id of the node at (layer, x, y), created on first sight
    pub fn get_or_insert(&mut self, layer: LayerId, x: i64, y: i64) -> NodeId {
        let key = NodeKey { layer, x, y };
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.index.insert(key, id);
        self.layers.push(layer);
        self.xs.push(x);
        self.ys.push(y);
        id
    }

    /// Existing node at a named layer point, without creating one
    pub fn lookup(&self, layer: &str, x: i64, y: i64) -> Option<NodeId> {
        let layer = self.layer_id(layer)?;
        self.index.get(&NodeKey { layer, x, y }).copied()
    }

    pub fn key(&self, id: NodeId) -> NodeKey {
        let i = id as usize;
        NodeKey {
            layer: self.layers[i],
            x: self.xs[i],
            y: self.ys[i],
        }
    }

    pub fn layer_of(&self, id: NodeId) -> &str {
        self.layer_name(self.layers[id as usize])
    }

    pub fn x(&self, id: NodeId) -> i64 {
        self.xs[id as usize]
    }

    pub fn y(&self, id: NodeId) -> i64 {
        self.ys[id as usize]
    }

    pub fn len(&self) -> usize {
        self.next_id as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Node ids in assignment order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_same_id() {
        let mut table = NodeTable::new();
        let m1 = table.intern_layer("M1");
        let a = table.get_or_insert(m1, 100, 200);
        let b = table.get_or_insert(m1, 100, 200);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_points_distinct_ids() {
        let mut table = NodeTable::new();
        let m1 = table.intern_layer("M1");
        let m2 = table.intern_layer("M2");
        let ids = [
            table.get_or_insert(m1, 0, 0),
            table.get_or_insert(m1, 0, 1),
            table.get_or_insert(m1, 1, 0),
            table.get_or_insert(m2, 0, 0),
        ];
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(ids, [0, 1, 2, 3]);
    }

    #[test]
    fn test_coordinates_round_trip_through_arena() {
        let mut table = NodeTable::new();
        let m3 = table.intern_layer("M3");
        let id = table.get_or_insert(m3, -5, 7);
        assert_eq!(table.layer_of(id), "M3");
        assert_eq!((table.x(id), table.y(id)), (-5, 7));
        assert_eq!(table.lookup("M3", -5, 7), Some(id));
        assert_eq!(table.lookup("M4", -5, 7), None);
    }

    #[test]
    fn test_intern_is_stable() {
        let mut table = NodeTable::new();
        let a = table.intern_layer("M1");
        let b = table.intern_layer("M2");
        assert_eq!(table.intern_layer("M1"), a);
        assert_ne!(a, b);
        assert_eq!(table.layer_names(), &["M1", "M2"]);
    }
}
