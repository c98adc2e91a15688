//! Per-net parasitic graph
//!
//! Owns the node table, resistor list, lumped capacitance per node and the
//! rename table that gives pin and port nodes their symbolic names. Built once
//! by the extractor and read-only afterwards.

use std::collections::HashMap;

use serde::Serialize;

use super::nodes::{LayerId, NodeId, NodeTable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resistor {
    pub a: NodeId,
    pub b: NodeId,
    /// Ohm
    pub ohms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactKind {
    InstancePin { instance: String, pin: String },
    Port,
}

/// A pin or port contact and the node it landed on
#[derive(Debug, Clone, PartialEq)]
pub struct ContactBinding {
    /// Symbolic name (`instance:pin` or the port name)
    pub name: String,
    pub kind: ContactKind,
    pub layer: String,
    pub x: i64,
    pub y: i64,
    /// `None` when no extracted geometry passes through the contact point
    pub node: Option<NodeId>,
}

impl ContactBinding {
    pub fn is_port(&self) -> bool {
        matches!(self.kind, ContactKind::Port)
    }
}

/// Two contacts on the same node; the first one keeps the name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameConflict {
    pub node: NodeId,
    pub kept: String,
    pub dropped: String,
}

/// Locally recovered modeling problems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelingWarnings {
    /// Wires with width <= 0, extracted with the minimum width instead
    pub degenerate_widths: usize,
    /// Wires whose span is a single point
    pub zero_length_wires: usize,
    /// Vias whose bottom layer has nothing above it in the stack
    pub dangling_vias: usize,
}

impl ModelingWarnings {
    pub fn total(&self) -> usize {
        self.degenerate_widths + self.zero_length_wires + self.dangling_vias
    }

    pub fn merge(&mut self, other: &ModelingWarnings) {
        self.degenerate_widths += other.degenerate_widths;
        self.zero_length_wires += other.zero_length_wires;
        self.dangling_vias += other.dangling_vias;
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetGraph {
    name: String,
    nodes: NodeTable,
    resistors: Vec<Resistor>,
    /// Lumped capacitance in fF, indexed by node id
    capacitance: Vec<f64>,
    renames: HashMap<NodeId, String>,
    pins: Vec<ContactBinding>,
    ports: Vec<ContactBinding>,
    conflicts: Vec<RenameConflict>,
    pub warnings: ModelingWarnings,
}

impl NetGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intern_layer(&mut self, layer: &str) -> LayerId {
        self.nodes.intern_layer(layer)
    }

    /// Node at (layer, x, y), created on first sight
    pub fn node(&mut self, layer: LayerId, x: i64, y: i64) -> NodeId {
        let id = self.nodes.get_or_insert(layer, x, y);
        if id as usize == self.capacitance.len() {
            self.capacitance.push(0.0);
        }
        id
    }

    pub fn add_resistor(&mut self, a: NodeId, b: NodeId, ohms: f64) {
        self.resistors.push(Resistor { a, b, ohms });
    }

    /// Accumulate lumped capacitance (fF) on a node
    pub fn add_capacitance(&mut self, node: NodeId, femtofarads: f64) {
        self.capacitance[node as usize] += femtofarads;
    }

    /// Bind a contact to the node at its point and claim the node's name.
    ///
    /// The first contact to claim a node keeps it; later ones are recorded as
    /// conflicts and stay bound so the collision remains visible downstream.
    pub fn bind_contact(&mut self, mut contact: ContactBinding) {
        contact.node = self.nodes.lookup(&contact.layer, contact.x, contact.y);
        if let Some(node) = contact.node {
            match self.renames.get(&node) {
                Some(kept) => {
                    tracing::warn!(
                        "Net {}: contact '{}' lands on node already named '{}'",
                        self.name,
                        contact.name,
                        kept
                    );
                    self.conflicts.push(RenameConflict {
                        node,
                        kept: kept.clone(),
                        dropped: contact.name.clone(),
                    });
                }
                None => {
                    self.renames.insert(node, contact.name.clone());
                }
            }
        }
        if contact.is_port() {
            self.ports.push(contact);
        } else {
            self.pins.push(contact);
        }
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn resistors(&self) -> &[Resistor] {
        &self.resistors
    }

    /// Lumped capacitance of a node in fF
    pub fn capacitance(&self, node: NodeId) -> f64 {
        self.capacitance[node as usize]
    }

    /// Number of nodes carrying a nonzero capacitor
    pub fn capacitor_count(&self) -> usize {
        self.capacitance.iter().filter(|c| **c > 0.0).count()
    }

    /// Sum of all lumped capacitance in fF
    pub fn total_capacitance(&self) -> f64 {
        self.capacitance.iter().sum()
    }

    /// Symbolic name of a node, if a pin or port claimed it
    pub fn rename(&self, node: NodeId) -> Option<&str> {
        self.renames.get(&node).map(String::as_str)
    }

    pub fn pins(&self) -> &[ContactBinding] {
        &self.pins
    }

    pub fn ports(&self) -> &[ContactBinding] {
        &self.ports
    }

    pub fn conflicts(&self) -> &[RenameConflict] {
        &self.conflicts
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.pins.is_empty() && self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(instance: &str, pin: &str, layer: &str, x: i64, y: i64) -> ContactBinding {
        ContactBinding {
            name: format!("{}:{}", instance, pin),
            kind: ContactKind::InstancePin {
                instance: instance.to_string(),
                pin: pin.to_string(),
            },
            layer: layer.to_string(),
            x,
            y,
            node: None,
        }
    }

    #[test]
    fn test_capacitance_accumulates_per_node() {
        let mut graph = NetGraph::new("VDD");
        let m1 = graph.intern_layer("M1");
        let a = graph.node(m1, 0, 0);
        graph.add_capacitance(a, 1.5);
        graph.add_capacitance(a, 2.5);
        assert_eq!(graph.capacitance(a), 4.0);
        assert_eq!(graph.capacitor_count(), 1);
    }

    #[test]
    fn test_first_contact_keeps_the_name() {
        let mut graph = NetGraph::new("VDD");
        let m1 = graph.intern_layer("M1");
        let node = graph.node(m1, 10, 0);

        graph.bind_contact(pin("u1", "VDD", "M1", 10, 0));
        graph.bind_contact(ContactBinding {
            name: "VDD_PAD".to_string(),
            kind: ContactKind::Port,
            layer: "M1".to_string(),
            x: 10,
            y: 0,
            node: None,
        });

        assert_eq!(graph.rename(node), Some("u1:VDD"));
        assert_eq!(graph.conflicts().len(), 1);
        assert_eq!(graph.conflicts()[0].dropped, "VDD_PAD");
        assert_eq!(graph.ports()[0].node, Some(node));
    }

    #[test]
    fn test_contact_off_geometry_is_unbound() {
        let mut graph = NetGraph::new("VDD");
        graph.bind_contact(pin("u1", "VDD", "M1", 10, 0));
        assert_eq!(graph.pins()[0].node, None);
        assert!(graph.conflicts().is_empty());
        assert!(!graph.is_empty());
    }
}
