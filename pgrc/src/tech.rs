//! Technology description
//!
//! Per-layer sheet resistance and area capacitance, per-via-type contact
//! resistance, and the ordered metal stack used to find the layer above a via.
//!
//! The stack is an explicit ordered list. A layer's position comes from its
//! `level` field when present, otherwise from the first integer embedded in its
//! name (`M1`, `M2`, ... `M10`). Layers without either sort after all numbered
//! layers; ties are broken by name so the order never depends on input order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Database units per micron when the layout does not say otherwise
pub const DEFAULT_UNITS: u32 = 1000;

fn default_units() -> u32 {
    DEFAULT_UNITS
}

/// Electrical properties of one routing layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerTech {
    pub name: String,

    /// Explicit position in the stack (lower is closer to the substrate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Sheet resistance in ohm per square
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_sheet: Option<f64>,

    /// Area capacitance to substrate in fF/um^2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_area: Option<f64>,
}

/// Contact resistance of one via type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViaTech {
    pub name: String,
    /// Resistance of one cut in ohm
    pub r_cut: f64,
}

/// The `tech` section of a layout file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechConfig {
    /// Database units per micron
    #[serde(default = "default_units")]
    pub units: u32,
    #[serde(default)]
    pub layers: Vec<LayerTech>,
    #[serde(default)]
    pub vias: Vec<ViaTech>,
}

impl Default for TechConfig {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS,
            layers: Vec::new(),
            vias: Vec::new(),
        }
    }
}

/// First run of ASCII digits in a layer name, e.g. `M12` -> 12
pub fn embedded_index(name: &str) -> Option<u32> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let rest = &name[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Ordered metal stack with a precomputed successor table
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    order: Vec<String>,
    successors: HashMap<String, Option<String>>,
}

impl LayerStack {
    /// Build a stack from `(name, explicit level)` pairs. Duplicate names keep
    /// the first occurrence.
    pub fn new<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<u32>)>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut entries: Vec<(&str, Option<u32>)> = Vec::new();
        for (name, level) in layers {
            if !seen.insert(name) {
                continue;
            }
            entries.push((name, level.or_else(|| embedded_index(name))));
        }

        // Numbered layers first, ascending; unnumbered last
        entries.sort_by(|a, b| {
            (a.1.is_none(), a.1, a.0).cmp(&(b.1.is_none(), b.1, b.0))
        });

        let order: Vec<String> = entries.iter().map(|(n, _)| n.to_string()).collect();
        let successors = order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), order.get(i + 1).cloned()))
            .collect();

        Self { order, successors }
    }

    /// Layer directly above `layer`, or `None` for the top layer or an unknown name
    pub fn successor(&self, layer: &str) -> Option<&str> {
        self.successors
            .get(layer)
            .and_then(|next| next.as_deref())
    }

    pub fn position(&self, layer: &str) -> Option<usize> {
        self.order.iter().position(|l| l == layer)
    }

    pub fn layers(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolved technology used during extraction
#[derive(Debug, Clone)]
pub struct Technology {
    pub units: u32,
    layers: HashMap<String, LayerTech>,
    vias: HashMap<String, f64>,
    stack: LayerStack,
}

impl Technology {
    /// Resolve a tech section. `geometry_layers` adds layers that appear in the
    /// layout but are not described in the tech section, so they still take a
    /// place in the stack.
    pub fn new<'a, I>(config: &TechConfig, geometry_layers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut layers = HashMap::with_capacity(config.layers.len());
        for layer in &config.layers {
            layers
                .entry(layer.name.clone())
                .or_insert_with(|| layer.clone());
        }

        let vias = config
            .vias
            .iter()
            .map(|v| (v.name.clone(), v.r_cut))
            .collect();

        let described = config
            .layers
            .iter()
            .map(|l| (l.name.as_str(), l.level));
        let extra = geometry_layers.into_iter().map(|name| (name, None));
        let stack = LayerStack::new(described.chain(extra));

        Self {
            units: config.units,
            layers,
            vias,
            stack,
        }
    }

    pub fn sheet_resistance(&self, layer: &str) -> Option<f64> {
        self.layers.get(layer).and_then(|l| l.r_sheet)
    }

    pub fn area_capacitance(&self, layer: &str) -> Option<f64> {
        self.layers.get(layer).and_then(|l| l.c_area)
    }

    pub fn via_resistance(&self, via: &str) -> Option<f64> {
        self.vias.get(via).copied()
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_index() {
        assert_eq!(embedded_index("M1"), Some(1));
        assert_eq!(embedded_index("M10"), Some(10));
        assert_eq!(embedded_index("metal3_thick"), Some(3));
        assert_eq!(embedded_index("AP"), None);
    }

    #[test]
    fn test_stack_orders_numerically_not_lexically() {
        let stack = LayerStack::new(vec![
            ("M10", None),
            ("M2", None),
            ("M1", None),
            ("M9", None),
        ]);
        assert_eq!(stack.layers(), &["M1", "M2", "M9", "M10"]);
        assert_eq!(stack.successor("M9"), Some("M10"));
        assert_eq!(stack.successor("M10"), None);
    }

    #[test]
    fn test_unnumbered_layers_sort_last() {
        let stack = LayerStack::new(vec![("AP", None), ("M2", None), ("M1", None)]);
        assert_eq!(stack.layers(), &["M1", "M2", "AP"]);
        assert_eq!(stack.successor("M2"), Some("AP"));
        assert_eq!(stack.successor("AP"), None);
    }

    #[test]
    fn test_explicit_level_wins() {
        let stack = LayerStack::new(vec![("RDL", Some(20)), ("M5", None), ("PAD", Some(21))]);
        assert_eq!(stack.successor("M5"), Some("RDL"));
        assert_eq!(stack.successor("RDL"), Some("PAD"));
        assert_eq!(stack.successor("unknown"), None);
    }

    #[test]
    fn test_technology_lookups() {
        let config = TechConfig {
            units: 2000,
            layers: vec![LayerTech {
                name: "M1".to_string(),
                level: None,
                r_sheet: Some(0.5),
                c_area: Some(0.2),
            }],
            vias: vec![ViaTech {
                name: "VIA12".to_string(),
                r_cut: 8.0,
            }],
        };
        let tech = Technology::new(&config, ["M2", "M1"]);
        assert_eq!(tech.units, 2000);
        assert_eq!(tech.sheet_resistance("M1"), Some(0.5));
        assert_eq!(tech.sheet_resistance("M2"), None);
        assert_eq!(tech.via_resistance("VIA12"), Some(8.0));
        assert_eq!(tech.stack().successor("M1"), Some("M2"));
    }
}
