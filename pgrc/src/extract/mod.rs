//! RC extraction
//!
//! Turns each net's geometry into a [`NetGraph`]. Nets never interact, so each
//! one is an independent unit of work; with `parallel` enabled they are spread
//! over the rayon pool and merged into a net-name-keyed map afterwards.
//!
//! Per net:
//! 1. Every via adds a cut resistor between its bottom-layer node and the node
//!    at the same point on the layer above.
//! 2. Vias, pins and ports register cut points on the lines they sit on.
//! 3. Every wire is fractured at its cut points and at the maximum segment
//!    length.
//! 4. Pin and port contacts claim the node at their point (first match wins).

pub mod fracture;
pub mod graph;
pub mod nodes;

pub use graph::{ContactBinding, ContactKind, ModelingWarnings, NetGraph, RenameConflict, Resistor};
pub use nodes::{LayerId, NodeId, NodeKey, NodeTable};

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use crate::core::PgrcError;
use crate::layout::{Layout, NetGeometry};
use crate::tech::Technology;
use fracture::{fracture_wire, CutIndex, WireModel};

/// Modeling parameters for extraction
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Longest wire length a single resistor may represent, in microns
    pub max_segment_um: f64,
    /// Resistance floor in ohm
    pub min_resistance: f64,
    /// Width substituted for wires with width <= 0, in microns
    pub min_width_um: f64,
    /// Sheet resistance for layers missing from the tech section
    pub default_r_sheet: f64,
    /// Area capacitance for layers missing from the tech section
    pub default_c_area: f64,
    /// Cut resistance for via types missing from the tech section
    pub default_via_resistance: f64,
    /// Extract nets on the rayon pool
    pub parallel: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_segment_um: 20.0,
            min_resistance: 0.001,
            min_width_um: 0.1,
            default_r_sheet: 0.1,
            default_c_area: 0.0,
            default_via_resistance: 1.0,
            parallel: true,
        }
    }
}

/// Totals over all extracted nets
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    pub nets: usize,
    pub nodes: usize,
    pub resistors: usize,
    pub capacitors: usize,
    pub instance_pins: usize,
    pub ports: usize,
    pub unbound_contacts: usize,
    pub rename_conflicts: usize,
    pub warnings: ModelingWarnings,
}

impl ExtractStats {
    fn add(&mut self, graph: &NetGraph) {
        self.nets += 1;
        self.nodes += graph.node_count();
        self.resistors += graph.resistors().len();
        self.capacitors += graph.capacitor_count();
        self.instance_pins += graph.pins().len();
        self.ports += graph.ports().len();
        self.unbound_contacts += graph
            .pins()
            .iter()
            .chain(graph.ports())
            .filter(|c| c.node.is_none())
            .count();
        self.rename_conflicts += graph.conflicts().len();
        self.warnings.merge(&graph.warnings);
    }
}

/// Extracted graphs of a whole design
#[derive(Debug, Clone)]
pub struct Extraction {
    pub design: String,
    /// Database units per micron of every coordinate in the graphs
    pub units: u32,
    pub nets: BTreeMap<String, NetGraph>,
}

impl Extraction {
    pub fn stats(&self) -> ExtractStats {
        let mut stats = ExtractStats::default();
        for graph in self.nets.values() {
            stats.add(graph);
        }
        stats
    }

    pub fn net(&self, name: &str) -> Option<&NetGraph> {
        self.nets.get(name)
    }
}

pub struct Extractor {
    tech: Technology,
    options: ExtractOptions,
    max_segment: i64,
}

impl Extractor {
    pub fn new(tech: Technology, options: ExtractOptions) -> Result<Self, PgrcError> {
        if !(options.max_segment_um > 0.0) || !options.max_segment_um.is_finite() {
            return Err(PgrcError::Config(format!(
                "maximum segment length must be positive, got {} um",
                options.max_segment_um
            )));
        }
        if tech.units == 0 {
            return Err(PgrcError::Config("tech.units must be positive".to_string()));
        }
        let max_segment = ((options.max_segment_um * tech.units as f64).floor() as i64).max(1);
        Ok(Self {
            tech,
            options,
            max_segment,
        })
    }

    /// Extractor for a layout's own technology section
    pub fn for_layout(layout: &Layout, options: ExtractOptions) -> Result<Self, PgrcError> {
        let tech = Technology::new(&layout.tech, layout.layer_names());
        Self::new(tech, options)
    }

    pub fn technology(&self) -> &Technology {
        &self.tech
    }

    /// Maximum segment length in database units
    pub fn max_segment(&self) -> i64 {
        self.max_segment
    }

    /// Extract every net of a layout
    pub fn extract_layout(&self, layout: &Layout) -> Extraction {
        let nets = self.extract_nets(&layout.nets);
        let extraction = Extraction {
            design: layout.design.clone(),
            units: self.tech.units,
            nets,
        };

        let stats = extraction.stats();
        tracing::info!(
            "Extracted {} nets: {} nodes, {} resistors, {} capacitors",
            stats.nets,
            stats.nodes,
            stats.resistors,
            stats.capacitors
        );
        if stats.rename_conflicts > 0 || stats.unbound_contacts > 0 {
            tracing::warn!(
                "{} rename conflicts, {} contacts not on any geometry",
                stats.rename_conflicts,
                stats.unbound_contacts
            );
        }
        if stats.warnings.total() > 0 {
            tracing::warn!("Modeling warnings: {:?}", stats.warnings);
        }
        extraction
    }

    pub fn extract_nets(&self, nets: &[NetGeometry]) -> BTreeMap<String, NetGraph> {
        let graphs: Vec<NetGraph> = if self.options.parallel {
            nets.par_iter().map(|net| self.extract_net(net)).collect()
        } else {
            nets.iter().map(|net| self.extract_net(net)).collect()
        };
        graphs
            .into_iter()
            .map(|graph| (graph.name().to_string(), graph))
            .collect()
    }

    /// Extract one net. Never fails: degenerate geometry is recovered locally
    /// and counted in the graph's warnings.
    pub fn extract_net(&self, net: &NetGeometry) -> NetGraph {
        let mut graph = NetGraph::new(net.name.clone());
        let mut cuts = CutIndex::default();

        // bottom layer -> (bottom id, top id, top name)
        let mut via_layers: HashMap<&str, Option<(LayerId, LayerId, &str)>> = HashMap::new();

        for via in &net.vias {
            let layers = *via_layers.entry(via.bottom.as_str()).or_insert_with(|| {
                let top = self.tech.stack().successor(&via.bottom)?;
                let bottom_id = graph.intern_layer(&via.bottom);
                let top_id = graph.intern_layer(top);
                Some((bottom_id, top_id, top))
            });
            let Some((bottom_id, top_id, top)) = layers else {
                graph.warnings.dangling_vias += 1;
                continue;
            };

            cuts.add(&via.bottom, via.x, via.y);
            cuts.add(top, via.x, via.y);

            let lower = graph.node(bottom_id, via.x, via.y);
            let upper = graph.node(top_id, via.x, via.y);
            let ohms = self
                .tech
                .via_resistance(&via.via)
                .unwrap_or(self.options.default_via_resistance)
                .max(self.options.min_resistance);
            graph.add_resistor(lower, upper, ohms);
        }

        for pin in &net.pins {
            cuts.add(&pin.layer, pin.x, pin.y);
        }
        for port in &net.ports {
            cuts.add(&port.layer, port.x, port.y);
        }

        for wire in &net.wires {
            if wire.length() == 0 {
                graph.warnings.zero_length_wires += 1;
                continue;
            }
            let model = self.wire_model(wire.layer.as_str(), wire.width, &mut graph.warnings);
            let points = cuts.cuts_for(wire);
            fracture_wire(&mut graph, wire, &points, &model, self.max_segment);
        }

        for pin in &net.pins {
            graph.bind_contact(ContactBinding {
                name: pin.name(),
                kind: ContactKind::InstancePin {
                    instance: pin.instance.clone(),
                    pin: pin.pin.clone(),
                },
                layer: pin.layer.clone(),
                x: pin.x,
                y: pin.y,
                node: None,
            });
        }
        for port in &net.ports {
            graph.bind_contact(ContactBinding {
                name: port.name.clone(),
                kind: ContactKind::Port,
                layer: port.layer.clone(),
                x: port.x,
                y: port.y,
                node: None,
            });
        }

        tracing::debug!(
            "Net {}: {} nodes, {} resistors",
            graph.name(),
            graph.node_count(),
            graph.resistors().len()
        );
        graph
    }

    fn wire_model(&self, layer: &str, width: i64, warnings: &mut ModelingWarnings) -> WireModel {
        let units = self.tech.units as f64;
        let mut width_um = width as f64 / units;
        if !(width_um > 0.0) {
            warnings.degenerate_widths += 1;
            width_um = self.options.min_width_um;
        }
        let r_sheet = self
            .tech
            .sheet_resistance(layer)
            .unwrap_or(self.options.default_r_sheet);
        let c_area = self
            .tech
            .area_capacitance(layer)
            .unwrap_or(self.options.default_c_area);
        WireModel::new(r_sheet, c_area, width_um, units, self.options.min_resistance)
    }
}
