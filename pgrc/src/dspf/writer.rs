//! DSPF writer
//!
//! Output is a pure function of the extracted graphs: nets are written in name
//! order, and inside a net every list is sorted by the spatial key
//! (layer name, x, y) rather than by node id, so two graphs holding the same
//! network produce the same bytes however they were built.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::core::PgrcError;
use crate::extract::{ContactKind, Extraction, NetGraph, NodeId};

use super::naming::write_coordinate_name;

const WRITE_BUFFER: usize = 1 << 20;

/// Net sections rendered in parallel before they are written out; bounds how
/// much of the file is held in memory at once
const NETS_PER_BATCH: usize = 64;

/// Master name written for every instance in the connectivity section
pub const INSTANCE_MASTER: &str = "STD_CELL";

#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Subcircuit name; the extraction's design name when `None`
    pub design_name: Option<String>,
    pub ground_net: String,
    /// Render batches of net sections on the rayon pool, writing each batch in order
    pub parallel: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            design_name: None,
            ground_net: "VSS".to_string(),
            parallel: true,
        }
    }
}

pub struct DspfWriter {
    options: WriterOptions,
}

impl DspfWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn write_file(&self, path: &Path, extraction: &Extraction) -> Result<(), PgrcError> {
        let io_err = |source| PgrcError::Io {
            path: path.to_path_buf(),
            source,
        };
        tracing::info!("Writing DSPF {}", path.display());
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::with_capacity(WRITE_BUFFER, file);
        self.write(&mut out, extraction).map_err(io_err)?;
        out.flush().map_err(io_err)?;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut W, extraction: &Extraction) -> io::Result<()> {
        let design = self
            .options
            .design_name
            .as_deref()
            .unwrap_or(&extraction.design);
        self.write_header(out, design, extraction)?;

        let units = extraction.units as f64;
        if self.options.parallel {
            let graphs: Vec<&NetGraph> = extraction.nets.values().collect();
            for batch in graphs.chunks(NETS_PER_BATCH) {
                let sections: Vec<Vec<u8>> = batch
                    .par_iter()
                    .map(|graph| {
                        let mut buf = Vec::new();
                        self.write_net(&mut buf, graph, units).map(|_| buf)
                    })
                    .collect::<io::Result<_>>()?;
                for section in sections {
                    out.write_all(&section)?;
                }
            }
        } else {
            for graph in extraction.nets.values() {
                self.write_net(out, graph, units)?;
            }
        }

        self.write_instances(out, extraction)?;
        out.write_all(b".ENDS\n")
    }

    /// Render into memory (small designs and tests)
    pub fn render(&self, extraction: &Extraction) -> io::Result<String> {
        let mut buf = Vec::new();
        self.write(&mut buf, extraction)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_header<W: Write>(
        &self,
        out: &mut W,
        design: &str,
        extraction: &Extraction,
    ) -> io::Result<()> {
        write!(out, ".SUBCKT {}", design)?;
        for net in extraction.nets.keys() {
            write!(out, " {}", net)?;
        }
        writeln!(out)?;
        writeln!(out, "* pgrc parasitic netlist")?;
        writeln!(out, "*|GROUND_NET {}", self.options.ground_net)?;
        writeln!(out, "*")
    }

    fn write_net<W: Write>(&self, out: &mut W, graph: &NetGraph, units: f64) -> io::Result<()> {
        let net = graph.name();
        let nodes = graph.nodes();
        writeln!(out, "*|NET {} {:.4E}PF", net, graph.total_capacitance() / 1000.0)?;

        let mut ports: Vec<_> = graph.ports().iter().collect();
        ports.sort_by(|a, b| (&a.name, &a.layer, a.x, a.y).cmp(&(&b.name, &b.layer, b.x, b.y)));
        for port in ports {
            writeln!(
                out,
                "*|P ({} B 0.0 {:.3} {:.3})",
                port.name,
                port.x as f64 / units,
                port.y as f64 / units
            )?;
        }

        let mut pins: Vec<_> = graph.pins().iter().collect();
        pins.sort_by(|a, b| (&a.name, &a.layer, a.x, a.y).cmp(&(&b.name, &b.layer, b.x, b.y)));
        for pin in pins {
            if let ContactKind::InstancePin { instance, pin: pin_name } = &pin.kind {
                writeln!(
                    out,
                    "*|I ({} {} {} I 0.0 {:.3} {:.3})",
                    pin.name,
                    instance,
                    pin_name,
                    pin.x as f64 / units,
                    pin.y as f64 / units
                )?;
            }
        }

        let order = SpatialOrder::new(graph);

        for &id in &order.nodes {
            if graph.rename(id).is_some() {
                continue;
            }
            write!(out, "*|S (")?;
            write_coordinate_name(out, net, nodes.layer_of(id), nodes.x(id), nodes.y(id))?;
            writeln!(
                out,
                " {:.3} {:.3})",
                nodes.x(id) as f64 / units,
                nodes.y(id) as f64 / units
            )?;
        }

        for (i, &(a, b, ohms)) in order.resistors(graph).iter().enumerate() {
            write!(out, "R{}_{} ", net, i)?;
            write_node_name(out, graph, a)?;
            out.write_all(b" ")?;
            write_node_name(out, graph, b)?;
            writeln!(out, " {:.4E}", ohms)?;
        }

        let mut index = 0;
        for &id in &order.nodes {
            let cap = graph.capacitance(id);
            if cap <= 0.0 {
                continue;
            }
            write!(out, "C{}_{} ", net, index)?;
            write_node_name(out, graph, id)?;
            writeln!(out, " {} {:.4E}PF", self.options.ground_net, cap / 1000.0)?;
            index += 1;
        }

        writeln!(out)
    }

    fn write_instances<W: Write>(&self, out: &mut W, extraction: &Extraction) -> io::Result<()> {
        writeln!(out, "* Instance Section")?;

        let mut instances: BTreeMap<&str, BTreeMap<&str, (&NetGraph, Option<NodeId>, &str)>> =
            BTreeMap::new();
        for graph in extraction.nets.values() {
            for binding in graph.pins() {
                if let ContactKind::InstancePin { instance, pin } = &binding.kind {
                    instances
                        .entry(instance.as_str())
                        .or_default()
                        .entry(pin.as_str())
                        .or_insert((graph, binding.node, binding.name.as_str()));
                }
            }
        }

        for (instance, pins) in instances {
            write!(out, "X{}", instance)?;
            for (pin, (graph, node, symbolic)) in pins {
                write!(out, " {}=", pin)?;
                match node {
                    Some(id) => write_node_name(out, graph, id)?,
                    None => out.write_all(symbolic.as_bytes())?,
                }
            }
            writeln!(out, " {}", INSTANCE_MASTER)?;
        }
        Ok(())
    }
}

/// Symbolic name if the node was claimed, coordinate name otherwise
fn write_node_name<W: Write>(out: &mut W, graph: &NetGraph, id: NodeId) -> io::Result<()> {
    match graph.rename(id) {
        Some(name) => out.write_all(name.as_bytes()),
        None => {
            let nodes = graph.nodes();
            write_coordinate_name(out, graph.name(), nodes.layer_of(id), nodes.x(id), nodes.y(id))
        }
    }
}

/// Node ordering independent of id assignment
struct SpatialOrder {
    /// Rank of each interned layer by layer name
    layer_rank: Vec<u32>,
    /// Node ids sorted by (layer name, x, y)
    nodes: Vec<NodeId>,
}

impl SpatialOrder {
    fn new(graph: &NetGraph) -> Self {
        let table = graph.nodes();
        let names = table.layer_names();
        let mut by_name: Vec<usize> = (0..names.len()).collect();
        by_name.sort_by(|&a, &b| names[a].cmp(&names[b]));
        let mut layer_rank = vec![0u32; names.len()];
        for (rank, layer) in by_name.into_iter().enumerate() {
            layer_rank[layer] = rank as u32;
        }

        let mut nodes: Vec<NodeId> = table.ids().collect();
        nodes.sort_unstable_by_key(|&id| order_key(&layer_rank, graph, id));
        Self { layer_rank, nodes }
    }

    /// Resistors with endpoints in spatial order, sorted by (a, b, value)
    fn resistors(&self, graph: &NetGraph) -> Vec<(NodeId, NodeId, f64)> {
        let mut keyed: Vec<_> = graph
            .resistors()
            .iter()
            .map(|r| {
                let ka = order_key(&self.layer_rank, graph, r.a);
                let kb = order_key(&self.layer_rank, graph, r.b);
                if ka <= kb {
                    (ka, kb, r.ohms.to_bits(), r.a, r.b, r.ohms)
                } else {
                    (kb, ka, r.ohms.to_bits(), r.b, r.a, r.ohms)
                }
            })
            .collect();
        keyed.sort_unstable_by_key(|k| (k.0, k.1, k.2));
        keyed.into_iter().map(|k| (k.3, k.4, k.5)).collect()
    }
}

fn order_key(layer_rank: &[u32], graph: &NetGraph, id: NodeId) -> (u32, i64, i64) {
    let key = graph.nodes().key(id);
    (layer_rank[key.layer as usize], key.x, key.y)
}
