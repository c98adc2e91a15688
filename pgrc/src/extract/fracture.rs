//! Wire fracturing
//!
//! A wire is cut wherever something attaches to it (via, pin, port) and then
//! split further so that no resistor stands for more than the maximum segment
//! length. Each piece becomes one resistor; its capacitance is lumped on the
//! piece's trailing node.

use std::collections::HashMap;

use crate::layout::{Orientation, Wire};

use super::graph::NetGraph;

/// Attachment points of one net, keyed by the wire line they can fall on
#[derive(Debug, Default)]
pub(crate) struct CutIndex<'a> {
    /// (layer, y) -> x coordinates, for horizontal wires
    rows: HashMap<(&'a str, i64), Vec<i64>>,
    /// (layer, x) -> y coordinates, for vertical wires
    columns: HashMap<(&'a str, i64), Vec<i64>>,
}

impl<'a> CutIndex<'a> {
    pub(crate) fn add(&mut self, layer: &'a str, x: i64, y: i64) {
        self.rows.entry((layer, y)).or_default().push(x);
        self.columns.entry((layer, x)).or_default().push(y);
    }

    /// Sorted, deduplicated cut coordinates along `wire`, endpoints included
    pub(crate) fn cuts_for(&self, wire: &Wire) -> Vec<i64> {
        let (lo, hi) = wire.span();
        let line = match wire.orient {
            Orientation::Horizontal => self.rows.get(&(wire.layer.as_str(), wire.center)),
            Orientation::Vertical => self.columns.get(&(wire.layer.as_str(), wire.center)),
        };

        let mut cuts = Vec::with_capacity(2 + line.map_or(0, Vec::len));
        cuts.push(lo);
        cuts.push(hi);
        if let Some(points) = line {
            cuts.extend(points.iter().copied().filter(|p| (lo..=hi).contains(p)));
        }
        cuts.sort_unstable();
        cuts.dedup();
        cuts
    }
}

/// Electrical model of one wire
#[derive(Debug, Clone, Copy)]
pub(crate) struct WireModel {
    /// Ohm per micron
    pub r_per_um: f64,
    /// fF per micron
    pub c_per_um: f64,
    /// Database units per micron
    pub units: f64,
    /// Resistance floor in ohm
    pub min_resistance: f64,
}

impl WireModel {
    pub(crate) fn new(r_sheet: f64, c_area: f64, width_um: f64, units: f64, min_resistance: f64) -> Self {
        Self {
            r_per_um: r_sheet / width_um,
            c_per_um: width_um * c_area,
            units,
            min_resistance,
        }
    }

    pub(crate) fn resistance(&self, length: i64) -> f64 {
        (self.r_per_um * length as f64 / self.units).max(self.min_resistance)
    }

    pub(crate) fn capacitance(&self, length: i64) -> f64 {
        (self.c_per_um * length as f64 / self.units).max(0.0)
    }
}

/// Points splitting the gap `(from, to]` into the fewest equal pieces no longer
/// than `max_len`. The last point is always `to`.
pub(crate) fn subdivide(from: i64, to: i64, max_len: i64) -> impl Iterator<Item = i64> {
    let gap = to - from;
    let pieces = if gap > max_len {
        (gap + max_len - 1) / max_len
    } else {
        1
    };
    (1..=pieces).map(move |k| from + ((gap as i128 * k as i128) / pieces as i128) as i64)
}

/// Fracture one wire into `graph`
pub(crate) fn fracture_wire(
    graph: &mut NetGraph,
    wire: &Wire,
    cuts: &[i64],
    model: &WireModel,
    max_len: i64,
) {
    let Some((&first, rest)) = cuts.split_first() else {
        return;
    };
    let layer = graph.intern_layer(&wire.layer);

    let (x, y) = wire.point_at(first);
    let mut prev_node = graph.node(layer, x, y);
    let mut prev = first;

    for &cut in rest {
        for point in subdivide(prev, cut, max_len) {
            let length = point - prev;
            if length <= 0 {
                continue;
            }
            let (x, y) = wire.point_at(point);
            let node = graph.node(layer, x, y);
            graph.add_resistor(prev_node, node, model.resistance(length));
            graph.add_capacitance(node, model.capacitance(length));
            prev_node = node;
            prev = point;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> WireModel {
        // 0.1 ohm/sq on a 0.2 um wire, 0.2 fF/um^2
        WireModel::new(0.1, 0.2, 0.2, 1000.0, 0.001)
    }

    #[test]
    fn test_subdivide_short_gap_is_one_piece() {
        let points: Vec<i64> = subdivide(0, 1500, 2000).collect();
        assert_eq!(points, vec![1500]);
    }

    #[test]
    fn test_subdivide_uses_fewest_equal_pieces() {
        let points: Vec<i64> = subdivide(0, 45_000, 20_000).collect();
        assert_eq!(points, vec![15_000, 30_000, 45_000]);

        let points: Vec<i64> = subdivide(100, 40_100, 20_000).collect();
        assert_eq!(points, vec![20_100, 40_100]);
    }

    #[test]
    fn test_subdivide_never_exceeds_max() {
        for gap in [1, 19_999, 20_000, 20_001, 39_999, 40_001, 1_000_003] {
            let mut prev = 0;
            for point in subdivide(0, gap, 20_000) {
                assert!(point - prev <= 20_000, "gap {} piece {}", gap, point - prev);
                assert!(point > prev);
                prev = point;
            }
            assert_eq!(prev, gap);
        }
    }

    #[test]
    fn test_cuts_include_endpoints_and_on_line_contacts_only() {
        let mut index = CutIndex::default();
        index.add("M1", 300, 0); // on the wire
        index.add("M1", 300, 0); // duplicate
        index.add("M1", 700, 10); // off the centerline
        index.add("M2", 500, 0); // other layer
        index.add("M1", 5_000, 0); // beyond the span

        let wire = Wire::horizontal("M1", 0, 1000, 0, 100);
        assert_eq!(index.cuts_for(&wire), vec![0, 300, 1000]);
    }

    #[test]
    fn test_fracture_conserves_resistance() {
        let wire = Wire::horizontal("M1", 0, 0, 100_000, 200);
        let m = model();
        let mut graph = NetGraph::new("VDD");
        fracture_wire(&mut graph, &wire, &[0, 100_000], &m, 20_000);

        assert_eq!(graph.resistors().len(), 5);
        let total: f64 = graph.resistors().iter().map(|r| r.ohms).sum();
        let direct = 0.1 / 0.2 * 100.0;
        assert!((total - direct).abs() < 1e-9);

        let cap = graph.total_capacitance();
        assert!((cap - 0.2 * 0.2 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_fracture_vertical_wire_reuses_nodes() {
        let wire = Wire::vertical("M2", 50, 0, 3000, 200);
        let mut graph = NetGraph::new("VDD");
        fracture_wire(&mut graph, &wire, &[0, 1000, 3000], &model(), 20_000);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.nodes().lookup("M2", 50, 1000), Some(1));
        let r = graph.resistors()[1];
        assert_eq!((r.a, r.b), (1, 2));
    }

    #[test]
    fn test_resistance_floor_applies() {
        let m = model();
        assert_eq!(m.resistance(0), 0.001);
        assert!(m.resistance(1000) > 0.001);
    }
}
