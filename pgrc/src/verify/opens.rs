//! Open (floating pin) check
//!
//! Resistor edges become an undirected graph with one extra root node wired to
//! every declared port. A single BFS from the root then marks everything a port
//! can reach; any instance pin left unmarked is floating.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;

use crate::dspf::ParsedNet;

use super::report::NetOpenResult;

pub fn check_net(net: &ParsedNet) -> NetOpenResult {
    let mut result = NetOpenResult {
        net: net.name.clone(),
        ports: net.ports.len(),
        instance_pins: net.instance_pins.len(),
        floating_pins: Vec::new(),
        traversed: false,
    };

    if net.instance_pins.is_empty() {
        return result;
    }
    if net.ports.is_empty() {
        let pins: BTreeSet<&String> = net.instance_pins.iter().collect();
        result.floating_pins = pins.into_iter().cloned().collect();
        return result;
    }

    let mut graph: UnGraph<(), ()> =
        UnGraph::with_capacity(net.nodes.len() + 1, net.resistors.len() + net.ports.len());
    let root = graph.add_node(());
    let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(net.nodes.len());

    for (a, b) in &net.resistors {
        let a = intern(&mut graph, &mut index, a);
        let b = intern(&mut graph, &mut index, b);
        graph.add_edge(a, b, ());
    }
    for port in &net.ports {
        let p = intern(&mut graph, &mut index, port);
        graph.add_edge(root, p, ());
    }
    let pins: Vec<(&String, NodeIndex)> = net
        .instance_pins
        .iter()
        .map(|pin| (pin, intern(&mut graph, &mut index, pin)))
        .collect();

    let mut bfs = Bfs::new(&graph, root);
    while bfs.next(&graph).is_some() {}

    let floating: BTreeSet<&String> = pins
        .into_iter()
        .filter(|(_, idx)| !bfs.discovered.contains(idx.index()))
        .map(|(pin, _)| pin)
        .collect();
    result.floating_pins = floating.into_iter().cloned().collect();
    result.traversed = true;
    result
}

fn intern<'a>(
    graph: &mut UnGraph<(), ()>,
    index: &mut HashMap<&'a str, NodeIndex>,
    name: &'a str,
) -> NodeIndex {
    *index.entry(name).or_insert_with(|| graph.add_node(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(ports: &[&str], pins: &[&str], resistors: &[(&str, &str)]) -> ParsedNet {
        let mut net = ParsedNet {
            name: "VDD".to_string(),
            ports: ports.iter().map(|s| s.to_string()).collect(),
            instance_pins: pins.iter().map(|s| s.to_string()).collect(),
            resistors: resistors
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            ..Default::default()
        };
        for name in ports.iter().chain(pins) {
            net.nodes.insert(name.to_string());
        }
        for (a, b) in resistors {
            net.nodes.insert(a.to_string());
            net.nodes.insert(b.to_string());
        }
        net
    }

    #[test]
    fn test_connected_pin_passes() {
        let result = check_net(&net(&["P"], &["X"], &[("P", "X")]));
        assert!(result.passed());
        assert!(result.traversed);
    }

    #[test]
    fn test_removed_resistor_floats_pin() {
        let result = check_net(&net(&["P"], &["X"], &[]));
        assert_eq!(result.floating_pins, vec!["X"]);
    }

    #[test]
    fn test_reaches_through_chain_and_any_port() {
        let resistors = [("P1", "a"), ("a", "X1"), ("P2", "b"), ("b", "X2"), ("c", "X3")];
        let result = check_net(&net(&["P1", "P2"], &["X1", "X2", "X3"], &resistors));
        assert_eq!(result.floating_pins, vec!["X3"]);
    }

    #[test]
    fn test_isolated_net_skips_traversal() {
        let result = check_net(&net(&[], &["X"], &[]));
        assert_eq!(result.floating_pins, vec!["X"]);
        assert!(!result.traversed);
    }

    #[test]
    fn test_pin_sharing_port_node_is_reached() {
        let result = check_net(&net(&["P"], &["P"], &[]));
        assert!(result.passed());
    }
}
