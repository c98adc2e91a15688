//! Short check
//!
//! Every coordinate-derived node name pins a net to an exact (layer, x, y).
//! Two nets claiming the same point are shorted there, whatever their
//! connectivity looks like.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dspf::{ParsedNet, SpatialKey};

use super::report::ShortLocation;

/// Point -> nets that declare a node there
#[derive(Debug, Default)]
pub struct SpatialIndex<'a> {
    claims: HashMap<&'a SpatialKey, BTreeSet<&'a str>>,
}

impl<'a> SpatialIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_net(&mut self, net: &'a ParsedNet) {
        for key in &net.locations {
            self.claims.entry(key).or_default().insert(net.name.as_str());
        }
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Points with more than one claimant, sorted by (layer, x, y)
    pub fn shorts(&self) -> Vec<ShortLocation> {
        let collisions: BTreeMap<&SpatialKey, &BTreeSet<&str>> = self
            .claims
            .iter()
            .filter(|(_, nets)| nets.len() > 1)
            .map(|(key, nets)| (*key, nets))
            .collect();
        collisions
            .into_iter()
            .map(|(key, nets)| ShortLocation {
                layer: key.layer.clone(),
                x: key.x,
                y: key.y,
                nets: nets.iter().map(|n| n.to_string()).collect(),
            })
            .collect()
    }
}

pub fn find_shorts<'a, I>(nets: I) -> Vec<ShortLocation>
where
    I: IntoIterator<Item = &'a ParsedNet>,
{
    let mut index = SpatialIndex::new();
    for net in nets {
        index.insert_net(net);
    }
    let shorts = index.shorts();
    if !shorts.is_empty() {
        tracing::warn!("{} short locations over {} indexed points", shorts.len(), index.len());
    }
    shorts
}
