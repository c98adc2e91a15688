//! Coordinate-derived node names
//!
//! Nodes without a symbolic name are written as `n_<net>_<layer>_<x>_<y>` with
//! x and y in integer database units. The verifier decodes these names back to
//! exact points to build its spatial index; anything that does not decode is
//! treated as a symbolic name.

use std::io::{self, Write};

/// A point on a layer, as recovered from a node name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialKey {
    pub layer: String,
    pub x: i64,
    pub y: i64,
}

pub fn coordinate_name(net: &str, layer: &str, x: i64, y: i64) -> String {
    format!("n_{}_{}_{}_{}", net, layer, x, y)
}

/// Write a coordinate name straight into a stream
pub fn write_coordinate_name<W: Write>(
    out: &mut W,
    net: &str,
    layer: &str,
    x: i64,
    y: i64,
) -> io::Result<()> {
    write!(out, "n_{}_{}_{}_{}", net, layer, x, y)
}

/// Decode a coordinate name.
///
/// When the owning net is known its `n_<net>_` prefix is stripped first, so net
/// names containing `_` decode correctly and the layer may contain `_` too.
/// Otherwise the last three `_`-separated fields are taken as layer, x, y.
pub fn decode_coordinate_name(name: &str, net: Option<&str>) -> Option<SpatialKey> {
    let body = name.strip_prefix("n_")?;

    if let Some(net) = net {
        if let Some(rest) = body
            .strip_prefix(net)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            if let Some(key) = split_layer_xy(rest) {
                return Some(key);
            }
        }
    }

    // Unknown owner: need at least net, layer, x, y
    let mut fields = body.rsplitn(4, '_');
    let y = fields.next()?.parse().ok()?;
    let x = fields.next()?.parse().ok()?;
    let layer = fields.next()?;
    let net = fields.next()?;
    if layer.is_empty() || net.is_empty() {
        return None;
    }
    Some(SpatialKey {
        layer: layer.to_string(),
        x,
        y,
    })
}

/// `<layer>_<x>_<y>` where the layer may itself contain `_`
fn split_layer_xy(rest: &str) -> Option<SpatialKey> {
    let mut fields = rest.rsplitn(3, '_');
    let y = fields.next()?.parse().ok()?;
    let x = fields.next()?.parse().ok()?;
    let layer = fields.next()?;
    if layer.is_empty() {
        return None;
    }
    Some(SpatialKey {
        layer: layer.to_string(),
        x,
        y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(layer: &str, x: i64, y: i64) -> SpatialKey {
        SpatialKey {
            layer: layer.to_string(),
            x,
            y,
        }
    }

    #[test]
    fn test_decode_with_known_net() {
        let name = coordinate_name("VDD_CORE", "M3", 1000, 2000);
        assert_eq!(name, "n_VDD_CORE_M3_1000_2000");
        assert_eq!(
            decode_coordinate_name(&name, Some("VDD_CORE")),
            Some(key("M3", 1000, 2000))
        );
    }

    #[test]
    fn test_decode_negative_coordinates() {
        let name = coordinate_name("VSS", "M1", -250, -4);
        assert_eq!(decode_coordinate_name(&name, Some("VSS")), Some(key("M1", -250, -4)));
    }

    #[test]
    fn test_decode_layer_with_underscore_needs_net() {
        let name = coordinate_name("VSS", "M1_thick", 5, 6);
        assert_eq!(
            decode_coordinate_name(&name, Some("VSS")),
            Some(key("M1_thick", 5, 6))
        );
    }

    #[test]
    fn test_decode_foreign_net_falls_back_to_last_fields() {
        let name = coordinate_name("VDD_MEM", "M3", 1000, 2000);
        assert_eq!(decode_coordinate_name(&name, Some("VSS")), Some(key("M3", 1000, 2000)));
        assert_eq!(decode_coordinate_name(&name, None), Some(key("M3", 1000, 2000)));
    }

    #[test]
    fn test_symbolic_names_do_not_decode() {
        assert_eq!(decode_coordinate_name("cell_0:VDD", Some("VDD")), None);
        assert_eq!(decode_coordinate_name("VDD_PIN_M9_100_200", Some("VDD")), None);
        assert_eq!(decode_coordinate_name("n_VDD_M1_x_0", Some("VDD")), None);
        assert_eq!(decode_coordinate_name("n_M1_0_0", None), None);
    }

    #[test]
    fn test_write_matches_format() {
        let mut buf = Vec::new();
        write_coordinate_name(&mut buf, "VDD", "M2", 3, -9).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), coordinate_name("VDD", "M2", 3, -9));
    }
}
