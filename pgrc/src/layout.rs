//! Layout geometry consumed by the extractor
//!
//! This is the upstream contract with the power-grid generator: per net, the
//! wires, vias, instance pins and ports, all in integer database units. Layouts
//! are read from JSON.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::PgrcError;
use crate::tech::TechConfig;

fn default_design() -> String {
    "TOP".to_string()
}

/// Direction of a wire's length axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "H", alias = "h", alias = "HORIZONTAL", alias = "horizontal")]
    Horizontal,
    #[serde(rename = "V", alias = "v", alias = "VERTICAL", alias = "vertical")]
    Vertical,
}

/// Axis-aligned wire on one layer
///
/// `center` is the fixed coordinate across the wire (y for horizontal wires,
/// x for vertical ones); `start`/`end` bound the span along the length axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub layer: String,
    pub orient: Orientation,
    pub center: i64,
    pub start: i64,
    pub end: i64,
    pub width: i64,
}

impl Wire {
    pub fn horizontal(layer: impl Into<String>, y: i64, x0: i64, x1: i64, width: i64) -> Self {
        Self {
            layer: layer.into(),
            orient: Orientation::Horizontal,
            center: y,
            start: x0,
            end: x1,
            width,
        }
    }

    pub fn vertical(layer: impl Into<String>, x: i64, y0: i64, y1: i64, width: i64) -> Self {
        Self {
            layer: layer.into(),
            orient: Orientation::Vertical,
            center: x,
            start: y0,
            end: y1,
            width,
        }
    }

    /// Span along the length axis, low end first
    pub fn span(&self) -> (i64, i64) {
        (self.start.min(self.end), self.start.max(self.end))
    }

    pub fn length(&self) -> i64 {
        let (lo, hi) = self.span();
        hi - lo
    }

    /// Point on the centerline at `along` on the length axis
    pub fn point_at(&self, along: i64) -> (i64, i64) {
        match self.orient {
            Orientation::Horizontal => (along, self.center),
            Orientation::Vertical => (self.center, along),
        }
    }
}

/// Via from `bottom` to the next layer up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub bottom: String,
    /// Via type name, used to look up the cut resistance
    pub via: String,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePin {
    pub instance: String,
    pub pin: String,
    pub layer: String,
    pub x: i64,
    pub y: i64,
}

impl InstancePin {
    /// Composite `instance:pin` name
    pub fn name(&self) -> String {
        format!("{}:{}", self.instance, self.pin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub layer: String,
    pub x: i64,
    pub y: i64,
}

/// All geometry of one net
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetGeometry {
    pub name: String,
    #[serde(default)]
    pub wires: Vec<Wire>,
    #[serde(default)]
    pub vias: Vec<Via>,
    #[serde(default)]
    pub pins: Vec<InstancePin>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl NetGeometry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every layer name this net touches (via top layers are not known here)
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.wires
            .iter()
            .map(|w| w.layer.as_str())
            .chain(self.vias.iter().map(|v| v.bottom.as_str()))
            .chain(self.pins.iter().map(|p| p.layer.as_str()))
            .chain(self.ports.iter().map(|p| p.layer.as_str()))
    }

    /// Every name that ends up in a DSPF token must be a single non-empty word
    fn validate_names(&self) -> Result<(), PgrcError> {
        let net = self.name.as_str();
        for layer in self.layer_names() {
            check_name(net, "layer", layer)?;
        }
        for via in &self.vias {
            check_name(net, "via", &via.via)?;
        }
        for pin in &self.pins {
            check_name(net, "instance", &pin.instance)?;
            check_name(net, "pin", &pin.pin)?;
        }
        for port in &self.ports {
            check_name(net, "port", &port.name)?;
        }
        Ok(())
    }
}

/// Characters that would split or end a DSPF token
fn is_reserved(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '=')
}

fn check_name(scope: &str, kind: &str, name: &str) -> Result<(), PgrcError> {
    if name.is_empty() {
        return Err(PgrcError::Config(format!("{}: empty {} name", scope, kind)));
    }
    if name.contains(is_reserved) {
        return Err(PgrcError::Config(format!(
            "{}: invalid {} name '{}'",
            scope, kind, name
        )));
    }
    Ok(())
}

/// A complete layout: design name, technology and nets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default = "default_design")]
    pub design: String,
    #[serde(default)]
    pub tech: TechConfig,
    pub nets: Vec<NetGeometry>,
}

impl Layout {
    pub fn new(design: impl Into<String>, tech: TechConfig) -> Self {
        Self {
            design: design.into(),
            tech,
            nets: Vec::new(),
        }
    }

    /// Read and validate a JSON layout file
    pub fn load(path: &Path) -> Result<Self, PgrcError> {
        let content = std::fs::read_to_string(path).map_err(|source| PgrcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout: Layout =
            serde_json::from_str(&content).map_err(|source| PgrcError::Layout {
                path: path.to_path_buf(),
                source,
            })?;
        layout.validate()?;
        Ok(layout)
    }

    /// Parse and validate a JSON layout held in memory
    pub fn from_json_str(content: &str) -> Result<Self, PgrcError> {
        let layout: Layout = serde_json::from_str(content)
            .map_err(|e| PgrcError::Config(format!("invalid layout JSON: {}", e)))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Reject inputs the extractor cannot make sense of
    pub fn validate(&self) -> Result<(), PgrcError> {
        if self.tech.units == 0 {
            return Err(PgrcError::Config(
                "tech.units must be a positive number of database units per micron".to_string(),
            ));
        }
        if self.nets.is_empty() {
            return Err(PgrcError::Config("layout declares no nets".to_string()));
        }

        let mut layers = HashSet::new();
        for layer in &self.tech.layers {
            check_name("tech", "layer", &layer.name)?;
            if !layers.insert(layer.name.as_str()) {
                return Err(PgrcError::Config(format!(
                    "duplicate layer '{}' in tech section",
                    layer.name
                )));
            }
        }
        for via in &self.tech.vias {
            check_name("tech", "via", &via.name)?;
        }

        let mut nets = HashSet::new();
        for net in &self.nets {
            check_name("layout", "net", &net.name)?;
            if !nets.insert(net.name.as_str()) {
                return Err(PgrcError::Config(format!("duplicate net '{}'", net.name)));
            }
            net.validate_names()?;
        }

        Ok(())
    }

    pub fn net(&self, name: &str) -> Option<&NetGeometry> {
        self.nets.iter().find(|n| n.name == name)
    }

    /// Distinct layer names used by any net, in first-seen order
    pub fn layer_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nets
            .iter()
            .flat_map(|n| n.layer_names())
            .filter(|l| seen.insert(*l))
            .collect()
    }
}
