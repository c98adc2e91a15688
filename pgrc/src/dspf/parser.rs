//! DSPF parser
//!
//! Reads the text back without any access to the extractor's graphs. A single
//! sequential pass finds the header, the net section boundaries and the
//! instance section; net sections are then parsed independently (on the rayon
//! pool when enabled).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use thiserror::Error;

use crate::core::PgrcError;

use super::naming::{decode_coordinate_name, SpatialKey};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DspfParseError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("line {line}: duplicate section for net '{net}'")]
    DuplicateNet { line: usize, net: String },

    #[error("line {line}: element outside of a net section")]
    OutsideNet { line: usize },

    #[error("missing .ENDS")]
    MissingEnds,
}

fn malformed(line: usize, message: impl Into<String>) -> DspfParseError {
    DspfParseError::Malformed {
        line,
        message: message.into(),
    }
}

/// Everything the verifier needs about one net section
#[derive(Debug, Clone, Default)]
pub struct ParsedNet {
    pub name: String,
    /// Total capacitance from the `*|NET` line, pF
    pub total_capacitance_pf: f64,
    pub ports: Vec<String>,
    pub instance_pins: Vec<String>,
    /// Resistor endpoints by node name
    pub resistors: Vec<(String, String)>,
    pub capacitors: usize,
    /// Every node name the section mentions (ground excluded)
    pub nodes: HashSet<String>,
    /// Decoded points of the section's coordinate-derived names
    pub locations: HashSet<SpatialKey>,
}

/// One `X` line of the instance section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConnection {
    pub instance: String,
    /// (pin, node) in file order
    pub pins: Vec<(String, String)>,
    pub master: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedDspf {
    pub design: String,
    /// Nets listed on the `.SUBCKT` line
    pub declared_nets: Vec<String>,
    pub ground_net: Option<String>,
    pub nets: BTreeMap<String, ParsedNet>,
    pub instances: Vec<InstanceConnection>,
}

impl ParsedDspf {
    pub fn net(&self, name: &str) -> Option<&ParsedNet> {
        self.nets.get(name)
    }
}

/// Line range of one net section; `start` is the `*|NET` line
struct Section<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
pub struct DspfParser {
    parallel: bool,
}

impl Default for DspfParser {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl DspfParser {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedDspf, PgrcError> {
        let content = fs::read_to_string(path).map_err(|source| PgrcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse_str(&content)?)
    }

    pub fn parse_str(&self, content: &str) -> Result<ParsedDspf, DspfParseError> {
        let lines: Vec<&str> = content.lines().collect();
        let mut parsed = ParsedDspf::default();
        let mut sections: Vec<Section> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current: Option<Section> = None;
        let mut ended = false;

        for (idx, raw) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.eq_ignore_ascii_case(".ENDS") {
                sections.extend(current.take().map(|s| Section { end: idx, ..s }));
                ended = true;
                break;
            }

            if let Some(rest) = keyword(line, ".SUBCKT") {
                let mut fields = rest.split_whitespace();
                parsed.design = fields
                    .next()
                    .ok_or_else(|| malformed(line_no, ".SUBCKT without a design name"))?
                    .to_string();
                parsed.declared_nets = fields.map(str::to_string).collect();
            } else if let Some(rest) = line.strip_prefix("*|GROUND_NET") {
                parsed.ground_net = rest.split_whitespace().next().map(str::to_string);
            } else if let Some(rest) = line.strip_prefix("*|NET") {
                sections.extend(current.take().map(|s| Section { end: idx, ..s }));
                let name = rest
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| malformed(line_no, "*|NET without a net name"))?;
                if !seen.insert(name) {
                    return Err(DspfParseError::DuplicateNet {
                        line: line_no,
                        net: name.to_string(),
                    });
                }
                current = Some(Section {
                    name,
                    start: idx,
                    end: idx,
                });
            } else if is_element(line) {
                if current.is_none() {
                    return Err(DspfParseError::OutsideNet { line: line_no });
                }
            } else if let Some(rest) = line.strip_prefix('X') {
                sections.extend(current.take().map(|s| Section { end: idx, ..s }));
                parsed.instances.push(parse_instance(rest, line_no)?);
            } else if line.starts_with('*') {
                // comment
            } else {
                return Err(malformed(line_no, format!("unrecognized line '{}'", line)));
            }
        }

        if !ended {
            return Err(DspfParseError::MissingEnds);
        }

        let nets: Vec<ParsedNet> = if self.parallel {
            sections
                .par_iter()
                .map(|s| parse_section(&lines, s))
                .collect::<Result<_, _>>()?
        } else {
            sections
                .iter()
                .map(|s| parse_section(&lines, s))
                .collect::<Result<_, _>>()?
        };
        parsed.nets = nets.into_iter().map(|n| (n.name.clone(), n)).collect();

        tracing::debug!(
            "Parsed DSPF '{}': {} net sections, {} instances",
            parsed.design,
            parsed.nets.len(),
            parsed.instances.len()
        );
        Ok(parsed)
    }
}

/// `rest` of `line` after a case-insensitive keyword followed by whitespace
fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let head = line.get(..word.len())?;
    let rest = &line[word.len()..];
    if head.eq_ignore_ascii_case(word) && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        Some(rest)
    } else {
        None
    }
}

fn is_element(line: &str) -> bool {
    line.starts_with("*|P")
        || line.starts_with("*|I")
        || line.starts_with("*|S")
        || line.starts_with('R')
        || line.starts_with('C')
}

fn parse_instance(rest: &str, line_no: usize) -> Result<InstanceConnection, DspfParseError> {
    let mut fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(malformed(line_no, "instance line needs a name and a master"));
    }
    let instance = fields.remove(0).to_string();
    let master = fields.pop().unwrap_or_default().to_string();
    let pins = fields
        .into_iter()
        .map(|field| {
            field
                .split_once('=')
                .map(|(pin, node)| (pin.to_string(), node.to_string()))
                .ok_or_else(|| malformed(line_no, format!("expected pin=node, got '{}'", field)))
        })
        .collect::<Result<_, _>>()?;
    Ok(InstanceConnection {
        instance,
        pins,
        master,
    })
}

/// Value with an optional `PF` suffix
fn parse_value(token: &str, line_no: usize) -> Result<f64, DspfParseError> {
    let number = token
        .strip_suffix("PF")
        .or_else(|| token.strip_suffix("pF"))
        .or_else(|| token.strip_suffix("pf"))
        .unwrap_or(token);
    number
        .parse::<f64>()
        .map_err(|_| malformed(line_no, format!("invalid value '{}'", token)))
}

/// First name inside a `*|P (...)` style declaration
fn declared_name<'a>(rest: &'a str, line_no: usize) -> Result<&'a str, DspfParseError> {
    let inner = rest
        .trim()
        .strip_prefix('(')
        .ok_or_else(|| malformed(line_no, "declaration without '('"))?;
    inner
        .trim_end_matches(')')
        .split_whitespace()
        .next()
        .ok_or_else(|| malformed(line_no, "empty declaration"))
}

fn parse_section(lines: &[&str], section: &Section) -> Result<ParsedNet, DspfParseError> {
    let mut net = ParsedNet {
        name: section.name.to_string(),
        ..Default::default()
    };

    let header_no = section.start + 1;
    let mut header = lines[section.start].trim()["*|NET".len()..].split_whitespace();
    header.next();
    net.total_capacitance_pf = match header.next() {
        Some(token) => parse_value(token, header_no)?,
        None => 0.0,
    };

    for (offset, raw) in lines[section.start + 1..section.end].iter().enumerate() {
        let line_no = section.start + 2 + offset;
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix("*|P") {
            let name = declared_name(rest, line_no)?;
            net.ports.push(name.to_string());
            net.nodes.insert(name.to_string());
        } else if let Some(rest) = line.strip_prefix("*|I") {
            let name = declared_name(rest, line_no)?;
            net.instance_pins.push(name.to_string());
            net.nodes.insert(name.to_string());
        } else if let Some(rest) = line.strip_prefix("*|S") {
            let name = declared_name(rest, line_no)?;
            net.nodes.insert(name.to_string());
        } else if line.starts_with('R') {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(malformed(line_no, "resistor needs a name, two nodes and a value"));
            }
            parse_value(fields[3], line_no)?;
            net.nodes.insert(fields[1].to_string());
            net.nodes.insert(fields[2].to_string());
            net.resistors.push((fields[1].to_string(), fields[2].to_string()));
        } else if line.starts_with('C') {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(malformed(line_no, "capacitor needs a name, two nodes and a value"));
            }
            parse_value(fields[3], line_no)?;
            net.nodes.insert(fields[1].to_string());
            net.capacitors += 1;
        }
    }

    net.locations = net
        .nodes
        .iter()
        .filter_map(|name| decode_coordinate_name(name, Some(&net.name)))
        .collect();
    Ok(net)
}
