//! Verification reports

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

/// Human output lists at most this many short locations
pub const SHORTS_SHOWN: usize = 5;

/// Open-check result for one net
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetOpenResult {
    pub net: String,
    pub ports: usize,
    pub instance_pins: usize,
    /// Instance pins no port reaches, sorted
    pub floating_pins: Vec<String>,
    /// False when the net has no ports and every pin was flagged directly
    pub traversed: bool,
}

impl NetOpenResult {
    pub fn passed(&self) -> bool {
        self.floating_pins.is_empty()
    }
}

/// A (layer, x, y) point claimed by more than one net
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortLocation {
    pub layer: String,
    pub x: i64,
    pub y: i64,
    /// Sorted names of the colliding nets
    pub nets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationStats {
    pub nets: usize,
    pub nodes: usize,
    pub resistors: usize,
    pub capacitors: usize,
    pub ports: usize,
    pub instance_pins: usize,
    pub floating_pins: usize,
    pub shorts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Failed,
    /// Not checked (file over the size limit)
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub file: Option<PathBuf>,
    pub design: String,
    pub status: VerificationStatus,
    /// Why the file was not checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub opens_checked: bool,
    /// One entry per net section, in net-name order
    pub opens: Vec<NetOpenResult>,
    pub shorts: Vec<ShortLocation>,
    pub stats: VerificationStats,
}

impl VerificationReport {
    pub(crate) fn new(
        design: String,
        opens_checked: bool,
        opens: Vec<NetOpenResult>,
        shorts: Vec<ShortLocation>,
        mut stats: VerificationStats,
    ) -> Self {
        stats.floating_pins = opens.iter().map(|n| n.floating_pins.len()).sum();
        stats.shorts = shorts.len();
        let status = if stats.floating_pins == 0 && shorts.is_empty() {
            VerificationStatus::Passed
        } else {
            VerificationStatus::Failed
        };
        Self {
            file: None,
            design,
            status,
            skipped: None,
            opens_checked,
            opens,
            shorts,
            stats,
        }
    }

    pub(crate) fn skipped(file: PathBuf, reason: String) -> Self {
        Self {
            file: Some(file),
            design: String::new(),
            status: VerificationStatus::Skipped,
            skipped: Some(reason),
            opens_checked: false,
            opens: Vec::new(),
            shorts: Vec::new(),
            stats: VerificationStats::default(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == VerificationStatus::Failed
    }

    pub fn opens_passed(&self) -> bool {
        self.opens.iter().all(NetOpenResult::passed)
    }

    pub fn shorts_passed(&self) -> bool {
        self.shorts.is_empty()
    }

    pub fn floating_nets(&self) -> impl Iterator<Item = &NetOpenResult> {
        self.opens.iter().filter(|n| !n.passed())
    }

    /// Plain-text rendering for terminals and logs
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        let name = self
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| self.design.clone());

        if let Some(reason) = &self.skipped {
            let _ = writeln!(out, "SKIPPED {}: {}", name, reason);
            return out;
        }

        let _ = writeln!(out, "Verifying {}", name);
        if self.opens_checked {
            let _ = writeln!(out, "  Opens:");
            for net in &self.opens {
                if net.passed() {
                    let _ = writeln!(
                        out,
                        "    [PASS] {} ({} ports, {} pins)",
                        net.net, net.ports, net.instance_pins
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "    [FAIL] {}: {} of {} pins floating",
                        net.net,
                        net.floating_pins.len(),
                        net.instance_pins
                    );
                    for pin in &net.floating_pins {
                        let _ = writeln!(out, "      {}", pin);
                    }
                }
            }
        } else {
            let _ = writeln!(out, "  Opens: not checked");
        }

        if self.shorts.is_empty() {
            let _ = writeln!(out, "  Shorts: [PASS]");
        } else {
            let _ = writeln!(out, "  Shorts: [FAIL] {} locations", self.shorts.len());
            for short in self.shorts.iter().take(SHORTS_SHOWN) {
                let _ = writeln!(
                    out,
                    "    {} ({}, {}): {}",
                    short.layer,
                    short.x,
                    short.y,
                    short.nets.join(", ")
                );
            }
            if self.shorts.len() > SHORTS_SHOWN {
                let _ = writeln!(out, "    ... and {} more", self.shorts.len() - SHORTS_SHOWN);
            }
        }

        let verdict = if self.passed() { "PASSED" } else { "FAILED" };
        let _ = writeln!(
            out,
            "  Result: {} ({} nets, {} floating pins, {} shorts)",
            verdict, self.stats.nets, self.stats.floating_pins, self.stats.shorts
        );
        out
    }
}
