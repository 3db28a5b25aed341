//! # SoC Tables
//!
//! Per-SoC domain descriptors and topology, selected by the device-tree
//! compatible string of the SCPSYS node.
//!
//! | SoC    | Compatible                  | Domains |
//! |--------|-----------------------------|---------|
//! | MT3612 | `mediatek,mt3612-scpsys`    | 13      |
//! | MT3611 | `mediatek,mt3611-scpsys`    | 9       |

mod mt3611;
mod mt3612;

use crate::descriptor::DomainDescriptor;

pub use mt3611::MT3611;
pub use mt3612::MT3612;

/// Parent/child pair, by domain name
pub type Edge = (&'static str, &'static str);

/// Everything that differs between SoCs
#[derive(Debug)]
pub struct SocData {
    /// SoC name
    pub name: &'static str,
    /// Device-tree compatible string
    pub compatible: &'static str,
    /// Domains in declaration order
    pub domains: &'static [DomainDescriptor],
    /// Parent/child edges declared by the SoC
    pub subdomains: &'static [Edge],
    /// Edges that power an SRAM-retention domain before its dependents
    pub sram_retention: &'static [Edge],
}

impl SocData {
    /// Index of the domain called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.domains.iter().position(|d| d.name == name)
    }

    /// All edges, SoC-declared first
    pub fn edges(&self) -> impl Iterator<Item = &'static Edge> {
        self.subdomains.iter().chain(self.sram_retention.iter())
    }

    /// Look up a supported SoC by compatible string
    pub fn from_compatible(compatible: &str) -> Option<&'static SocData> {
        SUPPORTED.iter().copied().find(|soc| soc.compatible == compatible)
    }
}

/// Every supported SoC
pub static SUPPORTED: [&SocData; 2] = [&MT3612, &MT3611];
