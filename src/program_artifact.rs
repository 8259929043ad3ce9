// SPDX-License-Identifier: Apache-2.0
//! `ProgramArtifact`: the immutable bytecode-plus-metadata blob produced by
//! the external compiler and consumed (never produced) by the core (spec
//! §3, §6).
//!
//! The compiler itself — lexer, multi-pass assembler, optimizer — is
//! explicitly out of scope (spec §1); this module only defines the
//! contract the core reads.

use crate::coord::Coord;
use crate::fuzzy::LabelAnchor;
use crate::molecule::Molecule;

/// An initial placement: a molecule to seed at a coordinate at genesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Target coordinate.
    pub coord: Coord,
    /// Molecule to place there.
    pub molecule: Molecule,
}

/// A named set of label anchors, as produced by the compiler for one
/// symbolic label (spec §6: `name → [{coord, bitPattern, namespaceMask}]`).
#[derive(Clone, Debug)]
pub struct NamedLabel {
    /// The label's source-level name, retained only for the optional
    /// source map — the runtime itself addresses anchors positionally.
    pub name: String,
    /// The anchors registered under this name.
    pub anchors: Vec<LabelAnchor>,
}

/// Opaque source-map entry, forwarded to the change-set for external
/// debuggers without interpretation by the core.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceMapEntry {
    /// Coordinate the entry describes.
    pub coord: Coord,
    /// Opaque debugger-facing annotation (e.g. `"file.s:42"`).
    pub annotation: String,
}

/// An immutable compiled program, consumed at genesis to seed the world
/// and populate the label anchor table. Opaque to the runtime beyond the
/// three fields below (spec §3).
#[derive(Clone, Debug)]
pub struct ProgramArtifact {
    /// Ordered initial molecule placements.
    pub placements: Vec<Placement>,
    /// Label anchor table.
    pub labels: Vec<NamedLabel>,
    /// Optional opaque source map, forwarded to the change-set verbatim.
    pub source_map: Option<Vec<SourceMapEntry>>,
}

impl ProgramArtifact {
    /// Flattens the label table into the flat anchor list the fuzzy
    /// resolver consumes, discarding names (the resolver matches on bit
    /// pattern, not name).
    #[must_use]
    pub fn all_anchors(&self) -> Vec<LabelAnchor> {
        self.labels
            .iter()
            .flat_map(|label| label.anchors.iter().cloned())
            .collect()
    }
}
