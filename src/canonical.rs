//! Canonical state keys.
//!
//! In the default mode pieces of the same shape are interchangeable: the key
//! records, per shape signature, the sorted list of positions (minimum
//! corners, see [`Piece::position`](crate::pieces::Piece::position)) that
//! shape occupies, and nothing about which piece sits where. Without this, a puzzle
//! with `k` identical pieces would enumerate up to `k!` copies of every
//! arrangement. Mirror and rotation symmetry is never folded in.
//!
//! The identity-preserving mode keeps piece ids in the key.

use std::fmt;
use std::sync::Arc;

use crate::geometry::zyx_cmp;
use crate::grid::Placement;
use crate::pieces::{Coord, PieceId, ShapeSignature};

/// Anchors occupied by every piece of one shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeGroup {
    pub signature: Arc<ShapeSignature>,
    /// Sorted by z, then y, then x.
    pub anchors: Vec<Coord>,
}

/// Key identifying a placement up to the chosen notion of equivalence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalKey {
    /// Shape groups ordered by signature.
    Interchangeable(Vec<ShapeGroup>),
    /// `(id, signature, position)` ordered by id.
    IdentityPreserving(Vec<(PieceId, Arc<ShapeSignature>, Coord)>),
}

/// Computes the key of a placement.
pub fn canonical_key(placement: &Placement, identity_preserving: bool) -> CanonicalKey {
    if identity_preserving {
        // pieces are stored sorted by id
        return CanonicalKey::IdentityPreserving(
            placement
                .pieces()
                .iter()
                .map(|piece| (piece.id(), Arc::clone(piece.signature()), piece.position()))
                .collect(),
        );
    }

    let mut entries: Vec<(&Arc<ShapeSignature>, Coord)> = placement
        .pieces()
        .iter()
        .map(|piece| (piece.signature(), piece.position()))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0).then_with(|| zyx_cmp(&a.1, &b.1)));

    let mut groups: Vec<ShapeGroup> = Vec::new();
    for (signature, anchor) in entries {
        match groups.last_mut() {
            Some(group) if same_signature(&group.signature, signature) => {
                group.anchors.push(anchor);
            }
            _ => groups.push(ShapeGroup {
                signature: Arc::clone(signature),
                anchors: vec![anchor],
            }),
        }
    }

    CanonicalKey::Interchangeable(groups)
}

#[inline]
fn same_signature(a: &Arc<ShapeSignature>, b: &Arc<ShapeSignature>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

fn write_anchor(f: &mut fmt::Formatter<'_>, (x, y, z): Coord) -> fmt::Result {
    write!(f, "{x},{y},{z}")
}

/// Renders the key as a flat string, e.g. `box1x1x1@0,0,0|1,0,0`.
///
/// Groups are separated by `;`, anchors by `|`.
impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalKey::Interchangeable(groups) => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{}@", group.signature)?;
                    for (j, &anchor) in group.anchors.iter().enumerate() {
                        if j > 0 {
                            f.write_str("|")?;
                        }
                        write_anchor(f, anchor)?;
                    }
                }
                Ok(())
            }
            CanonicalKey::IdentityPreserving(entries) => {
                for (i, (id, signature, anchor)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "#{id}:{signature}@")?;
                    write_anchor(f, *anchor)?;
                }
                Ok(())
            }
        }
    }
}
