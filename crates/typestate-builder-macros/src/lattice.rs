//! The powerset of required fields, addressed one bit per field in declared
//! order.
//!
//! The enumeration is deliberately exponential in the number of required
//! fields: that count is a small per-type constant fixed at expansion time,
//! and exhaustive enumeration is what buys exact static tracking.

/// One combination of which required fields have been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatticePoint(u64);

impl LatticePoint {
    /// Whether the required field at `index` (declared order) is set.
    pub fn is_set(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

/// All set-states for a record with `rank` required fields.
#[derive(Debug, Clone, Copy)]
pub struct StateLattice {
    rank: usize,
}

impl StateLattice {
    /// Upper bound on tracked required fields; expansion rejects schemas
    /// above it before a lattice is built. Expansion emits `2^rank` impl
    /// blocks, so the mask width is never the binding limit.
    pub const MAX_RANK: usize = 32;

    pub fn new(rank: usize) -> Self {
        debug_assert!(rank <= Self::MAX_RANK, "rank exceeds MAX_RANK");
        Self { rank }
    }

    pub fn rank(self) -> usize {
        self.rank
    }

    /// Number of points: `2^rank`.
    pub fn point_count(self) -> usize {
        1 << self.rank
    }

    /// Every point in mask order; the initial point comes first, the
    /// terminal point last.
    pub fn points(self) -> impl Iterator<Item = LatticePoint> {
        (0..self.point_count() as u64).map(LatticePoint)
    }

    /// The all-unset point a fresh builder starts at.
    pub fn initial(self) -> LatticePoint {
        LatticePoint(0)
    }

    /// The all-set point `finalize` lives on. Coincides with [`initial`]
    /// when the rank is zero.
    ///
    /// [`initial`]: Self::initial
    pub fn terminal(self) -> LatticePoint {
        LatticePoint(self.point_count() as u64 - 1)
    }

    /// The point reached by setting the field at `index`. Setting an
    /// already-set field is a self-loop: the stored value is overwritten,
    /// the point is unchanged.
    pub fn successor(self, point: LatticePoint, index: usize) -> LatticePoint {
        debug_assert!(index < self.rank, "field index out of range");
        LatticePoint(point.0 | (1 << index))
    }
}
