//! Broad-phase pairing of surfaces across two bounding volumes.
//!
//! Sweep-and-Prune (Sort-and-Sweep) over the surfaces' world AABBs:
//! 1. Project each AABB onto the axis with the largest spread of centers
//! 2. Sort intervals by their minimum endpoint
//! 3. Sweep to find overlapping intervals, then confirm on all three axes
//!
//! Only pairs that straddle the two volumes are reported; surfaces of the
//! same volume never collide with each other.

use cf_spatial::{Aabb, Axis};
use nalgebra::Vector3;

/// Which volume an interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    side: Side,
    index: usize,
    min: f64,
    max: f64,
}

/// Sweep-and-prune pair finder.
///
/// Keeps its interval buffer between calls so repeated ticks reuse the
/// allocation.
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    intervals: Vec<Interval>,
    sweep_axis: Option<Axis>,
    margin: f64,
}

impl SweepAndPrune {
    /// Create a new sweep-and-prune broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every AABB by `margin` to report near misses.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Axis used by the most recent sweep.
    #[must_use]
    pub fn sweep_axis(&self) -> Option<Axis> {
        self.sweep_axis
    }

    /// Pick the axis with the largest spread of AABB centers.
    fn choose_sweep_axis<'a>(boxes: impl Iterator<Item = &'a Aabb>) -> Axis {
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for aabb in boxes {
            let c = aabb.center().coords;
            min = min.inf(&c);
            max = max.sup(&c);
        }
        let spread = max - min;
        if !spread.iter().all(|s| s.is_finite()) {
            return Axis::X;
        }
        if spread.x >= spread.y && spread.x >= spread.z {
            Axis::X
        } else if spread.y >= spread.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Find `(index_in_a, index_in_b)` pairs whose AABBs overlap.
    ///
    /// Pairs come out sorted by `(index_in_a, index_in_b)` so results do not
    /// depend on the sweep order.
    pub fn find_pairs(&mut self, a: &[Aabb], b: &[Aabb]) -> Vec<(usize, usize)> {
        let axis = Self::choose_sweep_axis(a.iter().chain(b.iter()));
        self.sweep_axis = Some(axis);

        let expand = |aabb: &Aabb| {
            if self.margin > 0.0 {
                aabb.expanded(self.margin)
            } else {
                *aabb
            }
        };

        self.intervals.clear();
        let tagged = a
            .iter()
            .enumerate()
            .map(|(i, aabb)| (Side::A, i, aabb))
            .chain(b.iter().enumerate().map(|(i, aabb)| (Side::B, i, aabb)));
        for (side, index, aabb) in tagged {
            let aabb = expand(aabb);
            self.intervals.push(Interval {
                side,
                index,
                min: aabb.min_on_axis(axis),
                max: aabb.max_on_axis(axis),
            });
        }

        self.intervals.sort_by(|x, y| x.min.total_cmp(&y.min));

        let mut pairs = Vec::new();
        for (i, first) in self.intervals.iter().enumerate() {
            for second in &self.intervals[i + 1..] {
                if second.min > first.max {
                    break;
                }
                if first.side == second.side {
                    continue;
                }
                let (ia, ib) = match first.side {
                    Side::A => (first.index, second.index),
                    Side::B => (second.index, first.index),
                };
                if expand(&a[ia]).intersects(&expand(&b[ib])) {
                    pairs.push((ia, ib));
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }
}

/// All-pairs reference used to cross-check the sweep.
#[must_use]
pub fn brute_force_pairs(a: &[Aabb], b: &[Aabb]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (ia, box_a) in a.iter().enumerate() {
        for (ib, box_b) in b.iter().enumerate() {
            if box_a.intersects(box_b) {
                pairs.push((ia, ib));
            }
        }
    }
    pairs
}
