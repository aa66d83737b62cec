//! # Edge Queue
//!
//! Pending edges binned by plane and by `x`. Within one bin the edges are
//! kept sorted by `ybot` and never overlap; adding an edge that overlaps
//! existing ones of the same left/right types splits and merges them so
//! that each unit of height ends up with the largest `newx` requested.
//!
//! Subcell edges live in their own bin set and are keyed by use: adding a
//! second edge for the same use only raises its `newx`.
//!
//! Ties between bins at the same `x` go to subcells first, then to the
//! lowest plane. Within a bin the lowest edge comes out first.

use std::collections::BTreeMap;

use super::edge::Edge;

pub struct EdgeQueue {
    planes: Vec<BTreeMap<i32, Vec<Edge>>>,
    cells: BTreeMap<i32, Vec<Edge>>,
    /// Largest distance any single edge may be asked to move.
    distance: i32,
    len: usize,
    /// Calls to `add`.
    pub added: usize,
    /// Edges whose target had to be clamped to `distance`.
    pub clamped: usize,
}

impl EdgeQueue {
    pub fn new(nplanes: usize, distance: i32) -> Self {
        Self {
            planes: vec![BTreeMap::new(); nplanes],
            cells: BTreeMap::new(),
            distance,
            len: 0,
            added: 0,
            clamped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Queue `edge`, merging it with what is already there.
    pub fn add(&mut self, edge: &Edge) {
        let mut eadd = *edge;
        debug_assert!(eadd.ybot < eadd.ytop, "degenerate edge {eadd}");
        if eadd.newx > eadd.x + self.distance {
            eadd.newx = eadd.x + self.distance;
            self.clamped += 1;
        }
        self.added += 1;
        tracing::trace!(edge = %eadd, "queue add");

        if eadd.cell.is_some() {
            let bin = self.cells.entry(eadd.x).or_default();
            match bin.iter_mut().find(|ep| ep.cell == eadd.cell) {
                Some(ep) => ep.newx = ep.newx.max(eadd.newx),
                None => {
                    bin.insert(0, eadd);
                    self.len += 1;
                }
            }
            return;
        }

        if eadd.plane >= self.planes.len() {
            self.planes.resize_with(eadd.plane + 1, BTreeMap::new);
        }
        let bin = self.planes[eadd.plane].entry(eadd.x).or_default();
        let before = bin.len();
        merge_into(bin, &eadd);
        self.len = self.len + bin.len() - before;
    }

    /// Remove the pending edge with the smallest `x`.
    pub fn pop_leftmost(&mut self) -> Option<Edge> {
        let mut best: Option<(i32, Option<usize>)> = self.cells.keys().next().map(|x| (*x, None));
        for (p, bins) in self.planes.iter().enumerate() {
            if let Some(x) = bins.keys().next() {
                if best.is_none_or(|(bx, _)| *x < bx) {
                    best = Some((*x, Some(p)));
                }
            }
        }
        let (x, plane) = best?;
        self.take(x, plane)
    }

    /// Remove the pending edge with the largest `x`.
    pub fn pop_rightmost(&mut self) -> Option<Edge> {
        let mut best: Option<(i32, Option<usize>)> = self.cells.keys().next_back().map(|x| (*x, None));
        for (p, bins) in self.planes.iter().enumerate() {
            if let Some(x) = bins.keys().next_back() {
                if best.is_none_or(|(bx, _)| *x > bx) {
                    best = Some((*x, Some(p)));
                }
            }
        }
        let (x, plane) = best?;
        self.take(x, plane)
    }

    fn take(&mut self, x: i32, plane: Option<usize>) -> Option<Edge> {
        let bins = match plane {
            Some(p) => &mut self.planes[p],
            None => &mut self.cells,
        };
        let bin = bins.get_mut(&x)?;
        let edge = bin.remove(0);
        if bin.is_empty() {
            bins.remove(&x);
        }
        self.len -= 1;
        debug_assert!(edge.newx >= edge.x, "edge moves left: {edge}");
        Some(edge)
    }
}

/// Can `upper` be absorbed into `lower`, which ends exactly where it starts?
fn joinable(lower: &Edge, upper: &Edge, upper_ybot: i32) -> bool {
    lower.same_types(upper) && lower.newx == upper.newx && lower.ytop == upper_ybot
}

/// Merge `eadd` into a bin sorted by `ybot`.
fn merge_into(bin: &mut Vec<Edge>, eadd: &Edge) {
    let mut i = 0;
    while i < bin.len() && bin[i].ytop < eadd.ybot {
        i += 1;
    }

    let mut ybot = eadd.ybot;
    let ytop = eadd.ytop;
    while i < bin.len() && bin[i].ybot < ytop {
        if ybot >= ytop {
            merge_final(bin, i);
            return;
        }
        if !bin[i].same_types(eadd) {
            i += 1;
            continue;
        }

        if bin[i].newx == eadd.newx {
            bin[i].ybot = bin[i].ybot.min(ybot);
        } else {
            let mut touching = false;
            if ybot < bin[i].ybot {
                // Part of eadd below ep
                if i > 0 && joinable(&bin[i - 1], eadd, ybot) {
                    bin[i - 1].ytop = bin[i].ybot;
                } else {
                    let mut enew = bin[i];
                    enew.ybot = ybot;
                    enew.ytop = bin[i].ybot;
                    enew.newx = eadd.newx;
                    bin.insert(i, enew);
                    i += 1;
                }
            } else if bin[i].ybot < ybot {
                if bin[i].ytop == ybot {
                    touching = true;
                } else {
                    // Part of ep below eadd
                    let mut enew = bin[i];
                    enew.ytop = ybot;
                    bin[i].ybot = ybot;
                    bin.insert(i, enew);
                    i += 1;
                }
            }

            if !touching {
                if bin[i].ytop > ytop {
                    // Part of ep above eadd
                    let mut enew = bin[i];
                    enew.ybot = ytop;
                    bin[i].ytop = ytop;
                    bin.insert(i + 1, enew);
                }
                bin[i].newx = bin[i].newx.max(eadd.newx);
            }
        }

        // Merge down
        ybot = bin[i].ytop;
        if i > 0 && joinable(&bin[i - 1], &bin[i], bin[i].ybot) {
            bin[i - 1].ytop = bin[i].ytop;
            bin.remove(i);
            i -= 1;
        }
        i += 1;
    }

    if ybot < ytop {
        if i > 0 && joinable(&bin[i - 1], eadd, ybot) {
            bin[i - 1].ytop = ytop;
        } else {
            let mut enew = *eadd;
            enew.ybot = ybot;
            bin.insert(i, enew);
            i += 1;
        }
    }
    merge_final(bin, i);
}

fn merge_final(bin: &mut Vec<Edge>, i: usize) {
    if i > 0 && i < bin.len() && joinable(&bin[i - 1], &bin[i], bin[i].ybot) {
        bin[i - 1].ytop = bin[i].ytop;
        bin.remove(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, TileType, UseId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const M: TileType = TileType(1);
    const P: TileType = TileType(2);

    fn edge(x: i32, newx: i32, ybot: i32, ytop: i32) -> Edge {
        Edge::paint(0, x, newx, ybot, ytop, M, TileType::SPACE)
    }

    fn drain(q: &mut EdgeQueue) -> Vec<(i32, i32, i32, i32)> {
        let mut out = Vec::new();
        while let Some(e) = q.pop_leftmost() {
            out.push((e.x, e.newx, e.ybot, e.ytop));
        }
        out
    }

    #[test]
    fn test_pops_smallest_x_first() {
        let mut q = EdgeQueue::new(2, 100);
        q.add(&edge(10, 15, 0, 5));
        q.add(&Edge::paint(1, 3, 8, 0, 5, P, TileType::SPACE));
        q.add(&edge(7, 9, 0, 5));
        let xs: Vec<i32> = std::iter::from_fn(|| q.pop_leftmost()).map(|e| e.x).collect();
        assert_eq!(xs, vec![3, 7, 10]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_newx_edges_merge() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(10, 15, 0, 5));
        q.add(&edge(10, 15, 5, 9));
        q.add(&edge(10, 15, 3, 7));
        assert_eq!(q.len(), 1);
        assert_eq!(drain(&mut q), vec![(10, 15, 0, 9)]);
    }

    #[test]
    fn test_overlap_takes_max_newx() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(10, 12, 0, 10));
        q.add(&edge(10, 16, 4, 6));
        assert_eq!(drain(&mut q), vec![(10, 12, 0, 4), (10, 16, 4, 6), (10, 12, 6, 10)]);
    }

    #[test]
    fn test_lower_part_of_add_becomes_new_edge() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(10, 12, 4, 10));
        q.add(&edge(10, 16, 0, 6));
        assert_eq!(drain(&mut q), vec![(10, 16, 0, 6), (10, 12, 6, 10)]);
    }

    #[test]
    fn test_smaller_newx_does_not_lower_existing() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(10, 20, 0, 10));
        q.add(&edge(10, 12, 0, 10));
        assert_eq!(drain(&mut q), vec![(10, 20, 0, 10)]);
    }

    #[test]
    fn test_different_types_are_kept_apart() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(10, 12, 0, 5));
        q.add(&Edge::paint(0, 10, 12, 5, 10, P, TileType::SPACE));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_distance_clamps_newx() {
        let mut q = EdgeQueue::new(1, 4);
        q.add(&edge(10, 30, 0, 5));
        assert_eq!(q.clamped, 1);
        assert_eq!(q.pop_leftmost().map(|e| e.newx), Some(14));
    }

    #[test]
    fn test_cell_edges_dedup_by_use_and_win_ties() {
        let mut q = EdgeQueue::new(1, 100);
        let bbox = Rect::new(0, 0, 10, 10);
        q.add(&edge(10, 12, 0, 5));
        q.add(&Edge::cell(UseId(1), &bbox, 13));
        q.add(&Edge::cell(UseId(1), &bbox, 15));
        assert_eq!(q.len(), 2);
        let first = q.pop_leftmost().unwrap();
        assert_eq!(first.cell, Some(UseId(1)));
        assert_eq!(first.newx, 15);
        assert_eq!(q.pop_leftmost().map(|e| e.cell), Some(None));
    }

    #[test]
    fn test_pop_rightmost() {
        let mut q = EdgeQueue::new(1, 100);
        q.add(&edge(3, 3, 0, 5));
        q.add(&edge(9, 9, 0, 5));
        assert_eq!(q.pop_rightmost().map(|e| e.x), Some(9));
        assert_eq!(q.pop_rightmost().map(|e| e.x), Some(3));
        assert_eq!(q.pop_rightmost(), None);
    }

    proptest! {
        #[test]
        fn prop_bins_stay_disjoint_and_keep_max(
            adds in proptest::collection::vec((0i32..20, 1i32..8, 0i32..10), 1..12)
        ) {
            let mut q = EdgeQueue::new(1, 100);
            for (ybot, h, d) in &adds {
                q.add(&edge(10, 10 + d, *ybot, ybot + h));
            }
            let out = drain(&mut q);
            for w in out.windows(2) {
                prop_assert!(w[0].3 <= w[1].2, "overlap {:?} {:?}", w[0], w[1]);
            }
            // every requested unit of height is covered with at least its newx
            for (ybot, h, d) in &adds {
                for y in *ybot..ybot + h {
                    let got = out.iter().find(|e| e.2 <= y && y < e.3);
                    prop_assert!(got.is_some_and(|e| e.1 >= 10 + d));
                }
            }
        }
    }
}
