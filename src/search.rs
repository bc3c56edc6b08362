//! Bounded breadth-first search for labelled contigs around a source contig.

use std::collections::VecDeque;

use crate::contig::{ContigId, ContigTable};
use crate::error::Result;
use crate::graph::AssemblyGraph;
use crate::partition::{BinId, BinPartition};

/// A labelled contig found by a bounded search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evidence {
    /// Contig the search started from.
    pub origin: ContigId,
    /// Labelled contig that was reached.
    pub labelled: ContigId,
    /// Bin of `labelled` at the time of the search.
    pub bin: BinId,
    /// Shortest-path distance from `origin`, at least 1.
    pub depth: usize,
    pub cov_diff: f64,
}

/// Label state seen by the search. Labelled contigs stop the expansion.
pub trait LabelView {
    fn label(&self, contig: ContigId) -> Option<BinId>;

    /// Called once per newly discovered neighbour of an expanded contig,
    /// before its depth is checked. `budget` is the remaining budget of the
    /// current search.
    fn discovered(&mut self, _contig: ContigId, _budget: usize) -> Result<()> {
        Ok(())
    }
}

impl LabelView for &BinPartition {
    fn label(&self, contig: ContigId) -> Option<BinId> {
        self.bin_of(contig)
    }
}

/// Reusable search buffers. Visited marks are generation stamps, so a search
/// never clears or reallocates per call.
#[derive(Debug)]
pub struct NeighborhoodSearch {
    stamp: Vec<u32>,
    depth: Vec<usize>,
    generation: u32,
    queue: VecDeque<ContigId>,
}

impl NeighborhoodSearch {
    pub fn new(n_contigs: usize) -> Self {
        Self {
            stamp: vec![0; n_contigs],
            depth: vec![0; n_contigs],
            generation: 0,
            queue: VecDeque::new(),
        }
    }

    /// Appends to `out` every labelled contig reachable from `source` within
    /// `max_depth` edges without passing through another labelled contig.
    pub fn search(
        &mut self,
        graph: &AssemblyGraph,
        contigs: &ContigTable,
        partition: &BinPartition,
        source: ContigId,
        max_depth: usize,
        out: &mut Vec<Evidence>,
    ) {
        let mut view = partition;
        let explored = self.explore(graph, contigs, &mut view, source, max_depth, 0, out);
        debug_assert!(explored.is_ok(), "read-only partition view failed: {explored:?}");
    }

    pub fn collect(
        &mut self,
        graph: &AssemblyGraph,
        contigs: &ContigTable,
        partition: &BinPartition,
        source: ContigId,
        max_depth: usize,
    ) -> Vec<Evidence> {
        let mut out = Vec::new();
        self.search(graph, contigs, partition, source, max_depth, &mut out);
        out
    }

    /// Search over an arbitrary label view. Each expanded unlabelled contig
    /// spends one unit of `budget`.
    #[allow(clippy::too_many_arguments)]
    pub fn explore<V: LabelView>(
        &mut self,
        graph: &AssemblyGraph,
        contigs: &ContigTable,
        view: &mut V,
        source: ContigId,
        max_depth: usize,
        mut budget: usize,
        out: &mut Vec<Evidence>,
    ) -> Result<()> {
        self.next_generation();
        let generation = self.generation;
        self.queue.clear();
        self.stamp[source] = generation;
        self.depth[source] = 0;
        self.queue.push_back(source);

        while let Some(active) = self.queue.pop_front() {
            if active != source {
                if let Some(bin) = view.label(active) {
                    out.push(Evidence {
                        origin: source,
                        labelled: active,
                        bin,
                        depth: self.depth[active],
                        cov_diff: contigs.coverage_diff(source, active),
                    });
                    continue;
                }
            }

            let next_depth = self.depth[active] + 1;
            for &neighbour in graph.neighbors(active) {
                if self.stamp[neighbour] == generation {
                    continue;
                }
                view.discovered(neighbour, budget)?;
                if next_depth > max_depth {
                    continue;
                }
                self.stamp[neighbour] = generation;
                self.depth[neighbour] = next_depth;
                self.queue.push_back(neighbour);
            }
            budget = budget.saturating_sub(1);
        }
        Ok(())
    }

    fn next_generation(&mut self) {
        if self.generation == u32::MAX {
            self.stamp.iter_mut().for_each(|s| *s = 0);
            self.generation = 0;
        }
        self.generation += 1;
    }
}

/// Per-bin vote counts and depth-weighted scores over a set of evidence.
#[derive(Clone, Debug, PartialEq)]
pub struct BinTally {
    pub votes: Vec<usize>,
    /// Each record adds `1 / 2^depth` to its bin.
    pub weights: Vec<f64>,
}

impl BinTally {
    pub fn new(n_bins: usize, evidence: &[Evidence]) -> Self {
        let mut votes = vec![0; n_bins];
        let mut weights = vec![0.0; n_bins];
        for record in evidence {
            votes[record.bin] += 1;
            weights[record.bin] += 0.5f64.powi(record.depth as i32);
        }
        Self { votes, weights }
    }

    /// Number of bins without a single vote.
    pub fn empty_bins(&self) -> usize {
        self.votes.iter().filter(|&&v| v == 0).count()
    }

    /// Bin with the most votes; the lowest index wins ties.
    pub fn top_bin(&self) -> Option<BinId> {
        let mut best: Option<(BinId, usize)> = None;
        for (bin, &votes) in self.votes.iter().enumerate() {
            if best.map_or(true, |(_, top)| votes > top) {
                best = Some((bin, votes));
            }
        }
        best.map(|(bin, _)| bin)
    }
}
