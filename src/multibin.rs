//! Places contigs whose coverage is best explained by a mixture of bins into
//! every bin of that mixture.

use bit_vec::BitVec;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::RefineConfig;
use crate::contig::{ContigId, ContigTable};
use crate::error::Result;
use crate::graph::AssemblyGraph;
use crate::partition::{BinId, BinPartition};
use crate::progress::pass_bar;

/// Length-weighted coverage totals per bin over non-isolated contigs.
#[derive(Clone, Debug)]
pub struct BinCoverage {
    weighted: Vec<f64>,
    length: Vec<f64>,
}

impl BinCoverage {
    pub fn new(contigs: &ContigTable, partition: &BinPartition, non_isolated: &BitVec) -> Self {
        let n_bins = partition.n_bins();
        let mut weighted = vec![0.0; n_bins];
        let mut length = vec![0.0; n_bins];
        for bin in 0..n_bins {
            for contig in partition.members(bin).filter(|&c| non_isolated[c]) {
                let len = contigs.length(contig) as f64;
                weighted[bin] += contigs.coverage(contig) * len;
                length[bin] += len;
            }
        }
        Self { weighted, length }
    }

    /// Mean coverage of every bin with `contig` taken out of `own_bin`.
    pub fn means_without(&self, contigs: &ContigTable, contig: ContigId, own_bin: BinId) -> Vec<f64> {
        let len = contigs.length(contig) as f64;
        (0..self.weighted.len())
            .map(|bin| {
                let (mut weighted, mut length) = (self.weighted[bin], self.length[bin]);
                if bin == own_bin {
                    weighted -= contigs.coverage(contig) * len;
                    length -= len;
                }
                if length > 0.0 {
                    weighted / length
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Advances `idx` to the next `idx.len()`-combination of `0..n` in
/// lexicographic order.
fn next_combination(idx: &mut [usize], n: usize) -> bool {
    let k = idx.len();
    let Some(i) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
        return false;
    };
    idx[i] += 1;
    for j in i + 1..k {
        idx[j] = idx[j - 1] + 1;
    }
    true
}

/// Subset of `candidates` whose summed mean coverage is closest to
/// `coverage`. Subsets are tried by size, then lexicographically; the first
/// strict minimum wins.
pub fn closest_mixture(candidates: &[BinId], means: &[f64], coverage: f64) -> Vec<BinId> {
    let n = candidates.len();
    let mut best: Vec<BinId> = Vec::new();
    let mut best_diff = f64::INFINITY;
    for k in 1..=n {
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            let total: f64 = idx.iter().map(|&i| means[candidates[i]]).sum();
            let diff = (total - coverage).abs();
            if diff < best_diff {
                best_diff = diff;
                best = idx.iter().map(|&i| candidates[i]).collect();
            }
            if !next_combination(&mut idx, n) {
                break;
            }
        }
    }
    best
}

/// Decides the extra bins of one contig, if any.
fn evaluate(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &BinPartition,
    coverage: &BinCoverage,
    non_isolated: &BitVec,
    config: &RefineConfig,
    contig: ContigId,
) -> Option<Vec<BinId>> {
    if !non_isolated[contig] {
        return None;
    }
    let own_bin = partition.bin_of(contig)?;

    let mut present = vec![false; partition.n_bins()];
    for &neighbour in graph.neighbors(contig) {
        if let Some(bin) = partition.bin_of(neighbour) {
            present[bin] = true;
        }
    }
    let candidates: Vec<BinId> = (0..present.len()).filter(|&b| present[b]).collect();
    if candidates.len() < 2 {
        return None;
    }
    if candidates.len() > config.max_multi_bins {
        warn!(
            "{} borders {} bins; skipping mixture search above {} bins",
            contigs.name(contig),
            candidates.len(),
            config.max_multi_bins
        );
        return None;
    }

    let means = coverage.means_without(contigs, contig, own_bin);
    let mixture = closest_mixture(&candidates, &means, contigs.coverage(contig));
    if mixture.len() > 1 && contigs.length(contig) > config.multi_bin_min_length {
        Some(mixture)
    } else {
        None
    }
}

/// Evaluates every contig in parallel over the converged partition, then adds
/// the winning mixtures. Existing memberships are never removed.
pub fn assign_multi_bins(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &mut BinPartition,
    config: &RefineConfig,
) -> Result<Vec<(ContigId, Vec<BinId>)>> {
    partition.check_single_membership()?;
    info!("Determining multi-binned contigs");

    let non_isolated = graph.labelled_components(|c| partition.is_binned(c));
    let coverage = BinCoverage::new(contigs, partition, &non_isolated);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;
    let bar = pass_bar(partition.n_contigs(), config.show_progress, "multi-binning");

    let snapshot: &BinPartition = partition;
    let multi: Vec<(ContigId, Vec<BinId>)> = pool.install(|| {
        (0..snapshot.n_contigs())
            .into_par_iter()
            .filter_map(|contig| {
                bar.inc(1);
                evaluate(graph, contigs, snapshot, &coverage, &non_isolated, config, contig)
                    .map(|bins| (contig, bins))
            })
            .collect()
    });
    bar.finish_and_clear();

    if multi.is_empty() {
        info!("No multi-labelled contigs were found");
    } else {
        info!("Found {} multi-labelled contigs", multi.len());
    }
    for (contig, bins) in &multi {
        debug!(contig = *contig, bins = ?bins, "adding memberships");
        for &bin in bins {
            partition.add_membership(*contig, bin)?;
        }
    }
    Ok(multi)
}
