//! Moves contigs whose depth-weighted neighbourhood favours another bin.

use bit_vec::BitVec;
use tracing::{debug, info};

use crate::config::RefineConfig;
use crate::contig::{ContigId, ContigTable};
use crate::error::{RefineError, Result};
use crate::graph::AssemblyGraph;
use crate::partition::{BinId, BinPartition};
use crate::progress::pass_bar;
use crate::search::{BinTally, NeighborhoodSearch};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub contig: ContigId,
    pub from: BinId,
    pub to: BinId,
}

#[derive(Clone, Debug, Default)]
pub struct CorrectionOutcome {
    pub moves: Vec<Move>,
    pub passes: usize,
}

/// Runs correction passes until a pass schedules no move. A contig moves at
/// most once over the whole loop.
pub fn correct_inconsistent(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &mut BinPartition,
    config: &RefineConfig,
    search: &mut NeighborhoodSearch,
) -> Result<CorrectionOutcome> {
    partition.check_single_membership()?;
    let cap = partition.binned_count() + 2;
    let mut once_moved = BitVec::from_elem(partition.n_contigs(), false);
    let mut outcome = CorrectionOutcome::default();
    let mut evidence = Vec::new();

    info!("Refining labels of inconsistent contigs");
    loop {
        outcome.passes += 1;
        if outcome.passes > cap {
            return Err(RefineError::IterationLimit { stage: "label correction", cap });
        }

        let binned = partition.binned();
        let bar = pass_bar(binned.len(), config.show_progress, "correcting");
        let mut scheduled: Vec<Move> = Vec::new();
        for &contig in &binned {
            bar.inc(1);
            if graph.is_isolated(contig) || once_moved[contig] {
                continue;
            }
            let Some(bin) = partition.bin_of(contig) else {
                continue;
            };
            evidence.clear();
            search.search(graph, contigs, partition, contig, config.max_depth, &mut evidence);
            if evidence.is_empty() {
                continue;
            }
            let tally = BinTally::new(partition.n_bins(), &evidence);
            if let Some(to) = preferred_bin(&tally.weights, bin, config.threshold) {
                once_moved.set(contig, true);
                scheduled.push(Move { contig, from: bin, to });
            }
        }
        bar.finish_and_clear();

        debug!(pass = outcome.passes, moved = scheduled.len(), "correction pass done");
        if scheduled.is_empty() {
            break;
        }
        for m in scheduled {
            partition.move_to(m.contig, m.from, m.to)?;
            outcome.moves.push(m);
        }
    }

    info!(
        "Moved {} contigs in {} passes",
        outcome.moves.len(),
        outcome.passes
    );
    Ok(outcome)
}

/// The heaviest bin whose weight beats `threshold` times the current bin's
/// weight; the lowest index wins ties.
pub fn preferred_bin(weights: &[f64], current: BinId, threshold: f64) -> Option<BinId> {
    let floor = weights[current] * threshold;
    let mut best: Option<(BinId, f64)> = None;
    for (bin, &weight) in weights.iter().enumerate() {
        if bin == current || weight <= 0.0 || weight <= floor {
            continue;
        }
        if best.map_or(true, |(_, top)| weight > top) {
            best = Some((bin, weight));
        }
    }
    best.map(|(bin, _)| bin)
}
