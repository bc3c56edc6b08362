//! Removes labels that have no support in their bounded neighbourhood.

use tracing::{debug, info};

use crate::config::RefineConfig;
use crate::contig::{ContigId, ContigTable};
use crate::error::{RefineError, Result};
use crate::graph::AssemblyGraph;
use crate::partition::{BinId, BinPartition};
use crate::progress::pass_bar;
use crate::search::{BinTally, NeighborhoodSearch};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub removed: usize,
    pub passes: usize,
}

/// Repeats pruning passes until one removes nothing.
pub fn prune_unsupported(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &mut BinPartition,
    config: &RefineConfig,
    search: &mut NeighborhoodSearch,
) -> Result<PruneOutcome> {
    partition.check_single_membership()?;
    let cap = partition.binned_count() + 2;
    let mut outcome = PruneOutcome::default();
    let mut evidence = Vec::new();

    info!("Removing labels of unsupported contigs");
    loop {
        outcome.passes += 1;
        if outcome.passes > cap {
            return Err(RefineError::IterationLimit { stage: "label pruning", cap });
        }

        let binned = partition.binned();
        let bar = pass_bar(binned.len(), config.show_progress, "pruning");
        let mut removals: Vec<ContigId> = Vec::new();
        for &contig in &binned {
            bar.inc(1);
            if graph.is_isolated(contig) {
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
            if is_unsupported(&tally, bin, contigs.length(contig), config.small_contig_length) {
                removals.push(contig);
            }
        }
        bar.finish_and_clear();

        debug!(pass = outcome.passes, removed = removals.len(), "pruning pass done");
        if removals.is_empty() {
            break;
        }
        for contig in removals {
            partition.unassign(contig)?;
            outcome.removed += 1;
        }
    }

    info!(
        "Removed {} labels in {} passes; {} contigs remain binned",
        outcome.removed,
        outcome.passes,
        partition.binned_count()
    );
    Ok(outcome)
}

/// A label is unsupported when its bin gets no vote, or when every vote
/// falls into one other bin that outvotes a short contig.
fn is_unsupported(tally: &BinTally, bin: BinId, length: u64, small_contig_length: u64) -> bool {
    if tally.votes[bin] == 0 {
        return true;
    }
    if tally.empty_bins() == tally.votes.len() - 1 {
        if let Some(top) = tally.top_bin() {
            return top != bin && tally.votes[top] > 1 && length < small_contig_length;
        }
    }
    false
}
