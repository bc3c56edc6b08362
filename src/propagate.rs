//! Best-first label propagation onto unbinned contigs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bit_set::BitSet;
use bit_vec::BitVec;
use tracing::{debug, info};

use crate::config::RefineConfig;
use crate::contig::{ContigId, ContigTable};
use crate::error::Result;
use crate::graph::AssemblyGraph;
use crate::io::snapshot::Checkpoint;
use crate::partition::BinPartition;
use crate::progress::pass_bar;
use crate::search::{Evidence, NeighborhoodSearch};

/// Best-first order: shallower first, then smaller coverage difference.
/// Remaining ties fall back to ids so the order is total.
pub fn priority(a: &Evidence, b: &Evidence) -> Ordering {
    a.depth
        .cmp(&b.depth)
        .then_with(|| a.cov_diff.total_cmp(&b.cov_diff))
        .then_with(|| a.origin.cmp(&b.origin))
        .then_with(|| a.labelled.cmp(&b.labelled))
        .then_with(|| a.bin.cmp(&b.bin))
}

#[derive(Clone, Copy, Debug)]
struct Candidate(Evidence);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        priority(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        priority(&other.0, &self.0)
    }
}

/// Min-priority queue of evidence records.
#[derive(Debug, Default)]
pub struct PropagationQueue {
    heap: BinaryHeap<Candidate>,
}

impl PropagationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Evidence) {
        self.heap.push(Candidate(record));
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Evidence>) {
        self.heap.extend(records.into_iter().map(Candidate));
    }

    pub fn pop(&mut self) -> Option<Evidence> {
        self.heap.pop().map(|c| c.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every queued record whose origin is in `origins`.
    pub fn purge(&mut self, origins: &BitSet) {
        self.heap.retain(|c| !origins.contains(c.0.origin));
    }

    /// Queue contents, best first.
    pub fn snapshot(&self) -> Vec<Evidence> {
        let mut records: Vec<Evidence> = self.heap.iter().map(|c| c.0).collect();
        records.sort_by(priority);
        records
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagationOutcome {
    pub bound: usize,
    /// Records popped and dropped by the coverage/length floors.
    pub discarded: usize,
    pub iterations: usize,
    pub non_isolated_unbinned: usize,
}

/// Contigs that are unbinned but share a component with a binned contig.
pub fn non_isolated_unbinned(graph: &AssemblyGraph, partition: &BinPartition) -> BitVec {
    let mut marked = graph.labelled_components(|c| partition.is_binned(c));
    for contig in 0..partition.n_contigs() {
        if partition.is_binned(contig) {
            marked.set(contig, false);
        }
    }
    marked
}

fn admissible(contigs: &ContigTable, contig: ContigId, config: &RefineConfig) -> bool {
    contigs.coverage(contig) >= config.min_coverage && contigs.length(contig) >= config.min_length
}

/// Binds unbinned contigs in best-first order, growing the frontier from
/// every newly bound contig.
pub fn propagate_labels(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &mut BinPartition,
    config: &RefineConfig,
    search: &mut NeighborhoodSearch,
    checkpoint: &mut dyn Checkpoint,
) -> Result<PropagationOutcome> {
    partition.check_single_membership()?;
    let mut pending = non_isolated_unbinned(graph, partition);
    let mut outcome = PropagationOutcome {
        non_isolated_unbinned: pending.iter().filter(|&p| p).count(),
        ..Default::default()
    };
    info!("Number of non-isolated unbinned contigs: {}", outcome.non_isolated_unbinned);
    info!("Propagating labels to unlabelled contigs");

    let mut frontier = BitSet::with_capacity(partition.n_contigs());
    for contig in partition.binned() {
        for &neighbour in graph.neighbors(contig) {
            if !partition.is_binned(neighbour) {
                frontier.insert(neighbour);
            }
        }
    }

    let mut queue = PropagationQueue::new();
    let mut evidence = Vec::new();
    for contig in frontier.iter() {
        search.search(graph, contigs, partition, contig, config.max_depth, &mut evidence);
    }
    queue.extend(evidence.drain(..));

    let bar = pass_bar(outcome.non_isolated_unbinned, config.show_progress, "propagating");
    let mut iteration = 1;
    while !queue.is_empty() {
        let saving = config.save_interval != 0 && iteration % config.save_interval == 0;
        if saving && config.save_queue {
            checkpoint.queue(iteration, &queue.snapshot())?;
        }

        let mut best = None;
        while let Some(record) = queue.pop() {
            if admissible(contigs, record.origin, config) {
                best = Some(record);
                break;
            }
            outcome.discarded += 1;
        }
        let Some(best) = best else {
            break;
        };

        if pending[best.origin] {
            partition.assign(best.origin, best.bin)?;
            pending.set(best.origin, false);
            outcome.bound += 1;
            bar.inc(1);

            let mut fresh = BitSet::new();
            for &neighbour in graph.neighbors(best.origin) {
                if !partition.is_binned(neighbour) {
                    fresh.insert(neighbour);
                }
            }
            queue.purge(&fresh);
            for neighbour in fresh.iter() {
                search.search(graph, contigs, partition, neighbour, config.max_depth, &mut evidence);
            }
            queue.extend(evidence.drain(..));
            debug!(
                contig = best.origin,
                bin = best.bin,
                depth = best.depth,
                queued = queue.len(),
                "bound contig"
            );
        }

        if saving {
            checkpoint.partition(&format!("propagation_{iteration}"), partition)?;
        }
        iteration += 1;
    }
    bar.finish_and_clear();

    outcome.iterations = iteration - 1;
    info!(
        "Propagated labels to {} contigs ({} candidates below the coverage/length floors)",
        outcome.bound, outcome.discarded
    );
    Ok(outcome)
}
