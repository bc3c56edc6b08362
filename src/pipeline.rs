use std::time::Instant;

use tracing::info;

use crate::config::RefineConfig;
use crate::contig::{ContigId, ContigTable};
use crate::correct::correct_inconsistent;
use crate::error::{RefineError, Result};
use crate::graph::AssemblyGraph;
use crate::io::snapshot::Checkpoint;
use crate::multibin::assign_multi_bins;
use crate::partition::{BinId, BinLabels, BinPartition};
use crate::propagate::propagate_labels;
use crate::prune::prune_unsupported;
use crate::search::NeighborhoodSearch;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefineSummary {
    pub removed: usize,
    pub prune_passes: usize,
    pub moved: usize,
    pub correction_passes: usize,
    pub propagated: usize,
    pub discarded: usize,
    pub multi_binned: Vec<(ContigId, Vec<BinId>)>,
}

/// Owns the inputs of a refinement run and applies the stages in order:
/// pruning, correction, propagation, multi-bin assignment.
pub struct Refiner {
    graph: AssemblyGraph,
    contigs: ContigTable,
    partition: BinPartition,
    labels: BinLabels,
    config: RefineConfig,
    search: NeighborhoodSearch,
}

impl Refiner {
    pub fn new(
        graph: AssemblyGraph,
        contigs: ContigTable,
        partition: BinPartition,
        config: RefineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let n = contigs.len();
        if graph.num_vertices() != n || partition.n_contigs() != n {
            return Err(RefineError::invariant(format!(
                "graph has {} vertices and partition {} contigs, but the contig table has {n}",
                graph.num_vertices(),
                partition.n_contigs()
            )));
        }
        partition.check_single_membership()?;
        let labels = BinLabels::numbered(partition.n_bins());
        Ok(Self {
            graph,
            contigs,
            partition,
            labels,
            config,
            search: NeighborhoodSearch::new(n),
        })
    }

    /// Replaces the default `1..=n` bin names with the input labels.
    pub fn with_labels(mut self, labels: BinLabels) -> Result<Self> {
        if labels.len() != self.partition.n_bins() {
            return Err(RefineError::invariant(format!(
                "{} bin labels for {} bins",
                labels.len(),
                self.partition.n_bins()
            )));
        }
        self.labels = labels;
        Ok(self)
    }

    pub fn graph(&self) -> &AssemblyGraph {
        &self.graph
    }

    pub fn contigs(&self) -> &ContigTable {
        &self.contigs
    }

    pub fn partition(&self) -> &BinPartition {
        &self.partition
    }

    pub fn labels(&self) -> &BinLabels {
        &self.labels
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    pub fn into_partition(self) -> BinPartition {
        self.partition
    }

    pub fn log_state(&self) {
        let isolated = self.graph.isolated_mask().iter().filter(|&i| i).count();
        info!("Number of bins: {}", self.partition.n_bins());
        info!("Number of binned contigs: {}", self.partition.binned_count());
        info!(
            "Total number of unbinned contigs: {}",
            self.partition.n_contigs() - self.partition.binned_count()
        );
        info!("Number of isolated contigs: {}", isolated);
    }

    /// Runs every stage; `checkpoint` receives the intermediate snapshots.
    pub fn run(&mut self, checkpoint: &mut dyn Checkpoint) -> Result<RefineSummary> {
        let start = Instant::now();
        let saving = self.config.save_interval != 0;
        let mut summary = RefineSummary::default();
        self.log_state();

        let pruned = prune_unsupported(
            &self.graph,
            &self.contigs,
            &mut self.partition,
            &self.config,
            &mut self.search,
        )?;
        summary.removed = pruned.removed;
        summary.prune_passes = pruned.passes;
        if saving {
            checkpoint.partition("after_removal", &self.partition)?;
        }

        if !self.config.skip_correction {
            let corrected = correct_inconsistent(
                &self.graph,
                &self.contigs,
                &mut self.partition,
                &self.config,
                &mut self.search,
            )?;
            summary.moved = corrected.moves.len();
            summary.correction_passes = corrected.passes;
        }
        if saving {
            checkpoint.partition("propagation_0", &self.partition)?;
            checkpoint.partition("stage_2", &self.partition)?;
        }

        let propagated = propagate_labels(
            &self.graph,
            &self.contigs,
            &mut self.partition,
            &self.config,
            &mut self.search,
            checkpoint,
        )?;
        summary.propagated = propagated.bound;
        summary.discarded = propagated.discarded;

        summary.multi_binned =
            assign_multi_bins(&self.graph, &self.contigs, &mut self.partition, &self.config)?;
        for (contig, bins) in &summary.multi_binned {
            info!("{} belongs to bins {}", self.contigs.name(*contig), self.labels.join(bins, ", "));
        }

        info!("Elapsed time: {:.2} seconds", start.elapsed().as_secs_f64());
        Ok(summary)
    }

    /// Rebins contigs found around every binned contig to their reference bin.
    #[cfg(feature = "reference-labels")]
    pub fn propagate_truth(&mut self, truth: &[Option<BinId>], budget: usize) -> Result<usize> {
        let rebinned = crate::reference::propagate_truth(
            &self.graph,
            &self.contigs,
            &mut self.partition,
            truth,
            self.config.max_depth,
            budget,
            &mut self.search,
        )?;
        info!("Reference labels rebinned {} contigs", rebinned);
        Ok(rebinned)
    }

    #[cfg(feature = "reference-labels")]
    pub fn depth_support(
        &mut self,
        truth: &[Option<BinId>],
        basis: crate::reference::SupportBasis,
    ) -> Vec<crate::reference::DepthSupport> {
        crate::reference::depth_support(
            &self.graph,
            &self.contigs,
            &self.partition,
            truth,
            self.config.max_depth,
            basis,
            &mut self.search,
        )
    }
}
