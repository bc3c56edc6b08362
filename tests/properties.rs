use std::collections::VecDeque;
use std::io;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use graphrefine::correct::correct_inconsistent;
use graphrefine::io::snapshot::Checkpoint;
use graphrefine::multibin::assign_multi_bins;
use graphrefine::propagate::{non_isolated_unbinned, propagate_labels};
use graphrefine::prune::prune_unsupported;
use graphrefine::{
    AssemblyGraph, BinPartition, Contig, ContigTable, Evidence, NeighborhoodSearch, RefineConfig,
};

const SEEDS: u64 = 40;

struct Instance {
    graph: AssemblyGraph,
    contigs: ContigTable,
    partition: BinPartition,
}

fn random_instance(seed: u64) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = rng.gen_range(8..60);
    let n_bins = rng.gen_range(1..5);
    let n_edges = rng.gen_range(0..n * 2);
    let edges: Vec<(usize, usize)> = (0..n_edges)
        .map(|_| (rng.gen_range(0..n), rng.gen_range(0..n)))
        .collect();
    let graph = AssemblyGraph::from_edges(n, &edges).unwrap();

    let mut contigs = ContigTable::with_capacity(n);
    for i in 0..n {
        let contig = Contig {
            number: i as u64,
            length: rng.gen_range(200..30_000),
            coverage: rng.gen_range(0.0..100.0),
        };
        contigs.push(format!("NODE_{i}"), contig).unwrap();
    }

    let mut assignments = Vec::new();
    for contig in 0..n {
        if rng.gen_bool(0.4) {
            assignments.push((contig, rng.gen_range(0..n_bins)));
        }
    }
    let partition = BinPartition::from_assignments(n, n_bins, assignments).unwrap();
    Instance { graph, contigs, partition }
}

fn config() -> RefineConfig {
    RefineConfig { show_progress: false, threads: 2, ..Default::default() }
}

/// Unbounded shortest distances from `source`, never expanding through a
/// labelled contig other than the source.
fn blocked_distances(graph: &AssemblyGraph, partition: &BinPartition, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; graph.num_vertices()];
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        if v != source && partition.is_binned(v) {
            continue;
        }
        let next = dist[v].unwrap_or_default() + 1;
        for &w in graph.neighbors(v) {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

#[test]
fn search_depths_are_bounded_shortest_paths() {
    for seed in 0..SEEDS {
        let instance = random_instance(seed);
        let mut search = NeighborhoodSearch::new(instance.graph.num_vertices());
        for max_depth in 1..=4 {
            for source in 0..instance.graph.num_vertices() {
                let found = search.collect(
                    &instance.graph,
                    &instance.contigs,
                    &instance.partition,
                    source,
                    max_depth,
                );
                let dist = blocked_distances(&instance.graph, &instance.partition, source);
                for record in &found {
                    assert!(record.depth >= 1 && record.depth <= max_depth, "seed {seed}");
                    assert_eq!(dist[record.labelled], Some(record.depth), "seed {seed}");
                    assert_eq!(instance.partition.bin_of(record.labelled), Some(record.bin));
                }
                let expected = (0..dist.len())
                    .filter(|&c| c != source && instance.partition.is_binned(c))
                    .filter(|&c| dist[c].is_some_and(|d| d <= max_depth))
                    .count();
                assert_eq!(found.len(), expected, "seed {seed} source {source}");
            }
        }
    }
}

#[test]
fn pruning_is_idempotent() {
    for seed in 0..SEEDS {
        let mut instance = random_instance(seed);
        let config = config();
        let mut search = NeighborhoodSearch::new(instance.graph.num_vertices());
        prune_unsupported(&instance.graph, &instance.contigs, &mut instance.partition, &config, &mut search)
            .unwrap();
        let again =
            prune_unsupported(&instance.graph, &instance.contigs, &mut instance.partition, &config, &mut search)
                .unwrap();
        assert_eq!(again.removed, 0, "seed {seed}");
        assert_eq!(again.passes, 1);
    }
}

#[test]
fn correction_moves_each_contig_at_most_once() {
    for seed in 0..SEEDS {
        let mut instance = random_instance(seed);
        let config = RefineConfig { threshold: 1.0, ..config() };
        let before = instance.partition.binned_count();
        let mut search = NeighborhoodSearch::new(instance.graph.num_vertices());
        let outcome =
            correct_inconsistent(&instance.graph, &instance.contigs, &mut instance.partition, &config, &mut search)
                .unwrap();
        let mut moved: Vec<usize> = outcome.moves.iter().map(|m| m.contig).collect();
        moved.sort_unstable();
        let total = moved.len();
        moved.dedup();
        assert_eq!(moved.len(), total, "seed {seed}");
        assert_eq!(instance.partition.binned_count(), before);
        for m in &outcome.moves {
            assert_ne!(m.from, m.to);
        }
    }
}

#[test]
fn multi_binning_keeps_original_bins() {
    for seed in 0..SEEDS {
        let mut instance = random_instance(seed);
        let original: Vec<Option<usize>> =
            (0..instance.graph.num_vertices()).map(|c| instance.partition.bin_of(c)).collect();
        let config = RefineConfig { multi_bin_min_length: 0, ..config() };
        let added =
            assign_multi_bins(&instance.graph, &instance.contigs, &mut instance.partition, &config).unwrap();
        for (contig, bin) in original.iter().enumerate() {
            match bin {
                Some(bin) => assert!(instance.partition.contains(*bin, contig), "seed {seed}"),
                None => assert!(!instance.partition.is_binned(contig)),
            }
        }
        for (contig, bins) in &added {
            assert!(bins.len() > 1);
            for bin in bins {
                assert!(instance.partition.contains(*bin, *contig));
            }
        }
    }
}

/// Records how many non-isolated unbinned contigs remain after each iteration.
struct Remaining<'a> {
    graph: &'a AssemblyGraph,
    counts: Vec<usize>,
}

impl Checkpoint for Remaining<'_> {
    fn partition(&mut self, _tag: &str, partition: &BinPartition) -> io::Result<()> {
        let left = non_isolated_unbinned(self.graph, partition).iter().filter(|&p| p).count();
        self.counts.push(left);
        Ok(())
    }

    fn queue(&mut self, _iteration: usize, _queue: &[Evidence]) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn propagation_shrinks_unbinned_set_one_at_a_time() {
    for seed in 0..SEEDS {
        let mut instance = random_instance(seed);
        let config = RefineConfig { save_interval: 1, min_coverage: 20.0, ..config() };
        let initial = non_isolated_unbinned(&instance.graph, &instance.partition)
            .iter()
            .filter(|&p| p)
            .count();
        let mut search = NeighborhoodSearch::new(instance.graph.num_vertices());
        let mut remaining = Remaining { graph: &instance.graph, counts: vec![initial] };

        let outcome = propagate_labels(
            &instance.graph,
            &instance.contigs,
            &mut instance.partition,
            &config,
            &mut search,
            &mut remaining,
        )
        .unwrap();

        assert_eq!(outcome.non_isolated_unbinned, initial);
        for step in remaining.counts.windows(2) {
            assert!(step[0] == step[1] || step[0] == step[1] + 1, "seed {seed}: {step:?}");
        }
        let left = non_isolated_unbinned(&instance.graph, &instance.partition)
            .iter()
            .filter(|&p| p)
            .count();
        assert_eq!(left + outcome.bound, initial, "seed {seed}");
        for contig in 0..instance.graph.num_vertices() {
            if instance.partition.is_binned(contig) && !instance.graph.is_isolated(contig) {
                assert_eq!(instance.partition.bins_of(contig).len(), 1);
            }
        }
    }
}
