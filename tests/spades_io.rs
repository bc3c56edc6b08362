use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use graphrefine::io::bins::{read_initial_bins, write_partition};
use graphrefine::io::snapshot::CsvCheckpoint;
use graphrefine::io::spades::load_spades;
use graphrefine::{RefineConfig, RefineError, Refiner};

const FASTA: &str = "\
>NODE_1_length_12000_cov_10.0
ACGTACGTACGT
>NODE_2_length_12000_cov_10.5
ACGTACGTACGT
>NODE_3_length_3000_cov_11.0
ACGTAC
>NODE_4_length_2000_cov_40.0
ACGT
";

const PATHS: &str = "\
NODE_1_length_12000_cov_10.0
1+
NODE_1_length_12000_cov_10.0'
1-
NODE_2_length_12000_cov_10.5
2+
NODE_2_length_12000_cov_10.5'
2-
NODE_3_length_3000_cov_11.0
3+
NODE_4_length_2000_cov_40.0
4+
";

const GFA: &str = "\
H\tVN:Z:1.0
S\t1\tACGTACGTACGT
S\t2\tACGTACGTACGT
S\t3\tACGTAC
S\t4\tACGT
L\t1\t+\t2\t+\t0M
L\t2\t+\t3\t+\t0M
";

struct Fixture {
    dir: TempDir,
    contigs: PathBuf,
    graph: PathBuf,
    paths: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let contigs = dir.path().join("contigs.fasta");
        let graph = dir.path().join("assembly_graph_with_scaffolds.gfa");
        let paths = dir.path().join("contigs.paths");
        fs::write(&contigs, FASTA).unwrap();
        fs::write(&graph, GFA).unwrap();
        fs::write(&paths, PATHS).unwrap();
        Self { dir, contigs, graph, paths }
    }

    fn bins(&self, rows: &str) -> PathBuf {
        let path = self.dir.path().join("initial_bins.csv");
        fs::write(&path, rows).unwrap();
        path
    }
}

fn read_rows(path: &Path) -> Vec<(String, String)> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].to_string())
        })
        .collect()
}

#[test]
fn loads_contigs_and_graph() {
    let fixture = Fixture::new();
    let (contigs, graph) = load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).unwrap();
    assert_eq!(contigs.len(), 4);
    assert_eq!(contigs.name(0), "NODE_1_length_12000_cov_10.0");
    assert_eq!(contigs.length(2), 3_000);
    assert_eq!(contigs.coverage(1), 10.5);
    assert_eq!(graph.neighbors(0), &[1]);
    assert_eq!(graph.neighbors(1), &[0, 2]);
    assert!(graph.is_isolated(3));
}

#[test]
fn refines_and_writes_bins() {
    let fixture = Fixture::new();
    let (contigs, graph) = load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).unwrap();
    let bins = fixture.bins("NODE_1,binA\nNODE_2,binA\nNODE_4,binB\n");
    let initial = read_initial_bins(&bins, b',', &contigs).unwrap();
    assert_eq!(initial.labels, vec!["binA", "binB"]);

    let labels = initial.bin_labels();
    let partition = initial.into_partition(contigs.len()).unwrap();
    let config = RefineConfig { show_progress: false, save_interval: 1, save_queue: true, ..Default::default() };
    let mut refiner = Refiner::new(graph, contigs, partition, config).unwrap().with_labels(labels).unwrap();
    let snapshot_contigs = refiner.contigs().clone();
    let snapshot_labels = refiner.labels().clone();
    let mut checkpoint =
        CsvCheckpoint::new(fixture.dir.path(), "run_", b',', &snapshot_contigs, &snapshot_labels);
    let summary = refiner.run(&mut checkpoint).unwrap();
    assert_eq!(summary.propagated, 1);

    let output = fixture.dir.path().join("refined_bins.csv");
    write_partition(&output, refiner.contigs(), refiner.partition(), refiner.labels(), b',').unwrap();
    assert_eq!(
        read_rows(&output),
        vec![
            ("NODE_1_length_12000_cov_10.0".to_string(), "binA".to_string()),
            ("NODE_2_length_12000_cov_10.5".to_string(), "binA".to_string()),
            ("NODE_3_length_3000_cov_11.0".to_string(), "binA".to_string()),
            ("NODE_4_length_2000_cov_40.0".to_string(), "binB".to_string()),
        ]
    );

    for name in ["run_after_removal.csv", "run_propagation_0.csv", "run_stage_2.csv", "run_propagation_1.csv"] {
        assert!(fixture.dir.path().join(name).exists(), "{name}");
    }
    let heap = fs::read_to_string(fixture.dir.path().join("run_heap_1.tsv")).unwrap();
    let first: Vec<&str> = heap.lines().next().unwrap().split('\t').collect();
    assert_eq!(&first[..4], &["NODE_3_length_3000_cov_11.0", "NODE_2_length_12000_cov_10.5", "binA", "1"]);
}

#[test]
fn numeric_labels_map_to_sorted_indices() {
    let fixture = Fixture::new();
    let (contigs, _) = load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).unwrap();
    let bins = fixture.bins("NODE_1\t10\nNODE_3\t2\nNODE_4\t10\n");
    let initial = read_initial_bins(&bins, b'\t', &contigs).unwrap();
    assert_eq!(initial.labels, vec!["2", "10"]);
    assert_eq!(initial.assignments, vec![(0, 1), (2, 0), (3, 1)]);
}

#[test]
fn gapped_bin_numbers_are_written_back_unchanged() {
    let fixture = Fixture::new();
    let (contigs, _) = load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).unwrap();
    let bins = fixture.bins("NODE_1,2\nNODE_2,2\nNODE_4,5\n");
    let initial = read_initial_bins(&bins, b',', &contigs).unwrap();
    let labels = initial.bin_labels();
    let partition = initial.into_partition(contigs.len()).unwrap();

    let output = fixture.dir.path().join("copy.csv");
    write_partition(&output, &contigs, &partition, &labels, b',').unwrap();
    let written: Vec<String> = read_rows(&output).into_iter().map(|(_, bin)| bin).collect();
    assert_eq!(written, vec!["2", "2", "5"]);
}

#[test]
fn unknown_contig_in_bins_is_reported() {
    let fixture = Fixture::new();
    let (contigs, _) = load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).unwrap();
    let bins = fixture.bins("NODE_1,1\nNODE_9,1\n");
    let err = read_initial_bins(&bins, b',', &contigs).unwrap_err();
    match err.downcast_ref::<RefineError>() {
        Some(RefineError::UnknownContig { name }) => assert_eq!(name, "NODE_9"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_header_for_path_is_an_error() {
    let fixture = Fixture::new();
    fs::write(&fixture.contigs, ">NODE_1_length_12000_cov_10.0\nACGT\n").unwrap();
    assert!(load_spades(&fixture.contigs, &fixture.graph, &fixture.paths).is_err());
}
