use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use graphrefine::config::{
    RefineConfig, DEFAULT_DEPTH, DEFAULT_MAX_MULTI_BINS, DEFAULT_THRESHOLD, MULTI_BIN_MIN_LENGTH,
    SMALL_CONTIG_LENGTH,
};
use graphrefine::io::bins::{read_initial_bins, write_partition};
use graphrefine::io::parse_delimiter;
use graphrefine::io::snapshot::{Checkpoint, CsvCheckpoint, NoCheckpoint};
use graphrefine::io::spades::load_spades;
use graphrefine::Refiner;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Contigs FASTA (plain or compressed)
    #[arg(short, long)]
    contigs: PathBuf,
    /// Assembly graph in GFA format
    #[arg(short, long)]
    graph: PathBuf,
    /// contigs.paths file
    #[arg(short, long)]
    paths: PathBuf,
    /// Initial binning result, one `contig<delim>bin` row per line
    #[arg(short, long)]
    binned: PathBuf,
    /// Output directory
    #[arg(short, long)]
    output: PathBuf,
    /// Prefix of every output file
    #[arg(long, default_value_t = String::from(""))]
    prefix: String,
    /// Maximum search depth
    #[arg(short, long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,
    /// Score multiplier another bin needs to take a contig over
    #[arg(short = 'x', long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
    /// Delimiter of the binning files (`,`, `;`, `\t`, ...)
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
    /// Number of threads for multi-bin assignment
    #[arg(short, long, default_value_t = 8)]
    threads: usize,
    /// Minimum coverage of a contig to receive a propagated label
    #[arg(long, default_value_t = 0.0)]
    cov_threshold: f64,
    /// Minimum length of a contig to receive a propagated label
    #[arg(long, default_value_t = 0)]
    len_threshold: u64,
    /// Contigs shorter than this lose their label when every vote goes to one other bin
    #[arg(long, default_value_t = SMALL_CONTIG_LENGTH)]
    small_contig_length: u64,
    /// Only contigs longer than this can join several bins
    #[arg(long, default_value_t = MULTI_BIN_MIN_LENGTH)]
    multi_bin_length: u64,
    /// Largest number of neighbouring bins considered for multi-binning
    #[arg(long, default_value_t = DEFAULT_MAX_MULTI_BINS)]
    max_multi_bins: usize,
    /// Skip the correction of inconsistent labels
    #[arg(long)]
    skip_correction: bool,
    /// Save the partition every N propagation iterations (0 = never)
    #[arg(long, default_value_t = 0)]
    save_interval: usize,
    /// Also dump the propagation queue at every save
    #[arg(long)]
    save_queue: bool,
    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
    /// Debug logging when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
    /// Reference labelling `contig<delim>genome[<delim>length]`
    #[cfg(feature = "reference-labels")]
    #[arg(long)]
    gold_standard: Option<PathBuf>,
    /// Expansion budget of the reference-label propagation (0 = off)
    #[cfg(feature = "reference-labels")]
    #[arg(long, default_value_t = 0)]
    truth_depth: usize,
}

impl Args {
    fn to_config(&self) -> RefineConfig {
        RefineConfig {
            max_depth: self.depth,
            threshold: self.threshold,
            min_coverage: self.cov_threshold,
            min_length: self.len_threshold,
            threads: self.threads,
            small_contig_length: self.small_contig_length,
            multi_bin_min_length: self.multi_bin_length,
            max_multi_bins: self.max_multi_bins,
            skip_correction: self.skip_correction,
            save_interval: self.save_interval,
            save_queue: self.save_queue,
            show_progress: !self.no_progress,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("Contigs file: {}", args.contigs.display());
    info!("Assembly graph file: {}", args.graph.display());
    info!("Contig paths file: {}", args.paths.display());
    info!("Existing binning output file: {}", args.binned.display());
    info!("Final binning output directory: {}", args.output.display());
    info!("Depth: {}, threshold: {}", args.depth, args.threshold);

    let config = args.to_config();
    config.validate()?;
    fs::create_dir_all(&args.output)
        .with_context(|| format!("create output directory {}", args.output.display()))?;

    let (contigs, graph) = load_spades(&args.contigs, &args.graph, &args.paths)?;

    let initial = read_initial_bins(&args.binned, args.delimiter, &contigs)?;
    let labels = initial.bin_labels();
    let partition = initial.into_partition(contigs.len())?;
    let mut refiner = Refiner::new(graph, contigs, partition, config)?.with_labels(labels)?;

    #[cfg(feature = "reference-labels")]
    let truth = match &args.gold_standard {
        Some(path) => {
            let labels =
                graphrefine::reference::ReferenceLabels::read(path, args.delimiter, refiner.contigs())?;
            info!("Reference labelling covers {} genomes", labels.n_genomes());
            Some(labels.bin_labels(refiner.contigs(), refiner.partition()))
        }
        None => None,
    };
    #[cfg(feature = "reference-labels")]
    if let Some(truth) = &truth {
        use graphrefine::reference::{write_depth_support, SupportBasis};
        if args.truth_depth > 0 {
            refiner.propagate_truth(truth, args.truth_depth)?;
        }
        let rows = refiner.depth_support(truth, SupportBasis::Reference);
        let path = args.output.join(format!("{}depth_support_initial.tsv", args.prefix));
        write_depth_support(&path, refiner.contigs(), &rows, args.depth)
            .with_context(|| format!("write {}", path.display()))?;
    }

    let summary = if args.save_interval > 0 {
        let contigs = refiner.contigs().clone();
        let labels = refiner.labels().clone();
        let mut checkpoint =
            CsvCheckpoint::new(&args.output, &args.prefix, args.delimiter, &contigs, &labels);
        run(&mut refiner, &mut checkpoint)?
    } else {
        run(&mut refiner, &mut NoCheckpoint)?
    };
    info!(
        "Removed {} labels, moved {}, propagated {} ({} discarded), multi-binned {}",
        summary.removed,
        summary.moved,
        summary.propagated,
        summary.discarded,
        summary.multi_binned.len()
    );

    #[cfg(feature = "reference-labels")]
    if let Some(truth) = &truth {
        use graphrefine::reference::{write_depth_support, SupportBasis};
        let rows = refiner.depth_support(truth, SupportBasis::Predicted);
        let path = args.output.join(format!("{}depth_support_final.tsv", args.prefix));
        write_depth_support(&path, refiner.contigs(), &rows, args.depth)
            .with_context(|| format!("write {}", path.display()))?;
    }

    let output = args.output.join(format!("{}refined_bins.csv", args.prefix));
    write_partition(&output, refiner.contigs(), refiner.partition(), refiner.labels(), args.delimiter)
        .with_context(|| format!("write {}", output.display()))?;
    info!("Final binning results can be found at {}", output.display());
    Ok(())
}

fn run(refiner: &mut Refiner, checkpoint: &mut dyn Checkpoint) -> Result<graphrefine::RefineSummary> {
    Ok(refiner.run(checkpoint)?)
}
