//! Reference-label diagnostics: mapping a gold-standard labelling onto the
//! predicted bins, forcing reference labels during searches, and measuring
//! how often evidence at each depth agrees with the reference.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use indexmap::IndexSet;

use crate::contig::{ContigId, ContigTable};
use crate::error::RefineError;
use crate::graph::AssemblyGraph;
use crate::partition::{BinId, BinPartition};
use crate::search::{LabelView, NeighborhoodSearch};

/// Reference genome of each contig, where known.
#[derive(Clone, Debug, Default)]
pub struct ReferenceLabels {
    genome_of: Vec<Option<usize>>,
    genomes: IndexSet<String>,
}

impl ReferenceLabels {
    pub fn new(n_contigs: usize) -> Self {
        Self {
            genome_of: vec![None; n_contigs],
            genomes: IndexSet::new(),
        }
    }

    pub fn insert(&mut self, contig: ContigId, genome: &str) {
        let (genome, _) = self.genomes.insert_full(genome.to_string());
        self.genome_of[contig] = Some(genome);
    }

    pub fn n_genomes(&self) -> usize {
        self.genomes.len()
    }

    /// Reads `<contig name><delim><genome>[<delim><length>]` rows.
    pub fn read(path: &Path, delimiter: u8, contigs: &ContigTable) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_path(path)
            .with_context(|| format!("open reference labels {}", path.display()))?;
        let mut labels = Self::new(contigs.len());
        for record in reader.records() {
            let record = record.with_context(|| format!("read reference labels {}", path.display()))?;
            let (Some(name), Some(genome)) = (record.get(0), record.get(1)) else {
                return Err(RefineError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: record.position().map(|p| p.line() as usize).unwrap_or_default(),
                    reason: "expected a contig name and a genome id".to_string(),
                }
                .into());
            };
            let contig = contigs.resolve(name.trim())?;
            labels.insert(contig, genome.trim());
        }
        Ok(labels)
    }

    /// Reference bin of every contig. Each predicted bin is matched with the
    /// genome covering most of its bases; a genome that tops several bins
    /// goes to the one where it covers the most.
    pub fn bin_labels(&self, contigs: &ContigTable, partition: &BinPartition) -> Vec<Option<BinId>> {
        let n_genomes = self.genomes.len();
        let mut genome_bin: Vec<Option<(BinId, u64)>> = vec![None; n_genomes];
        for bin in 0..partition.n_bins() {
            let mut covered = vec![0u64; n_genomes];
            for contig in partition.members(bin) {
                if let Some(genome) = self.genome_of[contig] {
                    covered[genome] += contigs.length(contig);
                }
            }
            let top = covered
                .iter()
                .enumerate()
                .filter(|&(_, &len)| len > 0)
                .fold(None, |best: Option<(usize, u64)>, (genome, &len)| match best {
                    Some((_, top)) if top >= len => best,
                    _ => Some((genome, len)),
                });
            if let Some((genome, len)) = top {
                if genome_bin[genome].map_or(true, |(_, best)| len > best) {
                    genome_bin[genome] = Some((bin, len));
                }
            }
        }
        self.genome_of
            .iter()
            .map(|genome| genome.and_then(|g| genome_bin[g]).map(|(bin, _)| bin))
            .collect()
    }
}

/// Label view that rebins discovered contigs to their reference bin while
/// the search budget lasts.
struct TruthView<'a> {
    partition: &'a mut BinPartition,
    truth: &'a [Option<BinId>],
    rebinned: usize,
}

impl LabelView for TruthView<'_> {
    fn label(&self, contig: ContigId) -> Option<BinId> {
        self.partition.bin_of(contig)
    }

    fn discovered(&mut self, contig: ContigId, budget: usize) -> crate::error::Result<()> {
        if budget == 0 {
            return Ok(());
        }
        if let Some(bin) = self.truth[contig] {
            if self.partition.bins_of(contig) != [bin] {
                self.partition.force_assign(contig, bin)?;
                self.rebinned += 1;
            }
        }
        Ok(())
    }
}

/// Searches from every binned contig with a budget of `budget` expansions,
/// forcing reference labels onto what it discovers. Returns the number of
/// rebinned contigs.
pub fn propagate_truth(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &mut BinPartition,
    truth: &[Option<BinId>],
    max_depth: usize,
    budget: usize,
    search: &mut NeighborhoodSearch,
) -> crate::error::Result<usize> {
    let mut view = TruthView { partition, truth, rebinned: 0 };
    let mut evidence = Vec::new();
    for contig in view.partition.binned() {
        evidence.clear();
        search.explore(graph, contigs, &mut view, contig, max_depth, budget, &mut evidence)?;
    }
    Ok(view.rebinned)
}

/// What a contig's reference bin is compared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportBasis {
    /// The reference bin of the reached contig; unlabelled ones are skipped.
    Reference,
    /// The predicted bin of the reached contig.
    Predicted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthSupport {
    pub contig: ContigId,
    /// Agreeing share of the evidence found at depth `i + 1`.
    pub fractions: Vec<f64>,
}

pub fn depth_support(
    graph: &AssemblyGraph,
    contigs: &ContigTable,
    partition: &BinPartition,
    truth: &[Option<BinId>],
    max_depth: usize,
    basis: SupportBasis,
    search: &mut NeighborhoodSearch,
) -> Vec<DepthSupport> {
    let mut rows = Vec::new();
    let mut evidence = Vec::new();
    for contig in partition.binned() {
        let Some(expected) = truth[contig] else {
            continue;
        };
        evidence.clear();
        search.search(graph, contigs, partition, contig, max_depth, &mut evidence);

        let mut per_depth = vec![0usize; max_depth];
        for record in &evidence {
            per_depth[record.depth - 1] += 1;
        }
        let mut fractions = vec![0.0; max_depth];
        for record in &evidence {
            let agrees = match basis {
                SupportBasis::Reference => match truth[record.labelled] {
                    Some(bin) => bin == expected,
                    None => continue,
                },
                SupportBasis::Predicted => record.bin == expected,
            };
            if agrees {
                fractions[record.depth - 1] += 1.0 / per_depth[record.depth - 1] as f64;
            }
        }
        rows.push(DepthSupport { contig, fractions });
    }
    rows
}

/// Tab-separated `contig_num, depth1..depthD` table.
pub fn write_depth_support(
    path: &Path,
    contigs: &ContigTable,
    rows: &[DepthSupport],
    max_depth: usize,
) -> io::Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    let mut header = vec!["contig_num".to_string()];
    header.extend((1..=max_depth).map(|d| format!("depth{d}")));
    writer.write_record(&header)?;
    for row in rows {
        let mut fields = vec![contigs.get(row.contig).number.to_string()];
        fields.extend(row.fractions.iter().map(|f| format!("{:.2}", f)));
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}
