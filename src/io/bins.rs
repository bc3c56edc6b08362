//! Delimited bin tables: the initial binning read in and the refined one written out.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use hashbrown::HashMap;
use tracing::warn;

use crate::contig::{ContigId, ContigTable};
use crate::error::RefineError;
use crate::partition::{BinId, BinLabels, BinPartition};

/// Initial assignment with bin labels mapped to dense indices.
#[derive(Clone, Debug, Default)]
pub struct InitialBinning {
    /// External label of each dense bin index.
    pub labels: Vec<String>,
    pub assignments: Vec<(ContigId, BinId)>,
}

impl InitialBinning {
    pub fn n_bins(&self) -> usize {
        self.labels.len()
    }

    /// Labels to write back, so every bin keeps its input name.
    pub fn bin_labels(&self) -> BinLabels {
        BinLabels::new(self.labels.clone())
    }

    pub fn into_partition(self, n_contigs: usize) -> crate::error::Result<BinPartition> {
        let mut seen = vec![false; n_contigs];
        for &(contig, _) in &self.assignments {
            if contig < n_contigs && std::mem::replace(&mut seen[contig], true) {
                warn!("contig {contig} listed more than once in the initial binning; keeping the last bin");
            }
        }
        BinPartition::from_assignments(n_contigs, self.labels.len(), self.assignments)
    }
}

/// Sorts labels numerically when all of them are integers, lexicographically otherwise.
fn sort_labels(labels: &mut [String]) {
    let numeric: Option<Vec<i64>> = labels.iter().map(|l| l.parse().ok()).collect();
    if numeric.is_some() {
        labels.sort_by_key(|l| l.parse::<i64>().unwrap_or_default());
    } else {
        labels.sort();
    }
}

/// Reads `<contig name><delim><bin label>` rows.
pub fn read_initial_bins(path: &Path, delimiter: u8, contigs: &ContigTable) -> Result<InitialBinning> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("open binning result {}", path.display()))?;

    let mut rows: Vec<(ContigId, String)> = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read binning result {}", path.display()))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or_default();
        let (Some(name), Some(label)) = (record.get(0), record.get(1)) else {
            return Err(RefineError::MalformedRecord {
                path: path.to_path_buf(),
                line,
                reason: "expected a contig name and a bin label".to_string(),
            }
            .into());
        };
        let contig = contigs.resolve(name.trim())?;
        rows.push((contig, label.trim().to_string()));
    }

    let mut labels: Vec<String> = rows.iter().map(|(_, label)| label.clone()).collect();
    labels.sort();
    labels.dedup();
    sort_labels(&mut labels);
    let assignments: Vec<(ContigId, BinId)> = {
        let index: HashMap<&str, BinId> = labels
            .iter()
            .enumerate()
            .map(|(bin, label)| (label.as_str(), bin))
            .collect();
        rows.iter()
            .map(|(contig, label)| (*contig, index[label.as_str()]))
            .collect()
    };

    Ok(InitialBinning { labels, assignments })
}

/// Writes `(contig name, bin label)` rows ordered by contig, then bin.
pub fn write_partition(
    path: &Path,
    contigs: &ContigTable,
    partition: &BinPartition,
    labels: &BinLabels,
    delimiter: u8,
) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;
    for (contig, bin) in partition.rows() {
        writer.write_record([contigs.name(contig), labels.get(bin)])?;
    }
    writer.flush()?;
    Ok(())
}
