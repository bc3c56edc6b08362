//! Intermediate partition snapshots and propagation queue dumps.

use std::io;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::debug;

use crate::contig::ContigTable;
use crate::io::bins::write_partition;
use crate::partition::{BinLabels, BinPartition};
use crate::search::Evidence;

/// Hooks the refinement stages call at their save points.
pub trait Checkpoint {
    fn partition(&mut self, tag: &str, partition: &BinPartition) -> io::Result<()>;

    /// `queue` is in best-first order.
    fn queue(&mut self, iteration: usize, queue: &[Evidence]) -> io::Result<()>;
}

/// Discards every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCheckpoint;

impl Checkpoint for NoCheckpoint {
    fn partition(&mut self, _tag: &str, _partition: &BinPartition) -> io::Result<()> {
        Ok(())
    }

    fn queue(&mut self, _iteration: usize, _queue: &[Evidence]) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `<prefix><tag>.csv` partitions and `<prefix>heap_<iter>.tsv` queues.
pub struct CsvCheckpoint<'a> {
    dir: PathBuf,
    prefix: String,
    delimiter: u8,
    contigs: &'a ContigTable,
    labels: &'a BinLabels,
}

impl<'a> CsvCheckpoint<'a> {
    pub fn new(
        dir: &Path,
        prefix: &str,
        delimiter: u8,
        contigs: &'a ContigTable,
        labels: &'a BinLabels,
    ) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            delimiter,
            contigs,
            labels,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, name))
    }
}

impl Checkpoint for CsvCheckpoint<'_> {
    fn partition(&mut self, tag: &str, partition: &BinPartition) -> io::Result<()> {
        let path = self.path(&format!("{tag}.csv"));
        debug!("Writing partition snapshot {}", path.display());
        write_partition(&path, self.contigs, partition, self.labels, self.delimiter)
    }

    fn queue(&mut self, iteration: usize, queue: &[Evidence]) -> io::Result<()> {
        let path = self.path(&format!("heap_{iteration}.tsv"));
        debug!("Writing propagation queue {}", path.display());
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&path)?;
        for record in queue {
            writer.write_record([
                self.contigs.name(record.origin).to_string(),
                self.contigs.name(record.labelled).to_string(),
                self.labels.get(record.bin).to_string(),
                record.depth.to_string(),
                record.cov_diff.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
