//! Refines an initial binning of metagenomic contigs using the assembly graph:
//! unsupported labels are pruned, inconsistent ones corrected, labels are
//! propagated best-first onto unbinned contigs, and contigs whose coverage is a
//! mixture of neighbouring bins are placed in several bins.

pub mod config;
pub mod contig;
pub mod correct;
pub mod error;
pub mod graph;
pub mod io;
pub mod multibin;
pub mod partition;
pub mod pipeline;
mod progress;
pub mod propagate;
pub mod prune;
#[cfg(feature = "reference-labels")]
pub mod reference;
pub mod search;

pub use config::RefineConfig;
pub use contig::{Contig, ContigId, ContigTable};
pub use error::{RefineError, Result};
pub use graph::AssemblyGraph;
pub use partition::{BinId, BinLabels, BinPartition};
pub use pipeline::{RefineSummary, Refiner};
pub use search::{Evidence, NeighborhoodSearch};
