use crate::error::{RefineError, Result};

/// Default breadth-first search depth.
pub const DEFAULT_DEPTH: usize = 5;
pub const DEFAULT_THRESHOLD: f64 = 1.5;
/// Contigs shorter than this lose their label when every neighbouring vote
/// goes to a single other bin.
pub const SMALL_CONTIG_LENGTH: u64 = 10_000;
/// Only contigs longer than this can be placed in several bins.
pub const MULTI_BIN_MIN_LENGTH: u64 = 1_000;
pub const DEFAULT_MAX_MULTI_BINS: usize = 16;
const MAX_MULTI_BINS_LIMIT: usize = 24;

#[derive(Clone, Debug)]
pub struct RefineConfig {
    pub max_depth: usize,
    /// Weighted-score multiplier a bin must beat to take a contig over.
    pub threshold: f64,
    pub min_coverage: f64,
    pub min_length: u64,
    pub threads: usize,
    pub small_contig_length: u64,
    pub multi_bin_min_length: u64,
    /// Largest number of neighbouring bins enumerated in multi-bin assignment.
    pub max_multi_bins: usize,
    pub skip_correction: bool,
    /// Write partition snapshots every `save_interval` propagation iterations (0 = off).
    pub save_interval: usize,
    pub save_queue: bool,
    pub show_progress: bool,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_DEPTH,
            threshold: DEFAULT_THRESHOLD,
            min_coverage: 0.0,
            min_length: 0,
            threads: 8,
            small_contig_length: SMALL_CONTIG_LENGTH,
            multi_bin_min_length: MULTI_BIN_MIN_LENGTH,
            max_multi_bins: DEFAULT_MAX_MULTI_BINS,
            skip_correction: false,
            save_interval: 0,
            save_queue: false,
            show_progress: true,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(RefineError::config("search depth must be a positive integer"));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(RefineError::config(format!(
                "threshold must be a positive number, got {}",
                self.threshold
            )));
        }
        if !self.min_coverage.is_finite() || self.min_coverage < 0.0 {
            return Err(RefineError::config(format!(
                "minimum coverage must be non-negative, got {}",
                self.min_coverage
            )));
        }
        if self.threads == 0 {
            return Err(RefineError::config("thread count must be at least 1"));
        }
        if self.max_multi_bins == 0 || self.max_multi_bins > MAX_MULTI_BINS_LIMIT {
            return Err(RefineError::config(format!(
                "max multi bins must be in 1..={MAX_MULTI_BINS_LIMIT}, got {}",
                self.max_multi_bins
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RefineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.threshold, 1.5);
    }

    #[test]
    fn rejects_bad_values() {
        let zero_depth = RefineConfig { max_depth: 0, ..Default::default() };
        assert!(matches!(zero_depth.validate(), Err(RefineError::Config(_))));

        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = RefineConfig { threshold, ..Default::default() };
            assert!(config.validate().is_err(), "threshold {threshold} accepted");
        }

        let negative_cov = RefineConfig { min_coverage: -0.5, ..Default::default() };
        assert!(negative_cov.validate().is_err());

        let no_threads = RefineConfig { threads: 0, ..Default::default() };
        assert!(no_threads.validate().is_err());

        let huge_subsets = RefineConfig { max_multi_bins: 40, ..Default::default() };
        assert!(huge_subsets.validate().is_err());
    }
}
