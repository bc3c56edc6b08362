use bit_set::BitSet;

use crate::contig::ContigId;
use crate::error::{RefineError, Result};

/// Dense bin index, 0-based internally and written out 1-based.
pub type BinId = usize;

/// External name of every dense bin, written back in place of the index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinLabels(Vec<String>);

impl BinLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    /// Labels `1..=n_bins`, for partitions built without an input table.
    pub fn numbered(n_bins: usize) -> Self {
        Self((1..=n_bins).map(|bin| bin.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, bin: BinId) -> &str {
        &self.0[bin]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, bins: &[BinId], sep: &str) -> String {
        let labels: Vec<&str> = bins.iter().map(|&bin| self.get(bin)).collect();
        labels.join(sep)
    }
}

/// Mutable contig -> bin assignment with a reverse index kept in lock-step.
///
/// Until multi-bin assignment runs every binned contig sits in exactly one
/// bin; `assign`, `unassign` and `move_to` enforce that.
#[derive(Clone, Debug)]
pub struct BinPartition {
    members: Vec<BitSet>,
    assignment: Vec<Vec<BinId>>,
    binned: usize,
}

impl BinPartition {
    pub fn new(n_contigs: usize, n_bins: usize) -> Self {
        Self {
            members: (0..n_bins).map(|_| BitSet::with_capacity(n_contigs)).collect(),
            assignment: vec![Vec::new(); n_contigs],
            binned: 0,
        }
    }

    /// Builds a single-membership partition from `(contig, bin)` pairs. A
    /// contig listed twice keeps its last bin.
    pub fn from_assignments<I>(n_contigs: usize, n_bins: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ContigId, BinId)>,
    {
        let mut partition = Self::new(n_contigs, n_bins);
        for (contig, bin) in pairs {
            partition.check_ids(contig, bin)?;
            partition.force_assign(contig, bin)?;
        }
        Ok(partition)
    }

    pub fn n_bins(&self) -> usize {
        self.members.len()
    }

    pub fn n_contigs(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_binned(&self, contig: ContigId) -> bool {
        !self.assignment[contig].is_empty()
    }

    /// Primary (lowest) bin of a contig.
    pub fn bin_of(&self, contig: ContigId) -> Option<BinId> {
        self.assignment[contig].first().copied()
    }

    /// All bins of a contig, ascending.
    pub fn bins_of(&self, contig: ContigId) -> &[BinId] {
        &self.assignment[contig]
    }

    pub fn contains(&self, bin: BinId, contig: ContigId) -> bool {
        self.members[bin].contains(contig)
    }

    pub fn binned_count(&self) -> usize {
        self.binned
    }

    pub fn binned(&self) -> Vec<ContigId> {
        (0..self.n_contigs()).filter(|&c| self.is_binned(c)).collect()
    }

    pub fn unbinned(&self) -> Vec<ContigId> {
        (0..self.n_contigs()).filter(|&c| !self.is_binned(c)).collect()
    }

    pub fn members(&self, bin: BinId) -> impl Iterator<Item = ContigId> + '_ {
        self.members[bin].iter()
    }

    pub fn bin_size(&self, bin: BinId) -> usize {
        self.members[bin].len()
    }

    /// Places an unbinned contig into `bin`.
    pub fn assign(&mut self, contig: ContigId, bin: BinId) -> Result<()> {
        self.check_ids(contig, bin)?;
        if self.is_binned(contig) {
            return Err(RefineError::invariant(format!(
                "contig {contig} is already in bin {:?}",
                self.assignment[contig]
            )));
        }
        self.insert(contig, bin);
        Ok(())
    }

    /// Removes the label of a single-binned contig and returns its old bin.
    pub fn unassign(&mut self, contig: ContigId) -> Result<BinId> {
        let bin = self.single_bin(contig)?;
        self.members[bin].remove(contig);
        self.assignment[contig].clear();
        self.binned -= 1;
        Ok(bin)
    }

    pub fn move_to(&mut self, contig: ContigId, from: BinId, to: BinId) -> Result<()> {
        self.check_ids(contig, to)?;
        let current = self.single_bin(contig)?;
        if current != from {
            return Err(RefineError::invariant(format!(
                "contig {contig} expected in bin {from}, found in bin {current}"
            )));
        }
        self.members[from].remove(contig);
        self.members[to].insert(contig);
        self.assignment[contig][0] = to;
        Ok(())
    }

    /// Replaces every membership of `contig` with `bin`.
    pub fn force_assign(&mut self, contig: ContigId, bin: BinId) -> Result<()> {
        self.check_ids(contig, bin)?;
        let old_bins = std::mem::take(&mut self.assignment[contig]);
        if !old_bins.is_empty() {
            self.binned -= 1;
        }
        for old in old_bins {
            self.members[old].remove(contig);
        }
        self.insert(contig, bin);
        Ok(())
    }

    /// Adds `bin` to the memberships of `contig`; returns false if already present.
    pub fn add_membership(&mut self, contig: ContigId, bin: BinId) -> Result<bool> {
        self.check_ids(contig, bin)?;
        if self.members[bin].contains(contig) {
            return Ok(false);
        }
        self.insert(contig, bin);
        Ok(true)
    }

    pub fn check_single_membership(&self) -> Result<()> {
        match self.assignment.iter().position(|bins| bins.len() > 1) {
            Some(contig) => Err(RefineError::invariant(format!(
                "contig {contig} belongs to bins {:?} before multi-bin assignment",
                self.assignment[contig]
            ))),
            None => Ok(()),
        }
    }

    /// `(contig, bin)` rows ordered by contig, then bin.
    pub fn rows(&self) -> impl Iterator<Item = (ContigId, BinId)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .flat_map(|(contig, bins)| bins.iter().map(move |&bin| (contig, bin)))
    }

    fn insert(&mut self, contig: ContigId, bin: BinId) {
        let bins = &mut self.assignment[contig];
        if bins.is_empty() {
            self.binned += 1;
        }
        let pos = bins.partition_point(|&b| b < bin);
        bins.insert(pos, bin);
        self.members[bin].insert(contig);
    }

    fn single_bin(&self, contig: ContigId) -> Result<BinId> {
        match self.assignment[contig].as_slice() {
            [bin] => Ok(*bin),
            [] => Err(RefineError::invariant(format!("contig {contig} is not binned"))),
            bins => Err(RefineError::invariant(format!(
                "contig {contig} is in several bins {bins:?}"
            ))),
        }
    }

    fn check_ids(&self, contig: ContigId, bin: BinId) -> Result<()> {
        if bin >= self.n_bins() {
            return Err(RefineError::UnknownBin {
                bin,
                n_bins: self.n_bins(),
            });
        }
        if contig >= self.n_contigs() {
            return Err(RefineError::invariant(format!(
                "contig id {contig} outside 0..{}",
                self.n_contigs()
            )));
        }
        Ok(())
    }
}
