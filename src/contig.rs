use hashbrown::HashMap;
use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::{RefineError, Result};

/// Dense vertex id assigned when the contig table is built.
pub type ContigId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Contig {
    /// External contig number (the `N` in `NODE_N_...`).
    pub number: u64,
    pub length: u64,
    pub coverage: f64,
}

/// Immutable per-contig attributes, indexed by [`ContigId`].
///
/// The insertion order of the name map is the vertex order, so
/// `names.get_index_of(name)` is the contig id.
#[derive(Clone, Debug, Default)]
pub struct ContigTable {
    names: IndexMap<String, Contig>,
    by_number: HashMap<u64, ContigId>,
}

impl ContigTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            names: IndexMap::with_capacity(n),
            by_number: HashMap::with_capacity(n),
        }
    }

    /// Appends a contig and returns its id.
    pub fn push(&mut self, name: impl Into<String>, contig: Contig) -> Result<ContigId> {
        if !contig.coverage.is_finite() || contig.coverage < 0.0 {
            return Err(RefineError::invariant(format!(
                "contig {} has invalid coverage {}",
                contig.number, contig.coverage
            )));
        }
        let id = self.names.len();
        let number = contig.number;
        if let Some(&first) = self.by_number.get(&number) {
            return Err(RefineError::invariant(format!(
                "contig number {number} already used by '{}'",
                self.name(first)
            )));
        }
        match self.names.entry(name.into()) {
            Entry::Occupied(entry) => {
                return Err(RefineError::invariant(format!(
                    "contig name '{}' listed twice",
                    entry.key()
                )))
            }
            Entry::Vacant(entry) => {
                entry.insert(contig);
            }
        }
        self.by_number.insert(number, id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, id: ContigId) -> &Contig {
        &self.names[id]
    }

    pub fn name(&self, id: ContigId) -> &str {
        self.names
            .get_index(id)
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    pub fn length(&self, id: ContigId) -> u64 {
        self.names[id].length
    }

    pub fn coverage(&self, id: ContigId) -> f64 {
        self.names[id].coverage
    }

    pub fn coverage_diff(&self, a: ContigId, b: ContigId) -> f64 {
        (self.coverage(a) - self.coverage(b)).abs()
    }

    pub fn id_by_name(&self, name: &str) -> Option<ContigId> {
        self.names.get_index_of(name)
    }

    pub fn id_by_number(&self, number: u64) -> Option<ContigId> {
        self.by_number.get(&number).copied()
    }

    /// Resolves a contig by full name, falling back to its `NODE_<num>` prefix.
    pub fn resolve(&self, name: &str) -> Result<ContigId> {
        self.id_by_name(name)
            .or_else(|| node_number(name).and_then(|n| self.id_by_number(n)))
            .ok_or_else(|| RefineError::UnknownContig {
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContigId, &str, &Contig)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, (name, contig))| (id, name.as_str(), contig))
    }
}

/// Extracts `N` from a SPAdes-style `NODE_N[_...]` contig name.
pub fn node_number(name: &str) -> Option<u64> {
    let rest = name.strip_prefix("NODE_")?;
    let digits = rest.split('_').next()?;
    digits.parse().ok()
}
