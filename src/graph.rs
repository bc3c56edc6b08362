use std::collections::VecDeque;

use bit_vec::BitVec;

use crate::contig::ContigId;
use crate::error::{RefineError, Result};

/// Undirected simple graph over contig ids, stored as compressed adjacency lists.
#[derive(Clone, Debug)]
pub struct AssemblyGraph {
    offsets: Vec<usize>,
    targets: Vec<ContigId>,
}

impl AssemblyGraph {
    /// Builds the graph from an edge list; self-loops are dropped and
    /// parallel edges collapsed.
    pub fn from_edges(n_vertices: usize, edges: &[(ContigId, ContigId)]) -> Result<Self> {
        let mut adjacency: Vec<Vec<ContigId>> = vec![Vec::new(); n_vertices];
        for &(u, v) in edges {
            if u >= n_vertices || v >= n_vertices {
                return Err(RefineError::EdgeOutOfRange { u, v, n_vertices });
            }
            if u == v {
                continue;
            }
            adjacency[u].push(v);
            adjacency[v].push(u);
        }

        let mut offsets = Vec::with_capacity(n_vertices + 1);
        let mut targets = Vec::with_capacity(edges.len() * 2);
        offsets.push(0);
        for mut neighbours in adjacency {
            neighbours.sort_unstable();
            neighbours.dedup();
            targets.extend_from_slice(&neighbours);
            offsets.push(targets.len());
        }
        Ok(Self { offsets, targets })
    }

    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_edges(&self) -> usize {
        self.targets.len() / 2
    }

    /// Sorted neighbours of `v`.
    pub fn neighbors(&self, v: ContigId) -> &[ContigId] {
        &self.targets[self.offsets[v]..self.offsets[v + 1]]
    }

    pub fn degree(&self, v: ContigId) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    pub fn is_isolated(&self, v: ContigId) -> bool {
        self.degree(v) == 0
    }

    pub fn isolated_mask(&self) -> BitVec {
        let mut mask = BitVec::from_elem(self.num_vertices(), false);
        for v in 0..self.num_vertices() {
            if self.is_isolated(v) {
                mask.set(v, true);
            }
        }
        mask
    }

    /// Marks every vertex whose connected component holds at least one
    /// labelled vertex.
    pub fn labelled_components<F>(&self, is_labelled: F) -> BitVec
    where
        F: Fn(ContigId) -> bool,
    {
        let n = self.num_vertices();
        let mut seen = BitVec::from_elem(n, false);
        let mut marked = BitVec::from_elem(n, false);
        let mut component = Vec::new();
        let mut queue = VecDeque::new();

        for root in 0..n {
            if seen[root] {
                continue;
            }
            component.clear();
            let mut labelled = false;
            seen.set(root, true);
            queue.push_back(root);
            while let Some(v) = queue.pop_front() {
                component.push(v);
                labelled |= is_labelled(v);
                for &w in self.neighbors(v) {
                    if !seen[w] {
                        seen.set(w, true);
                        queue.push_back(w);
                    }
                }
            }
            if labelled {
                for &v in &component {
                    marked.set(v, true);
                }
            }
        }
        marked
    }
}
