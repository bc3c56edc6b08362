//! Loads contigs and the contig adjacency graph from SPAdes output
//! (`contigs.fasta`, `assembly_graph_with_scaffolds.gfa`, `contigs.paths`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::{HashMap, HashSet};
use seq_io::fasta::{Reader, Record};
use tracing::info;

use crate::contig::{node_number, Contig, ContigId, ContigTable};
use crate::error::RefineError;
use crate::graph::AssemblyGraph;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpadesHeader {
    pub number: u64,
    pub length: u64,
    pub coverage: f64,
}

/// Parses `NODE_<num>_length_<len>_cov_<cov>`.
pub fn parse_header(id: &str) -> Option<SpadesHeader> {
    let rest = id.strip_prefix("NODE_")?;
    let (number, rest) = rest.split_once("_length_")?;
    let (length, rest) = rest.split_once("_cov_")?;
    let coverage = rest.split('_').next()?;
    Some(SpadesHeader {
        number: number.parse().ok()?,
        length: length.parse().ok()?,
        coverage: coverage.parse().ok()?,
    })
}

/// Length and coverage of every contig in a (possibly compressed) FASTA file.
pub fn read_contig_headers(path: &Path) -> Result<HashMap<u64, SpadesHeader>> {
    let (reader, _format) =
        niffler::from_path(path).with_context(|| format!("open contigs {}", path.display()))?;
    let mut reader = Reader::new(reader);
    let mut headers = HashMap::new();
    let mut idx = 0;
    while let Some(record) = reader.next() {
        idx += 1;
        let record = record.with_context(|| format!("read record {idx} in {}", path.display()))?;
        let id = record
            .id()
            .with_context(|| format!("decode header of record {idx} in {}", path.display()))?;
        let header = parse_header(id).ok_or_else(|| RefineError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx,
            reason: format!("'{id}' is not a NODE_<n>_length_<l>_cov_<c> header"),
        })?;
        headers.insert(header.number, header);
    }
    Ok(headers)
}

/// Vertex order and segment usage read from `contigs.paths`.
#[derive(Clone, Debug, Default)]
pub struct ContigPaths {
    /// `(contig number, name)` per vertex, in file order.
    pub vertices: Vec<(u64, String)>,
    /// First and last oriented segment of each vertex's first path.
    pub ends: Vec<(String, String)>,
    /// Vertices using each oriented segment.
    pub segment_contigs: HashMap<String, HashSet<ContigId>>,
}

impl ContigPaths {
    pub fn parse<R: BufRead>(reader: R, source: &Path) -> Result<Self> {
        let mut lines = reader.lines().enumerate();
        let mut paths = ContigPaths::default();
        let mut by_number: HashMap<u64, ContigId> = HashMap::new();

        while let Some((idx, name)) = lines.next() {
            let name = name.with_context(|| format!("read line {} of {}", idx + 1, source.display()))?;
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let Some((path_idx, path)) = lines.next() else {
                return Err(RefineError::MalformedRecord {
                    path: source.to_path_buf(),
                    line: idx + 1,
                    reason: format!("'{name}' has no path line"),
                }
                .into());
            };
            let mut path = path
                .with_context(|| format!("read line {} of {}", path_idx + 1, source.display()))?
                .trim()
                .to_string();
            while path.ends_with(';') {
                let Some((_, next)) = lines.next() else { break };
                let next = next.with_context(|| format!("read {}", source.display()))?;
                path.pop();
                path.push(',');
                path.push_str(next.trim());
            }

            let number = node_number(name).ok_or_else(|| RefineError::MalformedRecord {
                path: source.to_path_buf(),
                line: idx + 1,
                reason: format!("'{name}' is not a NODE_<n> name"),
            })?;
            let segments: Vec<&str> = path.split(',').filter(|s| !s.is_empty()).collect();
            let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
                return Err(RefineError::MalformedRecord {
                    path: source.to_path_buf(),
                    line: path_idx + 1,
                    reason: format!("empty path for '{name}'"),
                }
                .into());
            };

            let vertex = match by_number.get(&number) {
                Some(&vertex) => vertex,
                None => {
                    let vertex = paths.vertices.len();
                    by_number.insert(number, vertex);
                    paths.vertices.push((number, name.to_string()));
                    paths.ends.push((first.to_string(), last.to_string()));
                    vertex
                }
            };
            for segment in segments {
                paths
                    .segment_contigs
                    .entry(segment.to_string())
                    .or_default()
                    .insert(vertex);
            }
        }
        Ok(paths)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open contig paths {}", path.display()))?;
        Self::parse(BufReader::new(file), path)
    }
}

/// Symmetric links between oriented segments from the `L` lines of a GFA file.
pub fn parse_gfa_links<R: BufRead>(reader: R, source: &Path) -> Result<HashMap<String, HashSet<String>>> {
    let mut links: HashMap<String, HashSet<String>> = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} of {}", idx + 1, source.display()))?;
        if !line.starts_with('L') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(RefineError::MalformedRecord {
                path: source.to_path_buf(),
                line: idx + 1,
                reason: "link line needs at least 5 fields".to_string(),
            }
            .into());
        }
        let from = format!("{}{}", fields[1], fields[2]);
        let to = format!("{}{}", fields[3], fields[4]);
        links.entry(from.clone()).or_default().insert(to.clone());
        links.entry(to).or_default().insert(from);
    }
    Ok(links)
}

fn flip(segment: &str) -> String {
    match segment.strip_suffix('+') {
        Some(id) => format!("{id}-"),
        None => format!("{}+", segment.trim_end_matches('-')),
    }
}

/// Contig adjacencies implied by links touching either end of each contig.
pub fn derive_edges(paths: &ContigPaths, links: &HashMap<String, HashSet<String>>) -> Vec<(ContigId, ContigId)> {
    let mut edges = Vec::new();
    for (vertex, (start, end)) in paths.ends.iter().enumerate() {
        let ends = [start.clone(), flip(start), end.clone(), flip(end)];
        for linked in ends.iter().filter_map(|segment| links.get(segment)).flatten() {
            let Some(users) = paths.segment_contigs.get(linked) else {
                continue;
            };
            for &other in users {
                if other != vertex {
                    edges.push((vertex, other));
                }
            }
        }
    }
    edges
}

/// Builds the contig table and assembly graph from the three SPAdes files.
pub fn load_spades(contigs_path: &Path, graph_path: &Path, paths_path: &Path) -> Result<(ContigTable, AssemblyGraph)> {
    let headers = read_contig_headers(contigs_path)?;
    let paths = ContigPaths::read(paths_path)?;
    info!("Total number of contigs available: {}", paths.vertices.len());

    let mut contigs = ContigTable::with_capacity(paths.vertices.len());
    for (number, name) in &paths.vertices {
        let header = headers
            .get(number)
            .ok_or_else(|| RefineError::UnknownContig { name: name.clone() })?;
        contigs.push(
            name.clone(),
            Contig {
                number: *number,
                length: header.length,
                coverage: header.coverage,
            },
        )?;
    }

    let file = File::open(graph_path).with_context(|| format!("open assembly graph {}", graph_path.display()))?;
    let links = parse_gfa_links(BufReader::new(file), graph_path)?;
    let edges = derive_edges(&paths, &links);
    let graph = AssemblyGraph::from_edges(contigs.len(), &edges)?;
    info!("Total number of edges in the assembly graph: {}", graph.num_edges());
    Ok((contigs, graph))
}
