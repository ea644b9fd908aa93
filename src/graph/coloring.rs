//! Random colorings and conflict detection
//!
//! Vertex indices in the input are arbitrary non-negative integers. A [`Graph`]
//! maps them onto a dense `0..n` range once, so each coloring attempt is a
//! plain vector of colors.

use crate::graph::types::{CandidateSolution, Color, Edge};
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has no edges")]
    Empty,
    #[error("edge {0} uses a negative vertex index")]
    NegativeVertex(Edge),
}

/// A fixed, validated edge list together with its distinct vertices.
#[derive(Debug, Clone)]
pub struct Graph {
    edges: Vec<Edge>,
    /// Distinct vertex labels, sorted; position is the dense index.
    vertices: Vec<i32>,
    /// Dense endpoints of each edge, parallel to `edges`.
    endpoints: Vec<(usize, usize)>,
}

impl Graph {
    pub fn new(edges: Vec<Edge>) -> Result<Self, GraphError> {
        if edges.is_empty() {
            return Err(GraphError::Empty);
        }
        if let Some(bad) = edges.iter().find(|e| e.from < 0 || e.to < 0) {
            return Err(GraphError::NegativeVertex(*bad));
        }

        let mut vertices: Vec<i32> = edges.iter().flat_map(|e| [e.from, e.to]).collect();
        vertices.sort_unstable();
        vertices.dedup();

        let index: HashMap<i32, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();
        let endpoints = edges
            .iter()
            .map(|e| (index[&e.from], index[&e.to]))
            .collect();

        Ok(Self {
            edges,
            vertices,
            endpoints,
        })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> &[i32] {
        &self.vertices
    }

    /// Assign every distinct vertex an independent, uniformly random color.
    pub fn random_coloring<R: Rng>(&self, rng: &mut R) -> Coloring {
        let colors = (0..self.vertices.len())
            .map(|_| Color::ALL[rng.random_range(0..Color::ALL.len())])
            .collect();
        Coloring { colors }
    }

    /// Scan every edge in list order and collect the ones whose endpoints
    /// share a color.
    ///
    /// Only the first [`SLOT_EDGES`](crate::graph::types::SLOT_EDGES) are
    /// reported; `total` still counts all of them.
    pub fn conflicts(&self, coloring: &Coloring) -> Conflicts {
        let mut reported = CandidateSolution::new();
        let mut total = 0;
        for (edge, &(a, b)) in self.edges.iter().zip(&self.endpoints) {
            if coloring.colors[a] == coloring.colors[b] {
                reported.push(*edge);
                total += 1;
            }
        }
        Conflicts { reported, total }
    }
}

/// One color per distinct vertex, indexed like [`Graph::vertices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    colors: Vec<Color>,
}

/// Result of checking one coloring against the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflicts {
    /// Capped list that is sent over the ring.
    pub reported: CandidateSolution,
    /// Number of conflicting edges, uncapped.
    pub total: usize,
}

impl Conflicts {
    pub fn truncated(&self) -> bool {
        self.total > self.reported.len()
    }
}
