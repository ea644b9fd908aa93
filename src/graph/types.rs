//! Core value types shared by generators and the supervisor

use std::fmt;

/// Maximum number of conflicting edges carried by one candidate.
///
/// This is a protocol constant: both sides of the ring agree on it because it
/// fixes the width of a slot.
pub const SLOT_EDGES: usize = 8;

/// An edge between two vertex indices.
///
/// The layout is shared with the mapped ring, so it must stay `repr(C)` with
/// two `i32` fields.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: i32,
    pub to: i32,
}

impl Edge {
    /// Padding value marking an unused slot position.
    pub const SENTINEL: Edge = Edge { from: -1, to: -1 };

    pub const fn new(from: i32, to: i32) -> Self {
        Edge { from, to }
    }

    /// An entry is real iff neither endpoint is the sentinel value.
    pub fn is_real(&self) -> bool {
        self.from != -1 && self.to != -1
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// One of the three colors a vertex can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Blue];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Blue => write!(f, "blue"),
        }
    }
}

/// The conflicting edges found under one coloring attempt, capped at
/// [`SLOT_EDGES`]. An empty candidate is a valid 3-coloring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSolution {
    edges: Vec<Edge>,
}

impl CandidateSolution {
    pub fn new() -> Self {
        Self {
            edges: Vec::with_capacity(SLOT_EDGES),
        }
    }

    /// Build a candidate from at most [`SLOT_EDGES`] edges.
    ///
    /// Returns `None` if more edges are supplied than a slot can hold.
    #[cfg(test)]
    pub fn from_edges(edges: &[Edge]) -> Option<Self> {
        if edges.len() > SLOT_EDGES {
            return None;
        }
        Some(Self {
            edges: edges.to_vec(),
        })
    }

    /// Append an edge. Returns false (and drops the edge) once the cap is hit.
    pub fn push(&mut self, edge: Edge) -> bool {
        if self.is_full() {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.edges.len() >= SLOT_EDGES
    }

    /// True when this candidate describes a valid coloring.
    pub fn is_valid_coloring(&self) -> bool {
        self.is_empty()
    }
}

impl fmt::Display for CandidateSolution {
    /// Renders `Solution with N edge(s): F-T F-T ...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.len() == 1 { "edge" } else { "edges" };
        write!(f, "Solution with {} {}:", self.len(), noun)?;
        for edge in &self.edges {
            write!(f, " {}", edge)?;
        }
        Ok(())
    }
}
