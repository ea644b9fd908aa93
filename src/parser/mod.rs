//! Edge-list parser for command-line arguments
//!
//! Each argument is one edge written as `FROM-TO`, e.g. `0-1 1-2 2-0`.
//! Vertex indices are non-negative decimal integers.

use std::fmt;

use crate::graph::{Edge, Graph, GraphError};

/// Parse error with the offending argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based position of the argument in the edge list
    pub position: usize,
    pub message: String,
    pub argument: String,
}

impl ParseError {
    pub fn new(position: usize, message: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            argument: argument.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.argument.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(
                f,
                "edge {} '{}': {}",
                self.position, self.argument, self.message
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a single `FROM-TO` edge.
pub fn parse_edge(s: &str) -> Result<Edge, String> {
    let s = s.trim();
    let (from, to) = s
        .split_once('-')
        .ok_or_else(|| format!("expected FROM-TO, got '{}'", s))?;

    let from = parse_vertex(from)?;
    let to = parse_vertex(to)?;
    Ok(Edge::new(from, to))
}

fn parse_vertex(s: &str) -> Result<i32, String> {
    if s.is_empty() {
        return Err("missing vertex index".to_string());
    }
    // Reject signs explicitly: '-' is the separator and negative indices
    // collide with the slot sentinel.
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid vertex index: '{}'", s));
    }
    s.parse::<i32>()
        .map_err(|_| format!("vertex index out of range: '{}'", s))
}

/// Parse every argument into an edge list, stopping at the first bad one.
pub fn parse_edges<S: AsRef<str>>(args: &[S]) -> Result<Vec<Edge>, ParseError> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| {
            let arg = arg.as_ref();
            parse_edge(arg).map_err(|msg| ParseError::new(i + 1, msg, arg))
        })
        .collect()
}

/// Parse arguments and build the validated graph.
pub fn parse_graph<S: AsRef<str>>(args: &[S]) -> Result<Graph, ParseError> {
    let edges = parse_edges(args)?;
    Graph::new(edges).map_err(|e| match e {
        GraphError::Empty => ParseError::new(0, "no edges given", ""),
        other => ParseError::new(0, other.to_string(), ""),
    })
}
