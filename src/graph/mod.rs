//! Graph model: edges, colors, candidate solutions and conflict detection

pub mod coloring;
pub mod types;

// Re-export commonly used types
pub use coloring::{Graph, GraphError};
pub use types::{CandidateSolution, Edge, SLOT_EDGES};
