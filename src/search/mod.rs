//! The two roles of the coloring search and the launcher that runs them
//!
//! - Generator: random colorings in, conflict lists out through the ring
//! - Supervisor: owns the ring, keeps the best candidate, stops on a valid
//!   coloring
//! - Launch: one supervisor plus N generator child processes

pub mod config;
pub mod generator;
pub mod launch;
pub mod result;
pub mod supervisor;

pub use config::{GeneratorConfig, LaunchConfig, SupervisorConfig};
pub use generator::run_generator;
pub use launch::run_solve;
pub use result::{GeneratorReport, SupervisorReport};
pub use supervisor::run_supervisor;
