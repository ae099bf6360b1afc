//! # colonyspace
//!
//! Structure analysis for agent-based cell colony simulations.
//!
//! Per-tick neighbor tables become undirected graphs ([`graph`]), which are
//! split into singles and clusters ([`components`]) and described by degree,
//! centrality and distance measures ([`measures`]). Cell centroids are
//! clustered independently of the graph ([`clustering`]) and summarised with
//! point-pattern statistics ([`spatial`]). Simulated feature distributions are
//! compared with a reference population by two-sample KS tests ([`ks`]).
//!
//! [`builder::ColonyAnalysisBuilder`] configures a batch run over many
//! (key, seed, tick) units; see [`pipeline`].
//!
//! ```ignore
//! use colonyspace::builder::ColonyAnalysisBuilder;
//!
//! let analysis = ColonyAnalysisBuilder::new()
//!     .with_hopkins(10, 42)
//!     .build()?;
//! let report = analysis.run(records);
//! for row in report.metrics_rows() {
//!     println!("{} {} {:?}", row.key, row.tick, row.diameter);
//! }
//! ```

pub mod builder;
pub mod clustering;
pub mod components;
pub mod errors;
pub mod graph;
pub mod ks;
pub mod measures;
pub mod pipeline;
pub mod records;
pub mod spatial;
pub mod summary;

pub use builder::ColonyAnalysisBuilder;
pub use errors::{AnalysisError, Result};
pub use graph::{GraphBuilder, NeighborGraph};
pub use pipeline::{AnalysisReport, ColonyAnalysis};
pub use records::{AdjacencyRecord, Neighbor};

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
