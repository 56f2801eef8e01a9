//! vseq - vector-sequence similarity search
//!
//! vseq retrieves the top-k base sequences most similar to a query
//! sequence of vectors under MAXSIM, DTW, or SDTW. Exact scoring is
//! quadratic per candidate pair, so the engine funnels every query
//! through two phases: graph-based candidate generation over individual
//! vectors, then exact rerank of the surviving sequences.
//!
//! # Core Design
//!
//! - **One graph, three variants**: a hierarchical proximity graph over
//!   all base vectors backs both the set-graph index (per-query-vector
//!   kNN) and the sequence-graph index (a joint DP over the graph that
//!   mirrors the DTW recurrence); brute force serves as the exact
//!   baseline.
//! - **Borrowed data**: indexes never copy vectors; they hold a borrow of
//!   the loaded dataset for their whole lifetime.
//! - **Amortized scratch**: visited sets use generation tags instead of
//!   per-query clears, and the DP's distance table doubles as a rerank
//!   cache.
//!
//! # Example
//!
//! ```no_run
//! use vseq::{HnswParams, IndexVariant, SeqGraphConfig, SequenceDataset, SimMetric, VssIndex};
//!
//! # fn main() -> vseq::Result<()> {
//! let base = SequenceDataset::load(128, "data/base.fvecs", "data/base.lens")?;
//!
//! let mut index = VssIndex::build(
//!     &base,
//!     SimMetric::Dtw,
//!     IndexVariant::SeqGraph(SeqGraphConfig::default().with_unlink_same_seq(true)),
//!     HnswParams::with_m(16).with_ef_construction(200),
//! )?;
//!
//! let query: Vec<f32> = vec![0.0; 128 * 5]; // five query vectors
//! for hit in index.search(&query, 10, 100)? {
//!     println!("sid={} dist={}", hit.sid, hit.dist);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod brute_force;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod hnsw;
pub mod index;
pub mod mapping;
pub mod metric;
pub mod rerank;
pub mod runner;
pub mod seq_graph;
pub mod set_graph;
pub mod visited;

pub use brute_force::BruteForceIndex;
pub use dataset::{read_groundtruth, SequenceDataset};
pub use distance::VectorDistance;
pub use error::{Error, Result};
pub use hnsw::{GraphMetrics, HnswBuilder, HnswGraph, HnswParams};
pub use index::{IndexVariant, VssIndex};
pub use mapping::{Lid, SequenceMap, Sid, Vid};
pub use metric::SimMetric;
pub use rerank::Neighbor;
pub use runner::{QueryRecord, Runner};
pub use seq_graph::{SeqGraphConfig, SeqGraphIndex};
pub use set_graph::SetGraphIndex;
