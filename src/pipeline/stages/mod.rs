//! Built-in stage implementations.

pub mod calo_cells;
pub mod clustering;
pub mod event_reader;
pub mod ntuple;
pub mod raw_ntuple;
pub mod ringer;
pub mod truth;

pub use calo_cells::{CaloCellStage, OptimalFilter, PulseGenerator};
pub use clustering::ClusterStage;
pub use event_reader::EventReaderStage;
pub use ntuple::CaloNtupleStage;
pub use raw_ntuple::RawNtupleStage;
pub use ringer::{RingSet, RingerStage};
pub use truth::TruthStage;

/// Histogram name under a component's `HistogramPath`.
pub(crate) fn histogram_key(path: &str, leaf: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        leaf.to_string()
    } else {
        format!("{path}/{leaf}")
    }
}
