//! The simulated structure: nodes, edges, clock domains and node layouts.

pub mod layout;
pub mod topology;

pub use layout::Layout;
pub use topology::{ClockInfo, EdgeInfo, NodeInfo, Topology};
