//! Recording machinery behind the recorder: replay storage, autoflush
//! occupancy, bandwidth accounting and the node-tag cache.

pub mod autoflush;
pub mod bandwidth;
pub mod storage;
pub mod tag_cache;

pub use autoflush::{AutoflushTable, EnterAction, FlushedExit, Occupancy};
pub use bandwidth::EdgeBandwidth;
pub use storage::CommandStorage;
pub use tag_cache::NodeTagCache;
