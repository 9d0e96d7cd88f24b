//! The recorder: the single entry point a simulator talks to.
//!
//! A [`Recorder`] validates each call, keeps the structure registry and the
//! autoflush and tag caches current, and routes the resulting commands
//! either to the encoder (while on) or to the replay storage (while off).

pub mod config;
pub mod events;
pub mod stats;
pub mod structure;

pub use config::{RecorderConfig, AUTOCOMPRESS_ENV};
pub use stats::RecorderStats;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::engine::{AutoflushTable, CommandStorage, EdgeBandwidth, NodeTagCache};
use crate::format::{AsciiEncoder, BinaryEncoder, TraceEncoder};
use crate::graph::Topology;
use crate::types::{ClockId, ClockPhase, Command, EdgeId, ItemId, TraceResult};

/// Records the behavior of a simulated machine into a trace file.
///
/// The recorder starts off, with no file open. The first `turn_on` opens
/// the configured file and replays everything stored so far.
pub struct Recorder {
    config: RecorderConfig,
    encoder: Box<dyn TraceEncoder>,
    storage: CommandStorage,
    topology: Topology,
    autoflush: AutoflushTable,
    bandwidth: Option<EdgeBandwidth>,
    tag_cache: NodeTagCache,
    /// Non-persistent items created while off and not yet deleted.
    live_items: BTreeSet<ItemId>,
    next_item: ItemId,
    on: bool,
    current_cycle: u64,
    last_clock_cycle: Option<(ClockId, u64, ClockPhase)>,
    embedded_archive: Option<Vec<u8>>,
    stats: RecorderStats,
}

fn make_encoder(ascii: bool, buffer_size: usize) -> Box<dyn TraceEncoder> {
    if ascii {
        Box::new(AsciiEncoder::new(buffer_size))
    } else {
        Box::new(BinaryEncoder::new(buffer_size))
    }
}

impl Recorder {
    /// Create a recorder from an explicit configuration.
    pub fn new(config: RecorderConfig) -> Self {
        let encoder = make_encoder(config.ascii, config.buffer_size);
        let bandwidth = config.track_bandwidth.then(EdgeBandwidth::new);
        Self {
            encoder,
            storage: CommandStorage::new(),
            topology: Topology::new(),
            autoflush: AutoflushTable::new(),
            bandwidth,
            tag_cache: NodeTagCache::new(),
            live_items: BTreeSet::new(),
            next_item: 1,
            on: false,
            current_cycle: 0,
            last_clock_cycle: None,
            embedded_archive: None,
            stats: RecorderStats::default(),
            config,
        }
    }

    /// Create a recorder writing to `path` with the default configuration
    /// and the environment applied.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(RecorderConfig::new(path).with_env())
    }

    /// Encode `command` if on, store it if persistent, or drop it.
    ///
    /// Returns whether the command was encoded or stored.
    pub(crate) fn dispatch(&mut self, command: Command, persistent: bool) -> TraceResult<bool> {
        if self.on {
            self.encoder.encode(&command)?;
            self.stats.commands_encoded += 1;
            if persistent {
                self.storage.store(command, false);
                self.stats.commands_stored += 1;
            }
            return Ok(true);
        }
        // Stored creations are replayed; a deletion of either kind ends
        // the item's liveness.
        match &command {
            Command::NewItem { id } if !persistent => {
                self.live_items.insert(*id);
            }
            Command::DeleteItem { id } => {
                self.live_items.remove(id);
            }
            _ => {}
        }
        if persistent {
            self.storage.store(command, true);
            self.stats.commands_stored += 1;
            return Ok(true);
        }
        self.stats.commands_dropped += 1;
        Ok(false)
    }

    /// Start encoding.
    ///
    /// Opens the output on first use (or after a file or mode change) and
    /// replays every stored command; otherwise replays only what was stored
    /// while off. Items created while off are then announced with NewItem.
    pub fn turn_on(&mut self) -> TraceResult<()> {
        if self.on {
            warn!("turn_on called while tracing is already on");
            return Ok(());
        }

        let replayed = if self.encoder.is_open() {
            self.storage.dump_partial(self.encoder.as_mut())?
        } else {
            self.encoder
                .begin(&self.config.file_name, self.config.compressed)?;
            self.autoflush.reset_announcements();
            self.storage.dump_all(self.encoder.as_mut())?
        };
        self.stats.commands_encoded += replayed as u64;
        self.stats.replays += 1;
        self.storage.clear_partial();

        for &id in &self.live_items {
            self.encoder.encode(&Command::NewItem { id })?;
            self.stats.commands_encoded += 1;
            self.stats.items_replayed += 1;
        }
        debug!("Announced {} items created while off", self.live_items.len());
        self.live_items.clear();

        self.on = true;
        info!(
            "Tracing on: {} ({} encoder)",
            self.config.file_name.display(),
            self.encoder.name()
        );
        Ok(())
    }

    /// Stop encoding. Persistent commands keep being stored.
    pub fn turn_off(&mut self) -> TraceResult<()> {
        if !self.on {
            warn!("turn_off called while tracing is already off");
            return Ok(());
        }
        self.on = false;
        self.encoder.flush()?;
        info!("Tracing off at cycle {}", self.current_cycle);
        Ok(())
    }

    /// Direct the next `turn_on` to a new file. Only allowed while off.
    ///
    /// The new file receives the full replay, so it describes the whole
    /// structure on its own.
    pub fn change_file_name(&mut self, path: impl AsRef<Path>) -> TraceResult<()> {
        if self.on {
            warn!("change_file_name ignored while tracing is on");
            return Ok(());
        }
        self.encoder.close()?;
        self.config.file_name = path.as_ref().to_path_buf();
        self.tag_cache.clear();
        Ok(())
    }

    /// Switch between the text and binary encodings. Only allowed while off.
    pub fn set_ascii_mode(&mut self, ascii: bool) -> TraceResult<()> {
        if self.on {
            warn!("set_ascii_mode ignored while tracing is on");
            return Ok(());
        }
        if self.config.ascii == ascii {
            return Ok(());
        }
        self.encoder.close()?;
        self.encoder = make_encoder(ascii, self.config.buffer_size);
        self.config.ascii = ascii;
        self.tag_cache.clear();
        Ok(())
    }

    /// Blob written as a COMMENTBIN just before the next StartActivity.
    pub fn set_embedded_archive(&mut self, archive: Vec<u8>) {
        self.embedded_archive = Some(archive);
    }

    /// Push buffered bytes to the file.
    pub fn flush(&mut self) -> TraceResult<()> {
        self.encoder.flush()
    }

    /// Finish the file and turn tracing off.
    ///
    /// A later `turn_on` starts the file over with a full replay.
    pub fn close(&mut self) -> TraceResult<()> {
        self.on = false;
        self.encoder.close()
    }

    /// Highest per-cycle item count seen on `edge`, when bandwidth tracking
    /// is enabled and the edge has carried items.
    pub fn edge_max_bandwidth(&self, edge: EdgeId) -> Option<u32> {
        self.bandwidth.as_ref()?.max(edge)
    }

    /// Counters collected since creation.
    pub fn stats(&self) -> &RecorderStats {
        &self.stats
    }

    /// The active configuration.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Nodes, edges and clocks declared so far.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Whether commands are currently encoded.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Cycle number of the last processed cycle call.
    pub fn current_cycle(&self) -> u64 {
        self.current_cycle
    }

    /// Items created while off that will be announced on `turn_on`.
    pub fn live_items(&self) -> &BTreeSet<ItemId> {
        &self.live_items
    }

    /// Number of persistent commands held for replay.
    pub fn stored_commands(&self) -> usize {
        self.storage.len()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.encoder.close() {
            warn!("Failed to close trace on drop: {}", e);
        }
    }
}
