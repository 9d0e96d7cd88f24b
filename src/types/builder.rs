//! Builders describing nodes, edges and clocks before they are registered.

use super::{NodeId, MAX_NAME_LEN};
use crate::types::error::{TraceError, TraceResult};

/// How the instance number of a new node is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instance {
    /// Use this instance number.
    Fixed(u16),
    /// One more than the highest instance already recorded for the name.
    Auto,
}

/// Check a node, edge or clock name against the format limit.
pub(crate) fn validate_name(name: &str) -> TraceResult<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(TraceError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Description of a node to create.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub parent: Option<NodeId>,
    pub instance: Instance,
    /// Occupancy is closed automatically between cycles.
    pub autoflush: bool,
    /// Explicit ExitNode is still accepted on an autoflush node.
    pub relaxed: bool,
    pub persistent: bool,
}

impl NodeSpec {
    /// Create a root node description with instance 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            instance: Instance::Fixed(0),
            autoflush: false,
            relaxed: false,
            persistent: false,
        }
    }

    /// Set the parent node.
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set an explicit instance number.
    pub fn instance(mut self, instance: u16) -> Self {
        self.instance = Instance::Fixed(instance);
        self
    }

    /// Pick the instance number from the names already recorded.
    pub fn auto_instance(mut self) -> Self {
        self.instance = Instance::Auto;
        self
    }

    /// Mark the node as autoflush.
    pub fn autoflush(mut self) -> Self {
        self.autoflush = true;
        self
    }

    /// Allow explicit exits on an autoflush node.
    pub fn relaxed(mut self) -> Self {
        self.relaxed = true;
        self
    }

    /// Remember the node for replay.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Validate this node's fields.
    pub fn validate(&self) -> TraceResult<()> {
        validate_name(&self.name)
    }
}

/// Description of an edge to create.
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub source: NodeId,
    pub destination: NodeId,
    /// Maximum items per cycle.
    pub bandwidth: u32,
    /// Latency in cycles.
    pub latency: u32,
    pub name: String,
    pub persistent: bool,
}

impl EdgeSpec {
    /// Create an edge description with bandwidth 1 and latency 1.
    pub fn new(source: NodeId, destination: NodeId, name: impl Into<String>) -> Self {
        Self {
            source,
            destination,
            bandwidth: 1,
            latency: 1,
            name: name.into(),
            persistent: false,
        }
    }

    /// Set the bandwidth.
    pub fn bandwidth(mut self, bandwidth: u32) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Set the latency.
    pub fn latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    /// Remember the edge for replay.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Validate this edge's fields.
    pub fn validate(&self) -> TraceResult<()> {
        validate_name(&self.name)
    }
}

/// Description of a clock domain to create.
#[derive(Debug, Clone)]
pub struct ClockSpec {
    /// Frequency in Hz.
    pub frequency: u64,
    pub skew: u16,
    /// Number of divisions used when displaying the clock.
    pub divisions: u16,
    pub name: String,
    pub persistent: bool,
}

impl ClockSpec {
    /// Create a clock description with no skew and a single division.
    pub fn new(frequency: u64, name: impl Into<String>) -> Self {
        Self {
            frequency,
            skew: 0,
            divisions: 1,
            name: name.into(),
            persistent: false,
        }
    }

    /// Set the skew.
    pub fn skew(mut self, skew: u16) -> Self {
        self.skew = skew;
        self
    }

    /// Set the display divisions.
    pub fn divisions(mut self, divisions: u16) -> Self {
        self.divisions = divisions;
        self
    }

    /// Remember the clock for replay.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Validate this clock's fields.
    pub fn validate(&self) -> TraceResult<()> {
        validate_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_spec_builder() {
        let spec = NodeSpec::new("fetch")
            .parent(3)
            .instance(2)
            .autoflush()
            .relaxed()
            .persistent();
        assert_eq!(spec.name, "fetch");
        assert_eq!(spec.parent, Some(3));
        assert_eq!(spec.instance, Instance::Fixed(2));
        assert!(spec.autoflush && spec.relaxed && spec.persistent);
        assert_eq!(NodeSpec::new("x").auto_instance().instance, Instance::Auto);
    }

    #[test]
    fn test_name_too_long() {
        let spec = NodeSpec::new("n".repeat(MAX_NAME_LEN + 1));
        assert!(matches!(spec.validate(), Err(TraceError::NameTooLong { .. })));
        assert!(EdgeSpec::new(0, 1, "a2b").validate().is_ok());
    }
}
