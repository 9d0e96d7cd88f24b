//! Registry of the simulated structure: nodes, edges and clock domains.

use std::collections::BTreeMap;

use crate::types::{
    ClockId, ClockSpec, EdgeId, EdgeSpec, NodeId, NodeSpec, TraceError, TraceResult,
    DEFAULT_CLOCK, MAX_DIMENSIONS,
};

use super::layout::Layout;

/// A created node and its attributes.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub parent: Option<NodeId>,
    pub instance: u16,
    pub layout: Option<Layout>,
    pub clock: ClockId,
    pub autoflush: bool,
    pub relaxed: bool,
    pub input_bandwidth: Option<u32>,
    pub output_bandwidth: Option<u32>,
}

/// A created edge.
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    pub name: String,
    pub source: NodeId,
    pub destination: NodeId,
    pub bandwidth: u32,
    pub latency: u32,
}

/// A created clock domain.
#[derive(Debug, Clone)]
pub struct ClockInfo {
    pub name: String,
    pub frequency: u64,
    pub skew: u16,
    pub divisions: u16,
}

/// Every node, edge and clock defined so far, with id allocation.
///
/// Auto-assigned ids count upwards and skip ids already taken by explicit
/// definitions. Node and edge ids start at 0, clock ids at 1 since the
/// default clock domain 0 always exists.
#[derive(Debug)]
pub struct Topology {
    nodes: BTreeMap<NodeId, NodeInfo>,
    edges: BTreeMap<EdgeId, EdgeInfo>,
    clocks: BTreeMap<ClockId, ClockInfo>,
    next_node: u32,
    next_edge: u32,
    next_clock: u32,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

/// Next free id at or after `counter`, without advancing it.
fn peek_free<V>(map: &BTreeMap<u16, V>, counter: u32, kind: &'static str) -> TraceResult<u16> {
    (counter..=u16::MAX as u32)
        .map(|id| id as u16)
        .find(|id| !map.contains_key(id))
        .ok_or(TraceError::IdSpaceExhausted(kind))
}

impl Topology {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            clocks: BTreeMap::new(),
            next_node: 0,
            next_edge: 0,
            next_clock: DEFAULT_CLOCK as u32 + 1,
        }
    }

    /// Check `spec` and resolve the node id without registering anything.
    pub fn check_node(&self, spec: &NodeSpec, id: Option<NodeId>) -> TraceResult<NodeId> {
        spec.validate()?;
        if let Some(parent) = spec.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(TraceError::NodeNotFound(parent));
            }
        }
        match id {
            Some(id) if self.nodes.contains_key(&id) => Err(TraceError::DuplicateNode(id)),
            Some(id) => Ok(id),
            None => peek_free(&self.nodes, self.next_node, "node"),
        }
    }

    /// Register a node checked by [`check_node`](Self::check_node).
    pub fn insert_node(&mut self, id: NodeId, spec: &NodeSpec, instance: u16, explicit: bool) {
        if !explicit {
            self.next_node = id as u32 + 1;
        }
        self.nodes.insert(
            id,
            NodeInfo {
                name: spec.name.clone(),
                parent: spec.parent,
                instance,
                layout: None,
                clock: DEFAULT_CLOCK,
                autoflush: spec.autoflush,
                relaxed: spec.relaxed,
                input_bandwidth: None,
                output_bandwidth: None,
            },
        );
    }

    /// Check `spec` and resolve the edge id without registering anything.
    pub fn check_edge(&self, spec: &EdgeSpec, id: Option<EdgeId>) -> TraceResult<EdgeId> {
        spec.validate()?;
        for node in [spec.source, spec.destination] {
            if !self.nodes.contains_key(&node) {
                return Err(TraceError::NodeNotFound(node));
            }
        }
        match id {
            Some(id) if self.edges.contains_key(&id) => Err(TraceError::DuplicateEdge(id)),
            Some(id) => Ok(id),
            None => peek_free(&self.edges, self.next_edge, "edge"),
        }
    }

    /// Register an edge checked by [`check_edge`](Self::check_edge).
    pub fn insert_edge(&mut self, id: EdgeId, spec: &EdgeSpec, explicit: bool) {
        if !explicit {
            self.next_edge = id as u32 + 1;
        }
        self.edges.insert(
            id,
            EdgeInfo {
                name: spec.name.clone(),
                source: spec.source,
                destination: spec.destination,
                bandwidth: spec.bandwidth,
                latency: spec.latency,
            },
        );
    }

    /// Check `spec` and resolve the next clock id without registering it.
    pub fn check_clock(&self, spec: &ClockSpec) -> TraceResult<ClockId> {
        spec.validate()?;
        let mut taken = self.clocks.keys().copied().collect::<Vec<_>>();
        taken.push(DEFAULT_CLOCK);
        (self.next_clock..=u16::MAX as u32)
            .map(|id| id as u16)
            .find(|id| !taken.contains(id))
            .ok_or(TraceError::IdSpaceExhausted("clock"))
    }

    /// Register a clock checked by [`check_clock`](Self::check_clock).
    pub fn insert_clock(&mut self, id: ClockId, spec: &ClockSpec) {
        self.next_clock = id as u32 + 1;
        self.clocks.insert(
            id,
            ClockInfo {
                name: spec.name.clone(),
                frequency: spec.frequency,
                skew: spec.skew,
                divisions: spec.divisions,
            },
        );
    }

    pub fn node(&self, id: NodeId) -> TraceResult<&NodeInfo> {
        self.nodes.get(&id).ok_or(TraceError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> TraceResult<&mut NodeInfo> {
        self.nodes.get_mut(&id).ok_or(TraceError::NodeNotFound(id))
    }

    pub fn edge(&self, id: EdgeId) -> TraceResult<&EdgeInfo> {
        self.edges.get(&id).ok_or(TraceError::EdgeNotFound(id))
    }

    pub fn clock(&self, id: ClockId) -> Option<&ClockInfo> {
        self.clocks.get(&id)
    }

    /// Whether `id` names a clock domain, including the default one.
    pub fn has_clock(&self, id: ClockId) -> bool {
        id == DEFAULT_CLOCK || self.clocks.contains_key(&id)
    }

    /// Check that a layout can be set on `node` and build it.
    pub fn check_layout(&self, node: NodeId, dims: &[u32]) -> TraceResult<Layout> {
        if self.node(node)?.layout.is_some() {
            return Err(TraceError::LayoutAlreadySet(node));
        }
        Layout::new(node, dims)
    }

    /// Check that `position` is valid on `node`.
    ///
    /// Nodes without a layout accept any position up to the dimension limit,
    /// except autoflush nodes, which need a layout.
    pub fn check_position(&self, node: NodeId, position: &[u32]) -> TraceResult<()> {
        let info = self.node(node)?;
        match &info.layout {
            Some(layout) => layout.validate(node, position),
            None if info.autoflush => Err(TraceError::MissingLayout(node)),
            None if position.len() > MAX_DIMENSIONS => Err(TraceError::TooManyDimensions {
                got: position.len(),
                max: MAX_DIMENSIONS,
            }),
            None => Ok(()),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of user-defined clocks (the default domain is not counted).
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    /// Iterate over all nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeInfo)> {
        self.nodes.iter().map(|(&id, info)| (id, info))
    }
}
