//! Structural calls: nodes, edges, clocks, layouts and node attributes.

use crate::types::{
    ClockId, ClockSpec, Command, EdgeId, EdgeSpec, Instance, NodeId, NodeSpec, TraceError,
    TraceResult,
};

use super::Recorder;

impl Recorder {
    /// Create a node with the next free id.
    pub fn new_node(&mut self, spec: NodeSpec) -> TraceResult<NodeId> {
        self.create_node(spec, None)
    }

    /// Create a node with an explicit id.
    pub fn new_node_with_id(&mut self, id: NodeId, spec: NodeSpec) -> TraceResult<NodeId> {
        self.create_node(spec, Some(id))
    }

    fn create_node(&mut self, spec: NodeSpec, explicit: Option<NodeId>) -> TraceResult<NodeId> {
        let id = self.topology.check_node(&spec, explicit)?;
        let instance = match spec.instance {
            Instance::Fixed(instance) => instance,
            Instance::Auto => self.storage.instance_for(&spec.name),
        };
        let command = Command::NewNode {
            id,
            name: spec.name.clone(),
            parent: spec.parent,
            instance,
        };
        self.dispatch(command, spec.persistent)?;
        self.topology
            .insert_node(id, &spec, instance, explicit.is_some());
        self.storage.index_node(&spec.name, instance);
        Ok(id)
    }

    /// Create an edge with the next free id.
    pub fn new_edge(&mut self, spec: EdgeSpec) -> TraceResult<EdgeId> {
        self.create_edge(spec, None)
    }

    /// Create an edge with an explicit id.
    pub fn new_edge_with_id(&mut self, id: EdgeId, spec: EdgeSpec) -> TraceResult<EdgeId> {
        self.create_edge(spec, Some(id))
    }

    fn create_edge(&mut self, spec: EdgeSpec, explicit: Option<EdgeId>) -> TraceResult<EdgeId> {
        let id = self.topology.check_edge(&spec, explicit)?;
        let command = Command::NewEdge {
            id,
            source: spec.source,
            destination: spec.destination,
            bandwidth: spec.bandwidth,
            latency: spec.latency,
            name: spec.name.clone(),
        };
        self.dispatch(command, spec.persistent)?;
        self.topology.insert_edge(id, &spec, explicit.is_some());
        Ok(id)
    }

    /// Create a clock domain. Ids start at 1; domain 0 is the default clock.
    pub fn new_clock(&mut self, spec: ClockSpec) -> TraceResult<ClockId> {
        let id = self.topology.check_clock(&spec)?;
        let command = Command::NewClock {
            id,
            frequency: spec.frequency,
            skew: spec.skew,
            divisions: spec.divisions,
            name: spec.name.clone(),
        };
        self.dispatch(command, spec.persistent)?;
        self.topology.insert_clock(id, &spec);
        Ok(id)
    }

    /// Attach `node` to a clock domain.
    pub fn set_node_clock(
        &mut self,
        node: NodeId,
        clock: ClockId,
        persistent: bool,
    ) -> TraceResult<()> {
        self.topology.node(node)?;
        if !self.topology.has_clock(clock) {
            return Err(TraceError::ClockNotFound(clock));
        }
        self.dispatch(Command::SetNodeClock { node, clock }, persistent)?;
        self.topology.node_mut(node)?.clock = clock;
        Ok(())
    }

    /// Give `node` its multi-dimensional slot layout. Can be set once.
    pub fn set_node_layout(
        &mut self,
        node: NodeId,
        dimensions: &[u32],
        persistent: bool,
    ) -> TraceResult<()> {
        let layout = self.topology.check_layout(node, dimensions)?;
        let command = Command::SetNodeLayout {
            node,
            dimensions: dimensions.to_vec(),
        };
        self.dispatch(command, persistent)?;

        let info = self.topology.node_mut(node)?;
        if info.autoflush {
            self.autoflush.register(node, layout.clone(), info.relaxed);
        }
        info.layout = Some(layout);
        Ok(())
    }

    /// One-dimensional layout of `capacity` slots.
    pub fn set_node_capacity(
        &mut self,
        node: NodeId,
        capacity: u32,
        persistent: bool,
    ) -> TraceResult<()> {
        self.set_node_layout(node, &[capacity], persistent)
    }

    pub fn set_node_input_bandwidth(
        &mut self,
        node: NodeId,
        bandwidth: u32,
        persistent: bool,
    ) -> TraceResult<()> {
        self.topology.node(node)?;
        self.dispatch(Command::SetNodeInputBandwidth { node, bandwidth }, persistent)?;
        self.topology.node_mut(node)?.input_bandwidth = Some(bandwidth);
        Ok(())
    }

    pub fn set_node_output_bandwidth(
        &mut self,
        node: NodeId,
        bandwidth: u32,
        persistent: bool,
    ) -> TraceResult<()> {
        self.topology.node(node)?;
        self.dispatch(Command::SetNodeOutputBandwidth { node, bandwidth }, persistent)?;
        self.topology.node_mut(node)?.output_bandwidth = Some(bandwidth);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::RecorderConfig;
    use super::*;
    use tempfile::tempdir;

    fn recorder() -> (tempfile::TempDir, Recorder) {
        let dir = tempdir().unwrap();
        let recorder = Recorder::new(RecorderConfig::new(dir.path().join("t.ptr")));
        (dir, recorder)
    }

    #[test]
    fn test_node_ids_and_auto_instance() {
        let (_dir, mut rec) = recorder();
        assert_eq!(rec.new_node(NodeSpec::new("alu")).unwrap(), 0);
        assert_eq!(rec.new_node(NodeSpec::new("alu").auto_instance()).unwrap(), 1);
        assert_eq!(rec.new_node(NodeSpec::new("alu").auto_instance()).unwrap(), 2);
        assert_eq!(rec.topology().node(2).unwrap().instance, 2);
        assert_eq!(rec.topology().node(0).unwrap().instance, 0);
    }

    #[test]
    fn test_failed_call_changes_nothing() {
        let (_dir, mut rec) = recorder();
        let long = "n".repeat(2000);
        assert!(matches!(
            rec.new_node(NodeSpec::new(long)),
            Err(TraceError::NameTooLong { .. })
        ));
        assert!(matches!(
            rec.new_edge(EdgeSpec::new(0, 1, "e")),
            Err(TraceError::NodeNotFound(0))
        ));
        assert_eq!(rec.topology().node_count(), 0);
        assert_eq!(rec.stats().commands_dropped, 0);
    }

    #[test]
    fn test_layout_once() {
        let (_dir, mut rec) = recorder();
        let node = rec.new_node(NodeSpec::new("rob")).unwrap();
        rec.set_node_capacity(node, 32, false).unwrap();
        assert!(matches!(
            rec.set_node_layout(node, &[4, 8], false),
            Err(TraceError::LayoutAlreadySet(_))
        ));
        assert!(matches!(
            rec.set_node_layout(9, &[1], false),
            Err(TraceError::NodeNotFound(9))
        ));
    }

    #[test]
    fn test_clock_assignment() {
        let (_dir, mut rec) = recorder();
        let node = rec.new_node(NodeSpec::new("core")).unwrap();
        let clock = rec.new_clock(ClockSpec::new(2_000_000_000, "fast")).unwrap();
        assert_eq!(clock, 1);
        rec.set_node_clock(node, clock, false).unwrap();
        assert_eq!(rec.topology().node(node).unwrap().clock, 1);
        assert!(matches!(
            rec.set_node_clock(node, 7, false),
            Err(TraceError::ClockNotFound(7))
        ));
    }
}
