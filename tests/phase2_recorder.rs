//! Phase 2 tests: recorder façade, replay and node-tag compression.

use std::path::Path;

use tempfile::tempdir;

use pipetrace::types::{Command, EdgeSpec, NodeSpec, TagValue, TraceError};
use pipetrace::{Recorder, RecorderConfig, TraceReader};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn read(path: &Path) -> Vec<Command> {
    TraceReader::read_from_file(path)
        .unwrap()
        .into_iter()
        .filter(|c| !matches!(c, Command::DefineTag { .. } | Command::DefineString { .. }))
        .collect()
}

fn node_tags(commands: &[Command]) -> Vec<TagValue> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::SetNodeTag { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect()
}

// ==================== Node-Tag Compression Tests ====================

#[test]
fn test_repeated_node_tag_suppressed() {
    init_logger();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    rec.turn_on().unwrap();
    let node = rec.new_node(NodeSpec::new("fetch")).unwrap();

    rec.set_node_tag(node, "x", 5u32, false).unwrap();
    rec.set_node_tag(node, "x", 5u32, false).unwrap();
    rec.set_node_tag(node, "x", 6u32, false).unwrap();
    rec.close().unwrap();

    let tags = node_tags(&read(&path));
    assert_eq!(tags, vec![TagValue::Int(5), TagValue::Int(6)]);
    assert_eq!(rec.stats().tags_suppressed, 1);
}

#[test]
fn test_positional_node_tags_never_suppressed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pos.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    rec.turn_on().unwrap();
    let node = rec.new_node(NodeSpec::new("rob")).unwrap();
    rec.set_node_capacity(node, 4, false).unwrap();

    rec.set_node_tag_at(node, &[1], "state", "busy", false).unwrap();
    rec.set_node_tag_at(node, &[1], "state", "busy", false).unwrap();
    rec.close().unwrap();

    assert_eq!(node_tags(&read(&path)).len(), 2);
}

#[test]
fn test_autocompress_disabled() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path).autocompress(false));
    rec.turn_on().unwrap();
    let node = rec.new_node(NodeSpec::new("fetch")).unwrap();
    rec.set_node_tag(node, "x", 5u32, false).unwrap();
    rec.set_node_tag(node, "x", 5u32, false).unwrap();
    rec.close().unwrap();

    assert_eq!(node_tags(&read(&path)).len(), 2);
}

#[test]
fn test_dropped_tag_not_remembered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("off.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    let node = rec.new_node(NodeSpec::new("fetch").persistent()).unwrap();
    // Dropped while off, so the same value must pass once on.
    rec.set_node_tag(node, "x", 1u32, false).unwrap();
    rec.turn_on().unwrap();
    rec.set_node_tag(node, "x", 1u32, false).unwrap();
    rec.close().unwrap();

    assert_eq!(node_tags(&read(&path)), vec![TagValue::Int(1)]);
}

// ==================== Turn On/Off Replay Tests ====================

#[test]
fn test_persistent_commands_replayed_on_turn_on() {
    init_logger();
    let dir = tempdir().unwrap();
    let path = dir.path().join("replay.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));

    let a = rec.new_node(NodeSpec::new("A").persistent()).unwrap();
    let b = rec.new_node(NodeSpec::new("B").persistent()).unwrap();
    rec.new_edge(EdgeSpec::new(a, b, "A2B").persistent())
        .unwrap();
    rec.cycle(1, false).unwrap();
    rec.turn_on().unwrap();
    rec.cycle(2, false).unwrap();
    rec.close().unwrap();

    let commands = read(&path);
    assert!(matches!(commands[0], Command::Version { .. }));
    assert!(matches!(commands[1], Command::NewNode { id: 0, .. }));
    assert!(matches!(commands[2], Command::NewNode { id: 1, .. }));
    assert!(matches!(commands[3], Command::NewEdge { id: 0, .. }));
    assert_eq!(commands[4], Command::Cycle { cycle: 2 });
    assert_eq!(commands.len(), 5);
}

#[test]
fn test_partial_replay_after_turn_off() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    rec.new_node(NodeSpec::new("A").persistent()).unwrap();
    rec.turn_on().unwrap();
    rec.cycle(1, false).unwrap();
    rec.turn_off().unwrap();

    rec.new_node(NodeSpec::new("B").persistent()).unwrap();
    rec.cycle(2, false).unwrap();
    rec.turn_on().unwrap();
    rec.cycle(3, false).unwrap();
    rec.close().unwrap();

    let commands = read(&path);
    let names: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c {
            Command::NewNode { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    // "A" appears once: the second turn_on only replays what was stored
    // while off.
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(
        &commands[2..],
        &[
            Command::Cycle { cycle: 1 },
            Command::NewNode {
                id: 1,
                name: "B".into(),
                parent: None,
                instance: 0,
            },
            Command::Cycle { cycle: 3 },
        ]
    );
}

#[test]
fn test_items_created_while_off_announced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("items.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));

    let first = rec.new_item(false).unwrap();
    let second = rec.new_item(false).unwrap();
    let third = rec.new_item(false).unwrap();
    rec.delete_item(second, false).unwrap();
    assert_eq!(rec.live_items().len(), 2);

    rec.turn_on().unwrap();
    assert!(rec.live_items().is_empty());
    rec.close().unwrap();

    let commands = read(&path);
    assert_eq!(
        &commands[1..],
        &[
            Command::NewItem { id: first },
            Command::NewItem { id: third },
        ]
    );
    assert_eq!(rec.stats().items_replayed, 2);
}

#[test]
fn test_persistent_delete_ends_liveness() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mixed.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));

    let item = rec.new_item(false).unwrap();
    let kept = rec.new_item(false).unwrap();
    rec.delete_item(item, true).unwrap();
    assert_eq!(rec.live_items().iter().copied().collect::<Vec<_>>(), vec![kept]);

    rec.turn_on().unwrap();
    rec.close().unwrap();

    assert_eq!(
        &read(&path)[1..],
        &[
            Command::DeleteItem { id: item },
            Command::NewItem { id: kept },
        ]
    );
}

#[test]
fn test_persistent_item_not_announced_twice() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stored.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));

    let item = rec.new_item(true).unwrap();
    assert!(rec.live_items().is_empty());
    rec.turn_on().unwrap();
    rec.close().unwrap();

    assert_eq!(&read(&path)[1..], &[Command::NewItem { id: item }]);
}

#[test]
fn test_change_file_name_replays_everything() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.ptr");
    let second = dir.path().join("second.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&first));

    let node = rec.new_node(NodeSpec::new("A").persistent()).unwrap();
    rec.turn_on().unwrap();
    rec.set_node_tag(node, "x", 1u32, false).unwrap();
    rec.cycle(1, false).unwrap();

    // Ignored while on.
    rec.change_file_name(&second).unwrap();
    rec.turn_off().unwrap();
    rec.change_file_name(&second).unwrap();
    rec.turn_on().unwrap();
    // The new file has no tag history, so the same value is written again.
    rec.set_node_tag(node, "x", 1u32, false).unwrap();
    rec.close().unwrap();

    let old = read(&first);
    assert_eq!(old.len(), 4);
    let new = read(&second);
    assert!(matches!(new[0], Command::Version { .. }));
    assert!(matches!(new[1], Command::NewNode { .. }));
    assert_eq!(node_tags(&new), vec![TagValue::Int(1)]);
}

#[test]
fn test_ascii_mode_switch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.txt");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    rec.set_ascii_mode(true).unwrap();
    rec.new_node(NodeSpec::new("A").persistent()).unwrap();
    rec.turn_on().unwrap();
    let item = rec.new_item(false).unwrap();
    rec.set_item_tag(item, "op", 42u8, false).unwrap();
    rec.cycle(12, false).unwrap();
    rec.close().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "version 4.0\n\
         newnode 0 name=\"A\" parent=- instance=0\n\
         newitem 1\n\
         setitemtag item=1 tag=\"op\" value=0x2a\n\
         cycle 12\n"
    );
}

// ==================== Error Tests ====================

#[test]
fn test_contract_violations_leave_state_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("errors.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path));
    rec.turn_on().unwrap();
    let node = rec.new_node(NodeSpec::new("A")).unwrap();

    assert!(matches!(
        rec.enter_node(node, 0, &[], false),
        Err(TraceError::InvalidItem)
    ));
    assert!(matches!(
        rec.set_item_tag(1, &"t".repeat(300), 1u8, false),
        Err(TraceError::TagNameTooLong { .. })
    ));
    assert!(matches!(
        rec.new_node_with_id(node, NodeSpec::new("again")),
        Err(TraceError::DuplicateNode(_))
    ));
    assert!(matches!(
        rec.set_node_input_bandwidth(42, 1, false),
        Err(TraceError::NodeNotFound(42))
    ));
    rec.close().unwrap();

    let commands = read(&path);
    assert_eq!(commands.len(), 2);
}

#[test]
fn test_bandwidth_watermark() {
    let dir = tempdir().unwrap();
    let mut rec = Recorder::new(
        RecorderConfig::new(dir.path().join("bw.ptr")).track_bandwidth(true),
    );
    let a = rec.new_node(NodeSpec::new("A")).unwrap();
    let b = rec.new_node(NodeSpec::new("B")).unwrap();
    let edge = rec.new_edge(EdgeSpec::new(a, b, "A2B").bandwidth(4)).unwrap();
    assert_eq!(rec.edge_max_bandwidth(edge), None);

    rec.move_items(edge, &[1, 2, 3], false).unwrap();
    rec.cycle(1, false).unwrap();
    rec.move_item(edge, 4, false).unwrap();
    rec.cycle(2, false).unwrap();
    assert_eq!(rec.edge_max_bandwidth(edge), Some(3));
}

#[test]
fn test_bandwidth_untracked_by_default() {
    let dir = tempdir().unwrap();
    let mut rec = Recorder::new(RecorderConfig::new(dir.path().join("bw.ptr")));
    let a = rec.new_node(NodeSpec::new("A")).unwrap();
    let edge = rec.new_edge(EdgeSpec::new(a, a, "loop")).unwrap();
    rec.move_item(edge, 1, false).unwrap();
    rec.cycle(1, false).unwrap();
    assert_eq!(rec.edge_max_bandwidth(edge), None);
}
