//! Phase 1 tests: command model + wire format.

use std::path::Path;

use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use pipetrace::format::compression::is_compressed;
use pipetrace::format::{AsciiEncoder, BinaryEncoder, TraceEncoder, TraceReader};
use pipetrace::types::{
    ClockPhase, Command, CommandCode, TagValue, TraceError, STRING_TABLE_CAPACITY,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn encode_to(path: &Path, commands: &[Command], compressed: bool) {
    let mut encoder = BinaryEncoder::new(4096);
    encoder.begin(path, compressed).unwrap();
    for command in commands {
        encoder.encode(command).unwrap();
    }
    encoder.close().unwrap();
}

fn without_definitions(commands: Vec<Command>) -> Vec<Command> {
    commands
        .into_iter()
        .filter(|c| {
            !matches!(
                c,
                Command::Version { .. } | Command::DefineTag { .. } | Command::DefineString { .. }
            )
        })
        .collect()
}

// ==================== Command Model Tests ====================

#[test]
fn test_command_code_roundtrip() {
    for val in 0u8..=29 {
        let code = CommandCode::from_u8(val).unwrap();
        assert_eq!(code as u8, val);
    }
    for val in 30u8..=63 {
        assert!(CommandCode::from_u8(val).is_none());
    }
}

#[test]
fn test_clock_phase_from_u8() {
    assert_eq!(ClockPhase::from_u8(0), Some(ClockPhase::High));
    assert_eq!(ClockPhase::from_u8(1), Some(ClockPhase::Low));
    assert_eq!(ClockPhase::from_u8(2), None);
}

// ==================== Wire Format Tests ====================

#[test]
fn test_random_ids_roundtrip() {
    init_logger();
    let dir = tempdir().unwrap();
    let path = dir.path().join("random.ptr");
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);

    let mut commands = Vec::new();
    for _ in 0..2000 {
        let command = match rng.gen_range(0..5) {
            0 => Command::NewItem { id: rng.gen() },
            1 => Command::DeleteItem {
                id: rng.gen_range(1..300),
            },
            2 => Command::EnterNode {
                node: rng.gen(),
                item: rng.gen(),
                position: vec![rng.gen_range(0..4), rng.gen()],
            },
            3 => {
                let count = rng.gen_range(1..6);
                Command::MoveItems {
                    edge: rng.gen(),
                    items: (0..count).map(|_| rng.gen()).collect(),
                    positions: Vec::new(),
                }
            }
            _ => Command::Cycle { cycle: rng.gen() },
        };
        commands.push(command);
    }

    encode_to(&path, &commands, false);
    let decoded = TraceReader::read_from_file(&path).unwrap();
    assert_eq!(decoded[0], Command::Version { major: 4, minor: 0 });
    assert_eq!(&decoded[1..], &commands[..]);
}

#[test]
fn test_tag_interned_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.ptr");
    let commands = vec![
        Command::SetItemTag {
            item: 1,
            tag: "opcode".into(),
            value: TagValue::Str("add".into()),
        },
        Command::SetItemTag {
            item: 2,
            tag: "opcode".into(),
            value: TagValue::Str("add".into()),
        },
        Command::SetItemTag {
            item: 3,
            tag: "opcode".into(),
            value: TagValue::Str("mul".into()),
        },
    ];
    encode_to(&path, &commands, false);
    let decoded = TraceReader::read_from_file(&path).unwrap();

    let tag_defs: Vec<_> = decoded
        .iter()
        .filter(|c| matches!(c, Command::DefineTag { .. }))
        .collect();
    assert_eq!(tag_defs.len(), 1);
    let string_defs: Vec<_> = decoded
        .iter()
        .filter(|c| matches!(c, Command::DefineString { .. }))
        .collect();
    assert_eq!(string_defs.len(), 2);
    assert_eq!(without_definitions(decoded), commands);
}

#[test]
fn test_tag_table_eviction_redefines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("evict.ptr");
    let mut commands: Vec<Command> = (0..257)
        .map(|i| Command::SetCycleTag {
            tag: format!("t{}", i),
            value: TagValue::Int(i),
        })
        .collect();
    // t0 was evicted by t256; bringing it back evicts t1 and takes its id.
    commands.push(Command::SetCycleTag {
        tag: "t0".into(),
        value: TagValue::Int(0),
    });
    encode_to(&path, &commands, false);
    let decoded = TraceReader::read_from_file(&path).unwrap();

    let defs: Vec<(u8, String)> = decoded
        .iter()
        .filter_map(|c| match c {
            Command::DefineTag { id, name } => Some((*id, name.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(defs.len(), 258);
    assert_eq!(defs[256], (0, "t256".to_string()));
    assert_eq!(defs[257], (1, "t0".to_string()));
    assert_eq!(without_definitions(decoded), commands);
}

#[test]
fn test_string_table_eviction_redefines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("strings.ptr");
    let capacity = STRING_TABLE_CAPACITY as u64;
    let mut commands: Vec<Command> = (0..=capacity)
        .map(|i| Command::SetCycleTag {
            tag: "state".into(),
            value: TagValue::Str(format!("s{}", i)),
        })
        .collect();
    // s0 was evicted by the value past capacity; it comes back on s1's id.
    commands.push(Command::SetCycleTag {
        tag: "state".into(),
        value: TagValue::Str("s0".into()),
    });
    encode_to(&path, &commands, true);
    let decoded = TraceReader::read_from_file(&path).unwrap();

    let defs: Vec<(u16, String)> = decoded
        .iter()
        .filter_map(|c| match c {
            Command::DefineString { id, value } => Some((*id, value.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(defs.len(), STRING_TABLE_CAPACITY + 2);
    assert_eq!(defs[STRING_TABLE_CAPACITY], (0, format!("s{}", capacity)));
    assert_eq!(defs[STRING_TABLE_CAPACITY + 1], (1, "s0".to_string()));
    assert_eq!(without_definitions(decoded), commands);
}

#[test]
fn test_compressed_trace_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("compressed.ptr");
    let commands: Vec<Command> = (1..500)
        .flat_map(|i| [Command::NewItem { id: i }, Command::Cycle { cycle: i as u64 }])
        .collect();
    encode_to(&path, &commands, true);

    let raw = std::fs::read(&path).unwrap();
    assert!(is_compressed(&raw));
    let decoded = TraceReader::read_from_file(&path).unwrap();
    assert_eq!(&decoded[1..], &commands[..]);
}

#[test]
fn test_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cut.ptr");
    encode_to(
        &path,
        &[Command::NewNode {
            id: 0,
            name: "fetch".into(),
            parent: None,
            instance: 0,
        }],
        false,
    );
    let mut raw = std::fs::read(&path).unwrap();
    raw.truncate(raw.len() - 2);
    assert!(matches!(
        TraceReader::decode(&raw),
        Err(TraceError::Truncated)
    ));
}

#[test]
fn test_empty_file_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.ptr");
    std::fs::write(&path, b"").unwrap();
    assert!(matches!(
        TraceReader::read_from_file(&path),
        Err(TraceError::MissingVersion)
    ));
}

#[test]
fn test_ascii_encoder_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.txt");
    let mut encoder = AsciiEncoder::new(0);
    encoder.begin(&path, false).unwrap();
    encoder
        .encode(&Command::NewNode {
            id: 0,
            name: "A".into(),
            parent: None,
            instance: 0,
        })
        .unwrap();
    encoder.encode(&Command::Cycle { cycle: 12 }).unwrap();
    encoder
        .encode(&Command::CycleWithClock {
            clock: 1,
            cycle: 12,
            phase: ClockPhase::High,
        })
        .unwrap();
    // No de-duplication in text mode.
    encoder
        .encode(&Command::CycleWithClock {
            clock: 1,
            cycle: 12,
            phase: ClockPhase::High,
        })
        .unwrap();
    encoder.close().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "version 4.0",
            "newnode 0 name=\"A\" parent=- instance=0",
            "cycle 12",
            "cyclewithclock clock=1 cycle=12 phase=high",
            "cyclewithclock clock=1 cycle=12 phase=high",
        ]
    );
}
