//! CLI command implementations.

use std::collections::BTreeMap;
use std::path::Path;

use crate::format::ascii::render;
use crate::format::compression::is_compressed;
use crate::format::TraceReader;
use crate::types::{Command, TraceError, TraceResult};

/// Display information about a trace file.
pub fn cmd_info(path: &Path, json: bool) -> TraceResult<()> {
    let metadata = std::fs::metadata(path)?;
    let file_size = metadata.len();
    let modified = metadata.modified().ok().map(format_system_time);
    let compressed = is_compressed(&read_prefix(path)?);
    let commands = TraceReader::read_from_file(path)?;

    let (major, minor) = match commands.first() {
        Some(Command::Version { major, minor }) => (*major, *minor),
        _ => return Err(TraceError::MissingVersion),
    };
    let counts = count_by_name(&commands);
    let last_cycle = commands.iter().rev().find_map(|c| match c {
        Command::Cycle { cycle } | Command::CycleWithClock { cycle, .. } => Some(*cycle),
        _ => None,
    });

    if json {
        let info = serde_json::json!({
            "file": path.display().to_string(),
            "file_size": file_size,
            "modified": modified,
            "compressed": compressed,
            "version": format!("{}.{}", major, minor),
            "commands": commands.len(),
            "last_cycle": last_cycle,
            "command_counts": counts,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&info).unwrap_or_default()
        );
    } else {
        println!("File: {}", path.display());
        println!("File size: {}", format_size(file_size));
        if let Some(modified) = modified {
            println!("Modified: {}", modified);
        }
        println!("Compressed: {}", if compressed { "yes (lz4)" } else { "no" });
        println!("Version: {}.{}", major, minor);
        println!("Commands: {}", commands.len());
        if let Some(cycle) = last_cycle {
            println!("Last cycle: {}", cycle);
        }
        println!("Command counts:");
        for (name, count) in &counts {
            println!("  {}: {}", name, count);
        }
    }
    Ok(())
}

/// Print the commands of a trace, one per line.
pub fn cmd_dump(path: &Path, limit: Option<usize>, json: bool) -> TraceResult<()> {
    let commands = TraceReader::read_from_file(path)?;
    let shown = limit.unwrap_or(commands.len()).min(commands.len());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&commands[..shown]).unwrap_or_default()
        );
    } else {
        for command in &commands[..shown] {
            println!("{}", render(command));
        }
        if shown < commands.len() {
            println!("... {} more commands", commands.len() - shown);
        }
    }
    Ok(())
}

/// Process exit code for an error.
pub fn exit_code(error: &TraceError) -> i32 {
    match error {
        TraceError::Io(_) => 1,
        TraceError::Truncated
        | TraceError::UnknownCommand { .. }
        | TraceError::MissingVersion
        | TraceError::UnsupportedVersion { .. }
        | TraceError::UndefinedTag(_)
        | TraceError::UndefinedString(_)
        | TraceError::InvalidUtf8(_)
        | TraceError::InvalidPhase { .. }
        | TraceError::Compression(_) => 2,
        _ => 5,
    }
}

fn read_prefix(path: &Path) -> TraceResult<Vec<u8>> {
    use std::io::Read;
    let mut prefix = Vec::with_capacity(4);
    std::fs::File::open(path)?.take(4).read_to_end(&mut prefix)?;
    Ok(prefix)
}

fn count_by_name(commands: &[Command]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for command in commands {
        *counts.entry(command.name()).or_insert(0) += 1;
    }
    counts
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_system_time(time: std::time::SystemTime) -> String {
    let dt: chrono::DateTime<chrono::Utc> = time.into();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(10), "10 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&TraceError::Truncated), 2);
        assert_eq!(exit_code(&TraceError::MissingVersion), 2);
        assert_eq!(
            exit_code(&TraceError::Io(std::io::Error::other("x"))),
            1
        );
        assert_eq!(exit_code(&TraceError::InvalidItem), 5);
    }

    #[test]
    fn test_count_by_name() {
        let commands = vec![
            Command::Cycle { cycle: 1 },
            Command::Cycle { cycle: 2 },
            Command::NewItem { id: 1 },
        ];
        let counts = count_by_name(&commands);
        assert_eq!(counts["cycle"], 2);
        assert_eq!(counts["newitem"], 1);
    }
}
