//! Record a small three-stage pipeline, then read the trace back.

use pipetrace::*;

fn main() -> TraceResult<()> {
    let path = std::env::temp_dir().join("basic_trace.ptr");
    let mut rec = Recorder::new(RecorderConfig::new(&path).compressed(true));

    // Structure is persistent so it survives until tracing is turned on.
    let core = rec.new_node(NodeSpec::new("core").persistent())?;
    let fetch = rec.new_node(NodeSpec::new("fetch").parent(core).persistent())?;
    let execute = rec.new_node(
        NodeSpec::new("execute")
            .parent(core)
            .autoflush()
            .persistent(),
    )?;
    let retire = rec.new_node(NodeSpec::new("retire").parent(core).persistent())?;
    rec.set_node_capacity(execute, 2, true)?;
    let issue = rec.new_edge(EdgeSpec::new(fetch, execute, "issue").bandwidth(2).persistent())?;
    let complete = rec.new_edge(EdgeSpec::new(execute, retire, "complete").persistent())?;
    rec.set_tag_description("opcode", "Decoded operation", true)?;

    // Warm-up cycles are not traced.
    for cycle in 0..100 {
        rec.cycle(cycle, false)?;
    }

    rec.turn_on()?;
    rec.start_activity(100, false)?;
    let mut in_flight = Vec::new();
    for cycle in 100..110u64 {
        let item = rec.new_item(false)?;
        let opcode = if cycle % 2 == 0 { "add" } else { "load" };
        rec.set_item_tag(item, "opcode", opcode, false)?;
        rec.move_item(issue, item, false)?;
        rec.enter_node_slot(execute, item, (cycle % 2) as u32, false)?;
        if let Some(done) = in_flight.pop() {
            rec.move_item(complete, done, false)?;
            rec.delete_item(done, false)?;
        }
        in_flight.push(item);
        rec.set_node_tag(execute, "busy", 1u8, false)?;
        rec.cycle(cycle, false)?;
    }
    rec.close()?;

    let stats = rec.stats();
    println!(
        "Recorded {} commands ({} node tags suppressed, {} exits synthesized)",
        stats.commands_encoded, stats.tags_suppressed, stats.exits_synthesized
    );

    let commands = TraceReader::read_from_file(&path)?;
    println!("Read back {} commands from {}", commands.len(), path.display());
    for command in commands.iter().take(12) {
        println!("  {}", format::ascii::render(command));
    }

    std::fs::remove_file(&path)?;
    Ok(())
}
