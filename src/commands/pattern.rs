use anyhow::Result;

use ledfleet::scheduler::PatternKind;

/// Preview a pattern without a fleet
pub fn pattern(kind: PatternKind, count: usize, steps: usize) -> Result<()> {
    println!("Pattern: {kind} ({count} slots, {steps} steps)");
    println!();
    for line in preview(kind, count, steps) {
        println!("{line}");
    }
    Ok(())
}

fn preview(kind: PatternKind, count: usize, steps: usize) -> Vec<String> {
    let mut schedule = kind.build();
    (1..=steps)
        .map(|step| {
            let cells: String = schedule
                .next(count)
                .into_iter()
                .map(|on| if on { '●' } else { '○' })
                .collect();
            format!("{step:>4}  {cells}")
        })
        .collect()
}
