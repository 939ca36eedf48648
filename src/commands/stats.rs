use anyhow::{Context, Result};
use std::time::Duration;

use ledfleet::coordinator::registry::HostStats;
use ledfleet::coordinator::{ClientConfig, FleetClient};

/// Print the leader's per-host table
pub async fn stats(leader: String, timeout_ms: u64) -> Result<()> {
    let client = FleetClient::new(
        ClientConfig::default().with_timeout(Duration::from_millis(timeout_ms)),
    )?;

    let rows = client
        .stats(&leader)
        .await
        .with_context(|| format!("Failed to fetch stats from {leader}"))?;

    print!("{}", render(&leader, &rows));
    Ok(())
}

fn render(leader: &str, rows: &[HostStats]) -> String {
    let mut out = String::new();
    out.push_str("Fleet Statistics\n");
    out.push_str("================\n");
    out.push_str(&format!("Leader: {leader}\n\n"));

    if rows.is_empty() {
        out.push_str("No hosts registered.\n");
        return out;
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    out.push_str(&format!(
        "{:<width$}  {:<5}  {:>8}  {}\n",
        "Name", "LED", "Failures", "Last Updated"
    ));

    for row in rows {
        let failures = if !row.alive {
            format!("{} (evicted)", row.failures)
        } else {
            row.failures.to_string()
        };
        out.push_str(&format!(
            "{:<width$}  {:<5}  {:>8}  {}\n",
            row.name,
            if row.state { "on" } else { "off" },
            failures,
            row.last_updated.format("%Y-%m-%d %H:%M:%S"),
        ));
    }

    out
}
