//! Terminal-facing commands that run outside the MCP server loop.

use anyhow::Result;

use crate::config::TenetConfig;

/// Display knowledge-store statistics in the terminal.
pub fn stats(config: &TenetConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let response = crate::knowledge::stats::knowledge_stats(&conn, Some(&db_path))?;

    println!("Knowledge Store Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total records:       {}", response.total_records);
    println!("  Active:              {}", response.active_records);
    println!("  Deleted:             {}", response.deleted_records);
    println!();

    println!("By Kind:");
    for kind in &["decision", "constraint"] {
        let count = response.by_kind.get(*kind).copied().unwrap_or(0);
        println!("  {:<12} {}", kind, count);
    }
    println!();

    if !response.by_layer.is_empty() {
        println!("By Layer:");
        let mut layers: Vec<_> = response.by_layer.iter().collect();
        layers.sort();
        for (layer, count) in layers {
            println!("  {:<12} {}", layer, count);
        }
        println!();
    }

    println!("Policies:              {}", response.policies);
    println!("History entries:       {}", response.history_entries);
    println!("Database size:         {} bytes", response.db_size_bytes);

    if let Some(ref oldest) = response.oldest_record {
        println!("Oldest record:         {oldest}");
    }
    if let Some(ref newest) = response.newest_record {
        println!("Newest record:         {newest}");
    }

    Ok(())
}
