use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use relay_billing::config::Config;

use super::pricing_file;

/// Execute the backups command
///
/// Lists catalog backups, newest first
pub async fn execute(cfg: &Config) -> Result<()> {
    let store = pricing_file(cfg);
    let backups = store.list_backups().await?;

    if backups.is_empty() {
        println!("No pricing backups in {}", store.backup_dir().display());
        return Ok(());
    }

    println!("Pricing backups in {}:", store.backup_dir().display());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("NAME").fg(Color::Cyan),
        Cell::new("CREATED (UTC)").fg(Color::Cyan),
        Cell::new("SIZE").fg(Color::Cyan),
    ]);

    for backup in &backups {
        table.add_row(vec![
            Cell::new(&backup.name),
            Cell::new(backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(format_size(backup.size_bytes)),
        ]);
    }

    println!("{}", table);
    println!("Restore one with: billing restore <NAME>");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
