use std::path::Path;

use anyhow::{Context, Result, bail};

use nutritrack_core::csv_import::{import_tab, parse_tab_csv};
use nutritrack_core::service::NutriService;

pub(crate) fn cmd_import(
    service: &NutriService,
    tab: &str,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let Some(store) = service.store() else {
        bail!("Offline mode: no store to import into");
    };

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let rows = parse_tab_csv(tab, file)?;

    if rows.is_empty() {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "No rows found in CSV file" })
            );
        } else {
            eprintln!("No rows found in CSV file.");
        }
        return Ok(());
    }

    let summary = import_tab(store, tab, &rows, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if dry_run {
            println!("Dry run - no changes made.\n");
        } else {
            println!("Import complete.\n");
        }
        println!("  Tab:           {}", summary.tab);
        println!("  Rows read:     {}", summary.rows_read);
        println!("  Rows imported: {}", summary.rows_imported);
        println!("  Rows skipped:  {}", summary.rows_skipped);
    }

    Ok(())
}
