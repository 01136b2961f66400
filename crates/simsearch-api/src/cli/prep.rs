//! `simsearch prep` and `simsearch names`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use simsearch_core::pipeline::predicted_names;

use crate::state::AppState;

/// Run the full pipeline for `file` and print the tables that were produced.
///
/// Ctrl+C cancels the run at the next poll; tasks already submitted keep
/// running remotely.
pub async fn prepare(
    state: &AppState,
    file: &str,
    years: &[i32],
    json: bool,
    quiet: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = if json || quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {elapsed:.dim}")?);
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    };
    spinner.set_message(format!("Preparing {file} for {}...", join_years(years)));

    let result = state
        .orchestrator
        .prepare(file, &state.target, years, &cancel)
        .await;
    spinner.finish_and_clear();
    let tables = result?;

    let failed: Vec<i32> = years
        .iter()
        .copied()
        .filter(|year| !tables.contains_key(year))
        .collect();

    if json {
        let output = serde_json::json!({
            "source": file,
            "tables": tables,
            "failed_years": failed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Prepared {} of {} year(s) from {}",
        style("✓").green().bold(),
        tables.len(),
        years.len(),
        style(file).cyan()
    );
    println!();
    if !tables.is_empty() {
        println!("{}", tables_view(&tables));
        println!();
    }
    if !failed.is_empty() {
        println!(
            "  {} Failed: {} (run with -v for details)",
            style("✗").red(),
            join_years(&failed)
        );
        println!();
    }
    Ok(())
}

/// Print the canonical names without contacting any remote service.
pub fn names(state: &AppState, file: &str, years: &[i32], json: bool) -> Result<()> {
    let tables = predicted_names(file, &state.target, years)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    println!();
    println!("{}", tables_view(&tables));
    println!();
    Ok(())
}

fn tables_view(tables: &BTreeMap<i32, String>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Year").fg(Color::White),
        Cell::new("Table").fg(Color::White),
    ]);
    for (year, name) in tables {
        table.add_row(vec![
            Cell::new(year).fg(Color::Yellow),
            Cell::new(name).fg(Color::Cyan),
        ]);
    }
    table
}

fn join_years(years: &[i32]) -> String {
    years
        .iter()
        .map(|y| y.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
