//! `simsearch search`.

use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// Print the nearest neighbours of `plot` in `table`.
pub async fn search(
    state: &AppState,
    table: &str,
    plot: i64,
    matches: u32,
    json: bool,
) -> Result<()> {
    let results = state
        .search_service
        .search(&state.target, table, plot, matches)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!();
    if results.is_empty() {
        println!(
            "  {} No matches for plot {} in {}",
            style("∅").dim(),
            plot,
            style(table).cyan()
        );
        println!();
        return Ok(());
    }

    println!(
        "  Plots most similar to {} in {}",
        style(plot).bold(),
        style(table).cyan()
    );
    println!();

    let mut view = Table::new();
    view.load_preset(presets::UTF8_FULL_CONDENSED);
    view.set_content_arrangement(ContentArrangement::Dynamic);
    view.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Plot").fg(Color::White),
        Cell::new("Distance").fg(Color::White),
    ]);
    for (rank, m) in results.iter().enumerate() {
        view.add_row(vec![
            Cell::new(rank + 1).fg(Color::DarkGrey),
            Cell::new(m.base_plotid).fg(Color::Cyan),
            Cell::new(format!("{:.4}", m.distance)).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{view}");
    println!();
    Ok(())
}
