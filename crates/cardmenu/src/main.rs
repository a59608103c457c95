mod bindings;
mod cli;
mod paths;
mod run;
mod session;

use std::path::Path;

use anyhow::Result;
use cli::Command;
use menuconfig::MenuConfig;
use paths::AppPaths;
use serde::Serialize;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Layout { json }) => run_layout(cli.run.config.as_deref(), json),
        Some(Command::Config) => run_config(cli.run.config.as_deref()),
        Some(Command::Where) => run_where(cli.run.config.as_deref()),
        None => run::run(cli.run),
    }
}

#[derive(Debug, Serialize)]
struct CardPlacement {
    index: usize,
    row: usize,
    col: usize,
    x: f32,
    y: f32,
    z: f32,
}

fn run_layout(explicit: Option<&Path>, json: bool) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = run::load_config(&paths, explicit)?;
    let layout = bindings::grid_layout(&config);

    let placements: Vec<CardPlacement> = (0..layout.card_count())
        .filter_map(|index| {
            let (row, col) = layout.cell(index)?;
            let [x, y, z] = layout.rest_position(row, col);
            Some(CardPlacement {
                index,
                row,
                col,
                x,
                y,
                z,
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&placements)?);
        return Ok(());
    }

    println!(
        "Grid {}x{} (menu {:.4} x {:.4}):",
        layout.cols,
        layout.rows,
        layout.menu_width(),
        layout.menu_height()
    );
    for card in placements {
        println!(
            "  #{:<3} row={:<2} col={:<2} x={:>8.4} y={:>8.4} z={:.4}",
            card.index, card.row, card.col, card.x, card.y, card.z
        );
    }
    Ok(())
}

fn run_config(explicit: Option<&Path>) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config: MenuConfig = run::load_config(&paths, explicit)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn run_where(explicit: Option<&Path>) -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.resolve_config(explicit);
    println!("Configuration:");
    println!("  config dir:  {}", paths.config_dir().display());
    println!(
        "  config file: {} ({})",
        file.display(),
        if file.exists() { "present" } else { "missing" }
    );
    Ok(())
}
