//! Walk a lit cave in the terminal, printing the view after each command.
//!
//! Run: cargo run --bin cave-walk -- [keys] [--seed N] [--radius N] [--plain]
//!
//! `keys` uses roguelike movement (`hjklyubn`), `.` to wait, `o` to toggle
//! doors and `r` to drop rubble. Set `RUST_LOG=debug` to see timings.

use anyhow::{Context, Result};
use tilesight_demos::{CaveWalk, LEVEL, parse_commands};
use tilesight_map::ViewConfig;

const DEFAULT_KEYS: &str = "hhhkohhhhhjjj.lllllllllllluuo.r";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut keys = DEFAULT_KEYS.to_string();
    let mut seed = 42u64;
    let mut config = ViewConfig::default();
    let mut color = true;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let v = args.next().context("--seed needs a value")?;
                seed = v.parse().with_context(|| format!("bad seed {v:?}"))?;
            }
            "--radius" => {
                let v = args.next().context("--radius needs a value")?;
                config.radius = v.parse().with_context(|| format!("bad radius {v:?}"))?;
            }
            "--plain" => color = false,
            _ => keys = arg,
        }
    }

    let mut walk = CaveWalk::from_template(LEVEL, config, seed)?;
    println!("{}", walk.render(color));
    for cmd in parse_commands(&keys) {
        let change = walk.step(cmd)?;
        println!(
            "turn {} {cmd:?}: +{} -{}",
            walk.turn(),
            change.newly_visible.len(),
            change.newly_hidden.len()
        );
        println!("{}", walk.render(color));
    }
    log::info!(
        "done after {} turns, {} cells remembered",
        walk.turn(),
        walk.view().remembered_cells().count()
    );
    Ok(())
}
