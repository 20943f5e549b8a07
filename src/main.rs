#![deny(warnings, clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Write};
use waymark::{cli, terminal, utils};

#[macro_use]
extern crate waymark;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet)?;

    let config = cli.controller_config();
    dlog!(
        "zoom={} restore_delay={:?} tiles={}",
        config.default_zoom,
        config.form_restore_delay,
        config.tile_layer.url_template
    );

    let mut session = terminal::Session::new(config);
    session.start(&mut terminal::FixedLocation::new(cli.location()));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.script.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("opening script: {}", path.display()))?;
            tracing::info!(script = %path.display(), "running script");
            terminal::run_script(&mut session, BufReader::new(file), &mut out)?;
        }
        _ => terminal::run_script(&mut session, io::stdin().lock(), &mut out)?,
    }

    tracing::info!(workouts = session.workouts().len(), "session finished");

    if cli.json {
        serde_json::to_writer_pretty(&mut out, session.workouts())
            .context("writing workouts as JSON")?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}
