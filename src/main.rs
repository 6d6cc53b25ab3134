mod api;
mod cli;
mod commands;
mod config;
mod db;
mod download;
mod drive;
mod filter;
#[cfg(test)]
mod mock_http;
mod models;
mod naming;
mod output;
mod platform;
mod transfer;

use anyhow::Result;
use clap::Parser;

use cli::args::{AdminAction, Cli, Commands};
use cli::context::RunContext;

fn main() -> Result<()> {
    setup_broken_pipe_handling();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = RunContext::from_args(
        cli.json,
        cli.no_color,
        cli.config.as_deref(),
        cli.db.as_deref(),
        cli.command.dry_run_override(),
    )?;

    // Admin DB commands don't need a database connection
    if let Commands::Admin {
        action: AdminAction::Db { action },
    } = &cli.command
    {
        commands::db::run_with_path(action, &ctx.db_path()?, ctx.output_mode)?;
        return Ok(());
    }

    // Drive authorization works on the token file only
    if let Commands::Drive { action } = &cli.command {
        commands::drive::run(action, &ctx)?;
        return Ok(());
    }

    let conn = db::connection::open_db_at_path(&ctx.db_path()?)?;

    match &cli.command {
        Commands::Run { .. } => commands::run::run(&conn, &ctx)?,
        Commands::Ingest => commands::ingest::run(&conn, &ctx)?,
        Commands::Sync => commands::sync::run(&conn, &ctx)?,
        Commands::Status { limit } => commands::status::run(&conn, &ctx, *limit)?,
        Commands::Reset => commands::reset::run(&conn, ctx.output_mode)?,
        Commands::Admin { .. } | Commands::Drive { .. } => unreachable!(),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let env_var = std::env::var("RECSYNC_LOG").ok();

    let mut builder = env_logger::Builder::new();
    builder.format_target(true);
    builder.format_module_path(false);

    if let Some(ref filter) = env_var {
        builder.parse_filters(filter);
    } else if verbose {
        builder.filter_module("recsync", log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }

    builder.init();
}

/// Exit quietly when stdout is closed early (`recsync status | head`).
fn setup_broken_pipe_handling() {
    #[cfg(unix)]
    unsafe {
        unsafe extern "C" {
            fn signal(sig: i32, handler: usize) -> usize;
        }
        // SIGPIPE back to SIG_DFL
        signal(13, 0);
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info
            .payload()
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("");

        if msg.contains("failed printing to stdout") {
            std::process::exit(0);
        }

        default_hook(info);
    }));
}
