//! Drive authorization commands (init, status, logout).

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cli::args::DriveAction;
use crate::cli::context::RunContext;
use crate::drive::DriveTokenStore;
use crate::drive::oauth::{PkceChallenge, RedirectListener, build_auth_url};
use crate::output::format::OutputMode;
use crate::output::progress::create_spinner;

pub fn run(action: &DriveAction, ctx: &RunContext) -> Result<()> {
    match action {
        DriveAction::Init => init(ctx),
        DriveAction::Status => status(ctx.output_mode),
        DriveAction::Logout => logout(),
    }
}

fn init(ctx: &RunContext) -> Result<()> {
    let app = ctx.config.drive_app()?;
    let mut store = DriveTokenStore::load()?;

    if store.is_authorized() {
        println!("Already authorized with Google Drive.");
        print!("Re-authorize? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Keeping existing authorization.");
            return Ok(());
        }
    }

    let pkce = PkceChallenge::generate();
    let listener = RedirectListener::bind().context("Failed to start local redirect listener")?;
    let redirect_uri = listener.redirect_uri();
    let auth_url = build_auth_url(&app.client_id, &redirect_uri, &pkce.challenge)?;

    println!("\nOpening browser for Google Drive authorization...");
    println!("\nIf the browser doesn't open, visit this URL:");
    println!("{}\n", auth_url);
    if let Err(e) = open::that(&auth_url) {
        eprintln!("Could not open browser: {}", e);
    }

    let spinner = create_spinner("Waiting for authorization in the browser...");
    let code = listener.wait_for_code();
    spinner.finish_and_clear();
    let code = code?;

    println!("Exchanging code for tokens...");
    let tokens = app.exchange_code(&code, &pkce.verifier, &redirect_uri)?;
    let refresh_token = tokens
        .refresh_token
        .context("Google did not return a refresh token; revoke the app's access and try again")?;

    store.set_refresh_token(refresh_token);
    store.save()?;

    println!("\nAuthorized with Google Drive.");
    println!(
        "Recordings will be uploaded to the '{}' folder.",
        ctx.config.drive.folder_name
    );
    Ok(())
}

fn status(mode: OutputMode) -> Result<()> {
    let store = DriveTokenStore::load()?;
    let authorized_at = store
        .authorized_at
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string());

    match mode {
        OutputMode::Json => println!(
            "{}",
            serde_json::json!({
                "authorized": store.is_authorized(),
                "authorized_at": authorized_at,
                "token_file": store.path(),
            })
        ),
        OutputMode::Tty => {
            if store.is_authorized() {
                println!(
                    "Authorized with Google Drive{}",
                    authorized_at.map(|t| format!(" since {}", t)).unwrap_or_default()
                );
            } else {
                println!("Not authorized. Run 'recsync drive init'.");
            }
        }
    }
    Ok(())
}

fn logout() -> Result<()> {
    let mut store = DriveTokenStore::load()?;
    if !store.is_authorized() {
        println!("Not authorized with Google Drive.");
        return Ok(());
    }
    store.clear();
    store.save()?;
    println!("Removed Google Drive authorization.");
    Ok(())
}
