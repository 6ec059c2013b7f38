// Entrypoint for the CLI application.
// - Keeps `main` small: load config, log in, hand everything to the
//   command loop, and tear the browser down on the way out.
// - Returns `anyhow::Result` so collaborator failures surface with
//   context instead of panicking.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use learn_cli::config::{self, D2dConfig};
use learn_cli::portal::{PortalSession, PORTAL_URL};
use learn_cli::relay::DropboxRelay;
use learn_cli::ui;

#[tokio::main]
async fn main() -> Result<()> {
    let config = D2dConfig::load_or_default(config::CONFIG_FILE);
    let token = config::load_dropbox_token();
    let (username, password) = config::prompt_credentials()?;

    let portal = PortalSession::connect(&config).await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message(format!("Logging in to {}...", PORTAL_URL));
    let logged_in = portal.login(&username, &password).await;
    spinner.finish_and_clear();

    match logged_in {
        Ok(true) => println!("Logged in."),
        Ok(false) => {
            // The one fatal case: the browser did not land on the
            // post-login home page.
            println!("Error: Invalid username or password");
            portal.close().await;
            std::process::exit(2);
        }
        Err(e) => {
            portal.close().await;
            return Err(e);
        }
    }

    let download_dir = config
        .download_dir()
        .unwrap_or_else(|| PathBuf::from("."));
    let relay = DropboxRelay::new(token, download_dir);

    let mut portal = portal;
    let outcome = ui::command_loop(&mut portal, &relay).await;

    // Best-effort close, whatever the loop's outcome.
    portal.close().await;
    outcome
}
