//! Login, logout and status.

use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

use recipe_sync::config::Config;
use recipe_sync::RecipesClient;
use recipe_sync_core::{LocalStore, SyncState, SyncStatus};

use super::OutputFormat;

#[derive(Args)]
pub struct LoginCommand {
    /// Server URL (defaults to sync.server_url)
    #[arg(long)]
    server: Option<String>,

    /// Account email (defaults to sync.email)
    #[arg(long)]
    email: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long)]
    password: Option<String>,
}

impl LoginCommand {
    pub async fn run(
        &self,
        client: &RecipesClient,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let server = match self.server.as_ref().or(config.sync.server_url.as_ref()) {
            Some(server) => server.clone(),
            None => prompt("Server URL: ")?,
        };
        let email = match self.email.as_ref().or(config.sync.email.as_ref()) {
            Some(email) => email.clone(),
            None => prompt("Email: ")?,
        };
        let password = match &self.password {
            Some(password) => password.clone(),
            None => prompt("Password: ")?,
        };

        client.login(&server, &email, &password).await?;
        println!("Logged in to {} as {}", server, email);

        if config.sync.sync_on_login {
            println!("Sync: {}", client.state());
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String, io::Error> {
    eprint!("{}", label);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();
    if input.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} cannot be empty", label.trim_end_matches([':', ' '])),
        ));
    }
    Ok(input)
}

#[derive(Serialize)]
struct StatusReport {
    logged_in: bool,
    server_url: Option<String>,
    email: Option<String>,
    state: String,
    pending: usize,
    synced: usize,
    error: usize,
    unconfirmed_deletes: usize,
}

#[derive(Args)]
pub struct StatusCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl StatusCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        let credentials = client.credentials();
        let store = client.store();

        let report = StatusReport {
            logged_in: client.is_authenticated(),
            server_url: credentials.as_ref().map(|c| c.server_uri.clone()),
            email: credentials.as_ref().map(|c| c.email.clone()),
            state: client.state().to_string(),
            pending: store.get_by_sync_status(SyncStatus::Pending).await?.len(),
            synced: store.get_by_sync_status(SyncStatus::Synced).await?.len(),
            error: store.get_by_sync_status(SyncStatus::Error).await?.len(),
            unconfirmed_deletes: store.tombstones().await?.len(),
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                println!("Sync Status");
                println!("===========");
                println!();
                match (&report.server_url, &report.email) {
                    (Some(server), Some(email)) => {
                        println!("Server:  {}", server);
                        println!("Account: {}", email);
                    }
                    _ => println!("Not logged in. Run 'recipes login' to connect."),
                }
                if matches!(client.state(), SyncState::Failure(_)) {
                    println!("Session: {}", report.state);
                }
                println!();
                println!("Pending:  {}", report.pending);
                println!("Synced:   {}", report.synced);
                println!("Error:    {}", report.error);
                if report.unconfirmed_deletes > 0 {
                    println!("Unconfirmed deletes: {}", report.unconfirmed_deletes);
                }
            }
        }
        Ok(())
    }
}
