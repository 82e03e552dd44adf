//! Sync CLI command.

use clap::Args;

use recipe_sync::RecipesClient;
use recipe_sync_core::{SyncError, SyncReport};

/// Reconcile local recipes with the server
#[derive(Args)]
pub struct SyncCommand {
    /// Also list the ids that moved in each direction
    #[arg(long, short)]
    verbose: bool,
}

impl SyncCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        println!("Syncing with server...");

        let report = match client.sync_all().await {
            Ok(report) => report,
            Err(SyncError::NotAuthenticated) => {
                return Err("Not logged in. Run 'recipes login' first.".into());
            }
            Err(e) => return Err(e.into()),
        };

        println!();
        print_line("pushed", &report.pushed, self.verbose);
        print_line("pulled", &report.pulled, self.verbose);
        if !report.deleted.is_empty() {
            print_line("deleted", &report.deleted, self.verbose);
        }
        for (id, kind) in &report.failed {
            println!("  ✗ recipe {}: {}", id, kind);
        }

        println!();
        println!("{}", summary(&report));
        Ok(())
    }
}

fn print_line(label: &str, ids: &[i64], verbose: bool) {
    if verbose && !ids.is_empty() {
        let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
        println!("  ✓ {} {} ({})", label, ids.len(), ids.join(", "));
    } else {
        println!("  ✓ {} {}", label, ids.len());
    }
}

fn summary(report: &SyncReport) -> String {
    if !report.is_clean() {
        format!(
            "Sync finished with {} failure(s); they will be retried next time.",
            report.failed.len()
        )
    } else if report.pushed.is_empty() && report.pulled.is_empty() && report.deleted.is_empty() {
        "Already up to date.".to_string()
    } else {
        "Sync complete.".to_string()
    }
}
