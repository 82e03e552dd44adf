use clap::Args;
use std::io::{self, Write};

use recipe_sync::RecipesClient;
use recipe_sync_core::{LocalStore, Recipe, SyncStatus};

use super::OutputFormat;

#[derive(Args)]
pub struct AddCommand {
    /// Recipe title
    title: String,

    /// Recipe text
    #[arg(long, short = 'b')]
    content: String,
}

impl AddCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        let recipe = Recipe::new(self.title.trim(), self.content.as_str());
        let id = client.insert_recipe(recipe).await?;
        print_saved(client, id).await
    }
}

#[derive(Args)]
pub struct EditCommand {
    /// Recipe ID
    id: i64,

    /// New title
    #[arg(long)]
    title: Option<String>,

    /// New recipe text
    #[arg(long, short = 'b')]
    content: Option<String>,
}

impl EditCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        if self.title.is_none() && self.content.is_none() {
            return Err("Nothing to change; pass --title and/or --content".into());
        }
        let recipe = find(client, self.id).await?;

        let title = self.title.clone().unwrap_or_else(|| recipe.title.clone());
        let content = self.content.clone().unwrap_or_else(|| recipe.content.clone());
        let id = client.insert_recipe(recipe.edited(title, content)).await?;
        print_saved(client, id).await
    }
}

#[derive(Args)]
pub struct ListCommand {
    /// Only show recipes with this sync status (pending, synced, error)
    #[arg(long)]
    status: Option<SyncStatus>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ListCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        let recipes = match self.status {
            Some(status) => client.store().get_by_sync_status(status).await?,
            None => client.recipes().await?,
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&recipes)?);
            }
            OutputFormat::Text => {
                if recipes.is_empty() {
                    println!("No recipes found");
                    return Ok(());
                }
                println!("{:<8}  {:<40}  STATUS", "ID", "TITLE");
                println!("{}", "-".repeat(60));
                for recipe in &recipes {
                    let id = recipe.id.map(|id| id.to_string()).unwrap_or_default();
                    println!(
                        "{:<8}  {:<40}  {}",
                        id,
                        truncate(&recipe.title, 40),
                        recipe.sync_status
                    );
                }
                println!("\nTotal: {} recipe(s)", recipes.len());
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ShowCommand {
    /// Recipe ID
    id: i64,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ShowCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        let recipe = find(client, self.id).await?;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&recipe)?);
            }
            OutputFormat::Text => {
                println!("{}", recipe.title);
                println!("{}", "=".repeat(recipe.title.chars().count().max(3)));
                println!();
                println!("{}", recipe.content);
                println!();
                println!("ID:          {}", self.id);
                println!("Modified:    {}", format_millis(recipe.timestamp));
                println!("Sync status: {}", recipe.sync_status);

                if let Some(details) = client.store().sync_details(self.id).await? {
                    if let Some(at) = details.last_sync_at {
                        println!("Last sync:   {}", format_millis(at));
                    }
                    if let Some(error) = details.sync_error {
                        println!("Sync error:  {}", error);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Recipe ID
    id: i64,

    /// Skip confirmation prompt
    #[arg(long, short)]
    force: bool,
}

impl DeleteCommand {
    pub async fn run(&self, client: &RecipesClient) -> Result<(), Box<dyn std::error::Error>> {
        let recipe = find(client, self.id).await?;

        if !self.force {
            print!("Delete recipe '{}'? [y/N] ", recipe.title);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        client.delete_recipe(&recipe).await?;
        println!("Deleted recipe: {}", recipe.title);

        let pending: Vec<i64> = client.store().tombstones().await?;
        if pending.contains(&self.id) {
            println!("The server has not confirmed the delete yet; it will be retried on the next sync.");
        }
        Ok(())
    }
}

async fn find(client: &RecipesClient, id: i64) -> Result<Recipe, Box<dyn std::error::Error>> {
    client
        .recipe(id)
        .await?
        .ok_or_else(|| format!("Recipe not found: {}", id).into())
}

async fn print_saved(client: &RecipesClient, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let recipe = find(client, id).await?;
    println!("Saved recipe {}: {} [{}]", id, recipe.title, recipe.sync_status);

    if recipe.sync_status == SyncStatus::Error {
        if let Some(error) = client
            .store()
            .sync_details(id)
            .await?
            .and_then(|d| d.sync_error)
        {
            println!("Push failed: {}", error);
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Soup", 10), "Soup");
        assert_eq!(truncate("A very long recipe title", 10), "A very ...");
    }

    #[test]
    fn test_format_millis_falls_back_to_raw_value() {
        assert_eq!(format_millis(i64::MAX), i64::MAX.to_string());
        assert!(format_millis(0).starts_with("19"));
    }
}
