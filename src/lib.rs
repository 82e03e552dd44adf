//! The `recipes` client and `recipes-server`.
//!
//! The sync logic lives in `recipe-sync-core`; this crate supplies the SQLite
//! store, the config-file credential store, configuration and the server.

pub mod config;
pub mod credentials;
pub mod db;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use recipe_sync_core::{HttpConnector, OrchestratorConfig, SyncOrchestrator};

use config::Config;
use credentials::ConfigFileCredentials;
use db::{init_db, SqliteRecipeStore};

/// Orchestrator wired to the on-disk collaborators.
pub type RecipesClient = SyncOrchestrator<SqliteRecipeStore, ConfigFileCredentials, HttpConnector>;

/// Opens the database and restores the session saved in the config file.
pub async fn open_client(config: &Config) -> Result<RecipesClient, Box<dyn std::error::Error>> {
    let pool = init_db(&config.database_path.value).await?;
    let store = Arc::new(SqliteRecipeStore::new(pool));
    let connector = HttpConnector::new(Duration::from_secs(config.sync.timeout_secs));
    let orchestrator_config = OrchestratorConfig {
        sync_on_login: config.sync.sync_on_login,
    };

    let client = SyncOrchestrator::new(
        store,
        ConfigFileCredentials::from_config(config),
        connector,
        orchestrator_config,
    );
    let state = client.restore();
    tracing::debug!("Restored session state: {}", state);
    Ok(client)
}

#[cfg(test)]
mod tests {
    //! The on-disk client against an in-process recipe server over HTTP.

    use super::*;
    use crate::server::{hash_password, router, AppState, RecipeDatabase, TokenStore, UserStore};
    use recipe_sync_core::remote::wire::RecipeRequest;
    use recipe_sync_core::{
        FailureKind, LocalStore, LoginError, NetworkError, Recipe, SyncState, SyncStatus,
    };
    use std::path::Path;
    use tempfile::TempDir;

    const EMAIL: &str = "anna@example.com";
    const PASSWORD: &str = "secret";

    struct TestContext {
        temp_dir: TempDir,
        server_url: String,
    }

    impl TestContext {
        async fn new() -> Self {
            Self::with_server_recipes(&[]).await
        }

        /// Starts a server whose database already holds `recipes` for anna.
        async fn with_server_recipes(recipes: &[(i64, &str, i64)]) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let server_dir = temp_dir.path().join("server");
            std::fs::create_dir_all(&server_dir).unwrap();
            std::fs::write(
                server_dir.join("users.yaml"),
                format!(
                    "users:\n  - email: {}\n    username: anna\n    password_sha256: {}\n",
                    EMAIL,
                    hash_password(PASSWORD)
                ),
            )
            .unwrap();

            let mut db = RecipeDatabase::open(server_dir.join("recipes.yaml")).unwrap();
            for (id, title, timestamp) in recipes {
                db.create(
                    "anna",
                    RecipeRequest {
                        id: Some(*id),
                        title: title.to_string(),
                        body: format!("{} body", title),
                        timestamp: Some(*timestamp),
                    },
                )
                .unwrap();
            }

            let state = AppState::new(
                db,
                UserStore::load(&server_dir),
                Arc::new(TokenStore::default()),
            );
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router(state)).await.unwrap();
            });

            std::fs::write(
                temp_dir.path().join("config.yaml"),
                "database_path: client/recipes.db\nsync:\n  sync_on_login: false\n  timeout_secs: 5\n",
            )
            .unwrap();

            Self {
                temp_dir,
                server_url: format!("http://{}", addr),
            }
        }

        fn config_path(&self) -> std::path::PathBuf {
            self.temp_dir.path().join("config.yaml")
        }

        async fn client(&self) -> RecipesClient {
            let config = Config::load(Some(self.config_path())).unwrap();
            open_client(&config).await.unwrap()
        }

        fn server_file(&self) -> String {
            std::fs::read_to_string(server_recipes(self.temp_dir.path())).unwrap()
        }
    }

    fn server_recipes(root: &Path) -> std::path::PathBuf {
        root.join("server").join("recipes.yaml")
    }

    #[tokio::test]
    async fn test_offline_insert_is_pushed_after_login() {
        let ctx = TestContext::new().await;
        let client = ctx.client().await;
        assert_eq!(client.state(), SyncState::Empty);

        let id = client
            .insert_recipe(Recipe::new("Pancakes", "Flour, milk, eggs."))
            .await
            .unwrap();
        let stored = client.recipe(id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Pending);

        client.login(&ctx.server_url, EMAIL, PASSWORD).await.unwrap();
        assert_eq!(client.state(), SyncState::Success);
        let still_pending = client.recipe(id).await.unwrap().unwrap();
        assert_eq!(still_pending.sync_status, SyncStatus::Pending);

        let report = client.sync_all().await.unwrap();
        assert_eq!(report.pushed, vec![id]);
        assert!(report.is_clean());

        let synced = client.recipe(id).await.unwrap().unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert!(ctx.server_file().contains("Pancakes"));

        let details = client.store().sync_details(id).await.unwrap().unwrap();
        assert!(details.last_sync_at.is_some());
        assert_eq!(details.sync_error, None);
    }

    #[tokio::test]
    async fn test_conflicting_push_marks_error_and_keeps_record() {
        let ctx = TestContext::with_server_recipes(&[(1, "Server soup", 100)]).await;
        let client = ctx.client().await;

        let id = client
            .insert_recipe(Recipe::new("Local soup", "Newer text."))
            .await
            .unwrap();
        assert_eq!(id, 1);

        client.login(&ctx.server_url, EMAIL, PASSWORD).await.unwrap();
        let report = client.sync_all().await.unwrap();

        assert_eq!(report.failed, vec![(1, NetworkError::Conflict)]);
        let record = client.recipe(1).await.unwrap().unwrap();
        assert_eq!(record.title, "Local soup");
        assert_eq!(record.sync_status, SyncStatus::Error);

        let details = client.store().sync_details(1).await.unwrap().unwrap();
        assert!(details.sync_error.is_some());
        assert_eq!(client.state(), SyncState::Success);
    }

    #[tokio::test]
    async fn test_newer_server_records_are_pulled() {
        let now = recipe_sync_core::models::now_millis();
        let ctx = TestContext::with_server_recipes(&[(7, "Borscht", now), (8, "Toast", now)]).await;
        let client = ctx.client().await;

        client.login(&ctx.server_url, EMAIL, PASSWORD).await.unwrap();
        let report = client.sync_all().await.unwrap();

        assert_eq!(report.pulled, vec![7, 8]);
        let pulled = client.recipe(7).await.unwrap().unwrap();
        assert_eq!(pulled.content, "Borscht body");
        assert_eq!(pulled.sync_status, SyncStatus::Synced);

        let second = client.sync_all().await.unwrap();
        assert!(second.pulled.is_empty() && second.pushed.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reaches_server() {
        let ctx = TestContext::with_server_recipes(&[(3, "Stew", 100)]).await;
        let client = ctx.client().await;
        client.login(&ctx.server_url, EMAIL, PASSWORD).await.unwrap();
        client.sync_all().await.unwrap();

        let stew = client.recipe(3).await.unwrap().unwrap();
        client.delete_recipe(&stew).await.unwrap();

        assert!(client.recipe(3).await.unwrap().is_none());
        assert!(client.store().tombstones().await.unwrap().is_empty());
        assert!(!ctx.server_file().contains("Stew"));
    }

    #[tokio::test]
    async fn test_bad_password_is_unauthorized() {
        let ctx = TestContext::new().await;
        let client = ctx.client().await;

        let err = client
            .login(&ctx.server_url, EMAIL, "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::Network(NetworkError::Unauthorized)));
        assert_eq!(
            client.state(),
            SyncState::Failure(FailureKind::Network(NetworkError::Unauthorized))
        );
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_session_survives_restart_until_logout() {
        let ctx = TestContext::new().await;
        {
            let client = ctx.client().await;
            client.login(&ctx.server_url, EMAIL, PASSWORD).await.unwrap();
        }

        let restored = ctx.client().await;
        assert!(restored.is_authenticated());
        assert_eq!(restored.state(), SyncState::Success);
        restored.sync_all().await.unwrap();

        restored.logout().unwrap();
        assert_eq!(restored.state(), SyncState::Empty);

        let after_logout = ctx.client().await;
        assert!(!after_logout.is_authenticated());
        let config = Config::load(Some(ctx.config_path())).unwrap();
        assert_eq!(config.sync.email.as_deref(), Some(EMAIL));
        assert_eq!(config.sync.token, None);
    }
}
