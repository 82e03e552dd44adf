//! In-memory stand-in for the recipe service.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::models::{Recipe, SyncStatus};
use crate::remote::wire::LoginData;
use crate::remote::{ApiResult, Connector, NetworkError, RecipeApi};

#[derive(Default)]
struct FakeState {
    recipes: BTreeMap<i64, Recipe>,
    users: HashMap<String, String>,
    tokens: HashSet<String>,
    issued: u64,
    list_failure: Option<NetworkError>,
    create_failures: HashMap<i64, NetworkError>,
    delete_failure: Option<NetworkError>,
    calls: Vec<String>,
}

/// Pauses the next `list_recipes` call until released.
pub(crate) struct ListHold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeServer {
    state: Arc<Mutex<FakeState>>,
    hold: Arc<Mutex<Option<ListHold>>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, email: &str, password: &str) -> Self {
        self.state
            .lock()
            .users
            .insert(email.to_string(), password.to_string());
        self
    }

    pub fn issue_token(&self) -> String {
        let mut state = self.state.lock();
        state.issued += 1;
        let token = format!("token-{}", state.issued);
        state.tokens.insert(token.clone());
        token
    }

    pub fn is_valid_token(&self, token: &str) -> bool {
        self.state.lock().tokens.contains(token)
    }

    pub fn seed(&self, recipe: Recipe) {
        let id = recipe.id.expect("seeded recipes need an id");
        self.state
            .lock()
            .recipes
            .insert(id, recipe.with_sync_status(SyncStatus::Synced));
    }

    pub fn recipe(&self, id: i64) -> Option<Recipe> {
        self.state.lock().recipes.get(&id).cloned()
    }

    pub fn fail_list(&self, kind: Option<NetworkError>) {
        self.state.lock().list_failure = kind;
    }

    pub fn fail_create(&self, id: i64, kind: NetworkError) {
        self.state.lock().create_failures.insert(id, kind);
    }

    pub fn fail_delete(&self, kind: Option<NetworkError>) {
        self.state.lock().delete_failure = kind;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.list_failure = None;
        state.create_failures.clear();
        state.delete_failure = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.as_str() == name)
            .count()
    }

    pub fn hold_next_list(&self) -> ListHold {
        let hold = ListHold {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        let handle = ListHold {
            entered: hold.entered.clone(),
            release: hold.release.clone(),
        };
        *self.hold.lock() = Some(hold);
        handle
    }
}

pub(crate) struct FakeConnector {
    server: FakeServer,
}

impl FakeConnector {
    pub fn new(server: FakeServer) -> Self {
        Self { server }
    }
}

impl Connector for FakeConnector {
    type Api = FakeApi;

    fn connect(&self, server_uri: &str, token: Option<&str>) -> ApiResult<FakeApi> {
        if !(server_uri.starts_with("http://") || server_uri.starts_with("https://")) {
            return Err(NetworkError::MalformedServerUri);
        }
        Ok(FakeApi {
            server: self.server.clone(),
            token: token.map(str::to_string),
        })
    }
}

pub(crate) struct FakeApi {
    server: FakeServer,
    token: Option<String>,
}

impl FakeApi {
    fn authorize(&self, state: &FakeState) -> ApiResult<()> {
        match &self.token {
            Some(token) if state.tokens.contains(token) => Ok(()),
            _ => Err(NetworkError::Unauthorized),
        }
    }
}

impl RecipeApi for FakeApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginData> {
        self.server.state.lock().calls.push("login".into());
        let known = self.server.state.lock().users.get(email).cloned();
        match known {
            Some(expected) if expected == password => Ok(LoginData {
                email: Some(email.to_string()),
                username: email.split('@').next().unwrap_or(email).to_string(),
                token: self.server.issue_token(),
            }),
            _ => Err(NetworkError::Unauthorized),
        }
    }

    async fn list_recipes(&self) -> ApiResult<Vec<Recipe>> {
        self.server.state.lock().calls.push("list".into());

        let hold = self.server.hold.lock().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let state = self.server.state.lock();
        self.authorize(&state)?;
        if let Some(kind) = state.list_failure {
            return Err(kind);
        }
        Ok(state.recipes.values().cloned().collect())
    }

    async fn create_recipe(&self, recipe: &Recipe) -> ApiResult<Recipe> {
        let mut state = self.server.state.lock();
        state.calls.push("create".into());
        self.authorize(&state)?;

        let id = match recipe.id {
            Some(id) => id,
            None => state.recipes.keys().next_back().map_or(1, |max| max + 1),
        };
        if let Some(kind) = state.create_failures.get(&id) {
            return Err(*kind);
        }
        if state.recipes.contains_key(&id) {
            return Err(NetworkError::Conflict);
        }

        let stored = Recipe {
            id: Some(id),
            sync_status: SyncStatus::Synced,
            ..recipe.clone()
        };
        state.recipes.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_recipe(&self, id: i64) -> ApiResult<()> {
        let mut state = self.server.state.lock();
        state.calls.push("delete".into());
        self.authorize(&state)?;

        if let Some(kind) = state.delete_failure {
            return Err(kind);
        }
        match state.recipes.remove(&id) {
            Some(_) => Ok(()),
            None => Err(NetworkError::Unknown(400)),
        }
    }
}
