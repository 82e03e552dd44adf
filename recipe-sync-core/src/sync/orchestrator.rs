//! Session ownership and end-to-end sync passes.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};

use super::error::{LoginError, RecipeError, SyncError};
use super::state::{FailureKind, SyncState};
use crate::credentials::{CredentialError, CredentialStore, Credentials};
use crate::diff::compute_diff;
use crate::models::{now_millis, Recipe, SyncStatus};
use crate::remote::{Connector, NetworkError, RecipeApi};
use crate::store::{LocalStore, StoreError};

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Run a full sync right after a successful login.
    pub sync_on_login: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sync_on_login: true,
        }
    }
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: Vec<i64>,
    pub pulled: Vec<i64>,
    /// Pushes the server rejected. Those records are marked `ERROR`.
    pub failed: Vec<(i64, NetworkError)>,
    /// Remote deletes confirmed during this pass.
    pub deleted: Vec<i64>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An authenticated session. Replaced wholesale on login and logout; the
/// epoch tells in-flight passes whether they still belong to it.
struct Session<A> {
    epoch: u64,
    credentials: Credentials,
    api: A,
}

struct SessionSlot<A> {
    epoch: u64,
    current: Option<Arc<Session<A>>>,
}

enum PushOutcome {
    Pushed,
    Failed(NetworkError),
}

/// Drives login, logout and sync passes over a [`LocalStore`] and a remote
/// [`RecipeApi`], publishing progress as a [`SyncState`].
pub struct SyncOrchestrator<S, K, C: Connector> {
    store: Arc<S>,
    credentials: K,
    connector: C,
    config: OrchestratorConfig,
    slot: RwLock<SessionSlot<C::Api>>,
    state: watch::Sender<SyncState>,
    sync_gate: Mutex<()>,
    login_gate: Mutex<()>,
}

impl<S, K, C> SyncOrchestrator<S, K, C>
where
    S: LocalStore,
    K: CredentialStore,
    C: Connector,
{
    pub fn new(store: Arc<S>, credentials: K, connector: C, config: OrchestratorConfig) -> Self {
        let (state, _) = watch::channel(SyncState::Empty);
        Self {
            store,
            credentials,
            connector,
            config,
            slot: RwLock::new(SessionSlot {
                epoch: 0,
                current: None,
            }),
            state,
            sync_gate: Mutex::new(()),
            login_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Rebuilds the session from persisted credentials. Makes no network call.
    pub fn restore(&self) -> SyncState {
        match self.credentials.load() {
            Ok(Some(credentials)) => {
                match self
                    .connector
                    .connect(&credentials.server_uri, Some(&credentials.token))
                {
                    Ok(api) => {
                        tracing::info!(
                            "Restored session for {} on {}",
                            credentials.email,
                            credentials.server_uri
                        );
                        self.install(credentials, api);
                    }
                    Err(kind) => {
                        tracing::warn!(
                            "Saved server URI {} is unusable: {}",
                            credentials.server_uri,
                            kind
                        );
                        self.state
                            .send_replace(SyncState::Failure(FailureKind::Network(kind)));
                    }
                }
            }
            Ok(None) => {
                self.state.send_replace(SyncState::Empty);
            }
            Err(e) => {
                tracing::warn!("Failed to load credentials: {}", e);
                self.state
                    .send_replace(SyncState::Failure(FailureKind::Storage(e.to_string())));
            }
        }
        self.state()
    }

    /// Authenticates and installs a new session, then syncs if configured.
    ///
    /// A failed login leaves any previous session in place.
    pub async fn login(
        &self,
        server_uri: &str,
        email: &str,
        password: &str,
    ) -> Result<(), LoginError> {
        {
            let _gate = self.login_gate.lock().await;
            self.state.send_replace(SyncState::Pending);

            if let Err(e) = self.authenticate(server_uri, email, password).await {
                tracing::warn!("Login to {} failed: {}", server_uri, e);
                self.state.send_replace(SyncState::Failure(e.failure_kind()));
                return Err(e);
            }
        }

        if self.config.sync_on_login {
            match self.sync_all().await {
                Ok(report) => tracing::debug!("Initial sync finished: {:?}", report),
                Err(e) => tracing::warn!("Initial sync failed: {}", e),
            }
        }
        Ok(())
    }

    async fn authenticate(
        &self,
        server_uri: &str,
        email: &str,
        password: &str,
    ) -> Result<(), LoginError> {
        let anonymous = self.connector.connect(server_uri, None)?;
        let login = anonymous.login(email, password).await?;
        tracing::info!("Authenticated as {}", login.username);

        let credentials = Credentials {
            server_uri: server_uri.trim().to_string(),
            email: email.to_string(),
            token: login.token,
        };
        let api = self
            .connector
            .connect(&credentials.server_uri, Some(&credentials.token))?;
        self.credentials.save(&credentials)?;
        self.install(credentials, api);
        Ok(())
    }

    /// Ends the session. Passes still in flight drop their results.
    pub fn logout(&self) -> Result<(), CredentialError> {
        {
            let mut slot = self.slot.write();
            slot.epoch += 1;
            if let Some(session) = slot.current.take() {
                tracing::info!("Logged out {}", session.credentials.email);
            }
            self.state.send_replace(SyncState::Empty);
        }
        self.credentials.clear()
    }

    /// Reconciles the local store with the server.
    ///
    /// Calls are single-flight: a second caller waits for the running pass
    /// and then runs its own.
    pub async fn sync_all(&self) -> Result<SyncReport, SyncError> {
        let _gate = self.sync_gate.lock().await;
        let session = self.current_session().ok_or(SyncError::NotAuthenticated)?;
        self.emit_if_current(session.epoch, SyncState::Pending)?;

        match self.run_pass(&session).await {
            Ok(report) => {
                self.emit_if_current(session.epoch, SyncState::Success)?;
                tracing::info!(
                    "Sync finished: {} pushed, {} pulled, {} failed, {} deleted",
                    report.pushed.len(),
                    report.pulled.len(),
                    report.failed.len(),
                    report.deleted.len()
                );
                Ok(report)
            }
            Err(e) => {
                if let Some(kind) = e.failure_kind() {
                    tracing::warn!("Sync failed: {}", e);
                    self.emit_if_current(session.epoch, SyncState::Failure(kind))?;
                }
                Err(e)
            }
        }
    }

    async fn run_pass(&self, session: &Session<C::Api>) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let local = self.store.get_all().await?;

        self.flush_tombstones(session, &mut report).await?;

        let listed = session.api.list_recipes().await;
        self.ensure_current(session.epoch)?;
        let remote = listed?;

        let awaiting_delete: HashSet<i64> = self.store.tombstones().await?.into_iter().collect();
        let remote: Vec<Recipe> = remote
            .into_iter()
            .filter(|r| r.id.map_or(true, |id| !awaiting_delete.contains(&id)))
            .collect();

        let diff = compute_diff(&local, &remote);
        tracing::debug!(
            "{} local, {} remote: {} to push, {} to pull",
            local.len(),
            remote.len(),
            diff.to_push.len(),
            diff.to_pull.len()
        );

        for recipe in &diff.to_push {
            let Some(id) = recipe.id else { continue };
            match self.push_and_mark(session, id, recipe).await? {
                PushOutcome::Pushed => report.pushed.push(id),
                PushOutcome::Failed(kind) => report.failed.push((id, kind)),
            }
        }

        for recipe in diff.to_pull {
            self.ensure_current(session.epoch)?;
            if !self.still_behind(&recipe).await? {
                tracing::debug!("{} changed locally during the pass; not pulling", recipe);
                continue;
            }
            let id = self
                .store
                .insert(&recipe.with_sync_status(SyncStatus::Synced))
                .await?;
            self.store
                .update_sync_status(id, SyncStatus::Synced, now_millis(), None)
                .await?;
            report.pulled.push(id);
        }

        Ok(report)
    }

    /// Re-checks a pull against the store as it is now, not the snapshot
    /// the diff was computed from.
    async fn still_behind(&self, remote: &Recipe) -> Result<bool, SyncError> {
        let Some(id) = remote.id else {
            return Ok(false);
        };
        if self.store.tombstones().await?.contains(&id) {
            return Ok(false);
        }
        Ok(match self.store.get_by_id(id).await? {
            Some(current) => current.timestamp < remote.timestamp,
            None => true,
        })
    }

    async fn flush_tombstones(
        &self,
        session: &Session<C::Api>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        for id in self.store.tombstones().await? {
            let outcome = session.api.delete_recipe(id).await;
            self.ensure_current(session.epoch)?;
            match outcome {
                Ok(()) => {
                    self.store.remove_tombstone(id).await?;
                    report.deleted.push(id);
                }
                Err(kind) if already_gone(kind) => {
                    tracing::debug!("Recipe {} was not on the server", id);
                    self.store.remove_tombstone(id).await?;
                }
                Err(kind) => tracing::warn!("Remote delete of recipe {} still pending: {}", id, kind),
            }
        }
        Ok(())
    }

    async fn push_and_mark(
        &self,
        session: &Session<C::Api>,
        id: i64,
        recipe: &Recipe,
    ) -> Result<PushOutcome, SyncError> {
        let outcome = session.api.create_recipe(recipe).await;
        self.ensure_current(session.epoch)?;

        // An edit that landed while the request was in flight stays pending.
        match self.store.get_by_id(id).await? {
            Some(current) if current.timestamp == recipe.timestamp => {}
            _ => {
                tracing::debug!("{} changed during push; leaving its status", recipe);
                return Ok(match outcome {
                    Ok(_) => PushOutcome::Pushed,
                    Err(kind) => PushOutcome::Failed(kind),
                });
            }
        }

        match outcome {
            Ok(_) => {
                tracing::debug!("Pushed {}", recipe);
                self.store
                    .update_sync_status(id, SyncStatus::Synced, now_millis(), None)
                    .await?;
                Ok(PushOutcome::Pushed)
            }
            Err(kind) => {
                tracing::warn!("Failed to push {}: {}", recipe, kind);
                self.store
                    .update_sync_status(id, SyncStatus::Error, now_millis(), Some(&kind.to_string()))
                    .await?;
                Ok(PushOutcome::Failed(kind))
            }
        }
    }

    /// Validates and saves a recipe locally, then pushes it when logged in.
    ///
    /// Returns the local id. Remote failures only show up in the record's
    /// sync status.
    pub async fn insert_recipe(&self, recipe: Recipe) -> Result<i64, RecipeError> {
        recipe.validate()?;

        let mut recipe = recipe.with_sync_status(SyncStatus::Pending);
        let id = self.store.insert(&recipe).await?;
        recipe.id = Some(id);

        let Some(session) = self.current_session() else {
            tracing::debug!("Not logged in; {} stays pending", recipe);
            return Ok(id);
        };
        let Ok(_gate) = self.sync_gate.try_lock() else {
            tracing::debug!("Sync in progress; {} waits for the next pass", recipe);
            return Ok(id);
        };

        if let Err(e) = self.push_and_mark(&session, id, &recipe).await {
            tracing::warn!("Push of {} skipped: {}", recipe, e);
        }
        Ok(id)
    }

    /// Deletes locally, then remotely when possible. Unconfirmed remote
    /// deletes are retried by the next sync pass.
    pub async fn delete_recipe(&self, recipe: &Recipe) -> Result<(), RecipeError> {
        self.store.delete(recipe).await?;
        let Some(id) = recipe.id else {
            return Ok(());
        };

        let Some(session) = self.current_session() else {
            tracing::debug!("Not logged in; remote delete of recipe {} deferred", id);
            self.store.add_tombstone(id).await?;
            return Ok(());
        };

        match session.api.delete_recipe(id).await {
            Ok(()) => tracing::debug!("Deleted recipe {} on the server", id),
            Err(kind) if already_gone(kind) => {
                tracing::debug!("Recipe {} was not on the server", id)
            }
            Err(kind) => {
                tracing::warn!("Remote delete of recipe {} failed: {}", id, kind);
                self.store.add_tombstone(id).await?;
            }
        }
        Ok(())
    }

    pub async fn recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        self.store.get_all().await
    }

    pub async fn recipe(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        self.store.get_by_id(id).await
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot.read().current.is_some()
    }

    /// Credentials of the current session, if any.
    pub fn credentials(&self) -> Option<Credentials> {
        self.current_session().map(|s| s.credentials.clone())
    }

    fn install(&self, credentials: Credentials, api: C::Api) {
        let mut slot = self.slot.write();
        let epoch = slot.epoch + 1;
        slot.epoch = epoch;
        slot.current = Some(Arc::new(Session {
            epoch,
            credentials,
            api,
        }));
        self.state.send_replace(SyncState::Success);
    }

    fn current_session(&self) -> Option<Arc<Session<C::Api>>> {
        self.slot.read().current.clone()
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), SyncError> {
        if self.slot.read().epoch == epoch {
            Ok(())
        } else {
            tracing::debug!("Session epoch {} superseded", epoch);
            Err(SyncError::Superseded)
        }
    }

    /// Publishes `state` unless the session changed; checked and sent under
    /// the slot lock so a concurrent logout cannot interleave.
    fn emit_if_current(&self, epoch: u64, state: SyncState) -> Result<(), SyncError> {
        let slot = self.slot.read();
        if slot.epoch != epoch {
            return Err(SyncError::Superseded);
        }
        self.state.send_replace(state);
        Ok(())
    }
}

/// 400 on delete: the id is unknown to the server or owned by someone else.
fn already_gone(kind: NetworkError) -> bool {
    kind == NetworkError::Unknown(400)
}
