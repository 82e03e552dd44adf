use std::future::Future;

use super::error::ApiResult;
use super::wire::LoginData;
use crate::models::Recipe;

/// Remote recipe service as seen by the orchestrator.
///
/// Implementations never panic on expected failures; every outcome is an
/// [`ApiResult`].
pub trait RecipeApi: Send + Sync {
    /// Exchanges credentials for a bearer token. Needs no token itself.
    fn login(&self, email: &str, password: &str) -> impl Future<Output = ApiResult<LoginData>> + Send;

    /// Lists every recipe owned by the authenticated user.
    fn list_recipes(&self) -> impl Future<Output = ApiResult<Vec<Recipe>>> + Send;

    /// Creates a recipe. An id the server already knows yields `Conflict`.
    fn create_recipe(&self, recipe: &Recipe) -> impl Future<Output = ApiResult<Recipe>> + Send;

    fn delete_recipe(&self, id: i64) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Builds [`RecipeApi`] clients for a server address and optional token.
///
/// Connecting does no I/O; a malformed address fails here with
/// `MalformedServerUri`.
pub trait Connector: Send + Sync {
    type Api: RecipeApi + 'static;

    fn connect(&self, server_uri: &str, token: Option<&str>) -> ApiResult<Self::Api>;
}
