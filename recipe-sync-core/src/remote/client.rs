//! HTTP client for the recipe service.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::api::{Connector, RecipeApi};
use super::error::{ApiResult, NetworkError};
use super::wire::{BackendRecipe, LoginData, LoginRequest, LoginResponse, RecipeRequest, RecipeResponse};
use crate::models::Recipe;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`RecipeApi`].
#[derive(Clone)]
pub struct RemoteClient {
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl RemoteClient {
    pub fn new(server_uri: &str, token: Option<String>) -> ApiResult<Self> {
        Self::with_timeout(server_uri, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        server_uri: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let base_url = parse_base_url(server_uri)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                NetworkError::from(e)
            })?;

        Ok(Self {
            base_url,
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| NetworkError::MalformedServerUri)?;
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        builder.send().await.map_err(|e| {
            tracing::warn!("Request failed: {}", e);
            NetworkError::from(e)
        })
    }
}

/// Accepts `http(s)://host[:port][/prefix]` and normalizes the trailing
/// slash so relative joins keep any path prefix.
fn parse_base_url(server_uri: &str) -> ApiResult<Url> {
    let trimmed = server_uri.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{}/", trimmed)).map_err(|e| {
        tracing::warn!("Invalid server URI '{}': {}", server_uri, e);
        NetworkError::MalformedServerUri
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => {
            tracing::warn!("Unsupported server URI '{}'", server_uri);
            Err(NetworkError::MalformedServerUri)
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await.map_err(NetworkError::from)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!("Failed to decode response body: {}", e);
        NetworkError::Serialization
    })
}

fn check_status(response: &Response) -> ApiResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NetworkError::from_status(status))
    }
}

impl RecipeApi for RemoteClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginData> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(self.request(Method::POST, "users/login")?.json(&body))
            .await?;

        // The login endpoint answers bad credentials with 400.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(NetworkError::Unauthorized);
        }
        check_status(&response)?;

        let login: LoginResponse = read_json(response).await?;
        tracing::info!("Logged in as {}", login.data.username);
        Ok(login.data)
    }

    async fn list_recipes(&self) -> ApiResult<Vec<Recipe>> {
        let response = self.send(self.request(Method::GET, "recipes")?).await?;
        check_status(&response)?;

        let recipes: Vec<BackendRecipe> = read_json(response).await?;
        tracing::debug!("Server returned {} recipes", recipes.len());
        Ok(recipes.into_iter().map(Recipe::from).collect())
    }

    async fn create_recipe(&self, recipe: &Recipe) -> ApiResult<Recipe> {
        let body = RecipeRequest::from(recipe);
        let response = self
            .send(self.request(Method::POST, "recipes")?.json(&body))
            .await?;
        check_status(&response)?;

        let created: RecipeResponse = read_json(response).await?;
        Ok(created.recipe.into())
    }

    async fn delete_recipe(&self, id: i64) -> ApiResult<()> {
        let response = self
            .send(self.request(Method::DELETE, &format!("recipes/{}", id))?)
            .await?;
        check_status(&response)
    }
}

/// Connects [`RemoteClient`]s with a fixed request timeout.
#[derive(Debug, Clone, Copy)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    type Api = RemoteClient;

    fn connect(&self, server_uri: &str, token: Option<&str>) -> ApiResult<RemoteClient> {
        RemoteClient::with_timeout(server_uri, token.map(str::to_string), self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = RemoteClient::new("http://localhost:8080/api", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api/");

        let url = client.base_url.join("recipes/3").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/recipes/3");
    }

    #[test]
    fn test_trailing_slashes_are_normalized() {
        let client = RemoteClient::new(" https://recipes.example.com// ", None).unwrap();
        assert_eq!(client.base_url(), "https://recipes.example.com/");
    }

    #[test]
    fn test_malformed_uris_are_rejected() {
        for uri in ["", "not a url", "localhost:8080", "ftp://example.com", "http://"] {
            assert_eq!(
                RemoteClient::new(uri, None).unwrap_err(),
                NetworkError::MalformedServerUri,
                "uri {:?}",
                uri
            );
        }
    }

    #[test]
    fn test_debug_hides_token() {
        let client = RemoteClient::new("http://localhost", Some("secret".into())).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("authenticated: true"));
    }

    #[test]
    fn test_connector_validates_uri() {
        let connector = HttpConnector::default();
        assert!(connector.connect("http://127.0.0.1:9", Some("t")).is_ok());
        assert!(connector.connect("::", None).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_no_internet() {
        // Port 9 (discard) is closed on test hosts; connection is refused.
        let client =
            RemoteClient::with_timeout("http://127.0.0.1:9", None, Duration::from_secs(2))
                .unwrap();
        let err = client.list_recipes().await.unwrap_err();
        assert!(
            matches!(err, NetworkError::NoInternet | NetworkError::RequestTimeout),
            "got {:?}",
            err
        );
    }
}
