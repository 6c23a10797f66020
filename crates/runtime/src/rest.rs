//! Reference REST capability
//!
//! Maps the generic actions onto form/query HTTP requests:
//!
//! | action            | request                         |
//! |-------------------|---------------------------------|
//! | list              | `GET /v1/{segment}` (query)     |
//! | retrieve          | `GET /v1/{segment}/{id}` (query)|
//! | create            | `POST /v1/{segment}` (form)     |
//! | update            | `POST /v1/{segment}/{id}` (form)|
//! | delete / cancel   | `DELETE /v1/{segment}/{id}`     |
//!
//! Singletons have no identifier and use the collection path.

use crate::capability::Capability;
use crate::registry::ResourceRegistry;
use apidispatch_common::{DispatchError, Result};
use async_trait::async_trait;
use heck::ToSnakeCase;
use reqwest::{Client, Method, Response, Url};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Connection settings shared by every REST capability
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Scheme and host, without the `/v1` prefix
    pub base_url: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub user_agent: String,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            user_agent: format!("apidispatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// One resource reachable over HTTP
#[derive(Debug, Clone)]
pub struct RestCapability {
    client: Client,
    config: Arc<RestConfig>,
    /// URL segments below `/v1`, parent first
    segments: Vec<String>,
}

impl RestCapability {
    /// Capability for a top-level camelCase resource name
    pub fn new(config: RestConfig, resource: &str) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, Arc::new(config), resource))
    }

    fn with_client(client: Client, config: Arc<RestConfig>, resource: &str) -> Self {
        Self {
            client,
            config,
            segments: vec![resource.to_snake_case()],
        }
    }

    /// Build a registry with one capability per resource name, sharing a client
    pub fn registry<I, S>(config: RestConfig, names: I) -> Result<ResourceRegistry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client = build_client(&config)?;
        let config = Arc::new(config);

        let mut registry = ResourceRegistry::new();
        for name in names {
            let name = name.as_ref();
            let capability = Self::with_client(client.clone(), config.clone(), name);
            registry.register(name, Arc::new(capability));
        }
        Ok(registry)
    }

    /// Full URL for this resource, optionally addressing one object
    ///
    /// The identifier is pushed as a single percent-encoded path segment.
    pub fn url(&self, id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            DispatchError::backend(
                format!("Invalid base URL {}", self.config.base_url),
                Some(e.to_string()),
            )
        })?;

        {
            let mut path = url.path_segments_mut().map_err(|_| {
                DispatchError::backend(
                    format!("Base URL {} cannot carry a path", self.config.base_url),
                    None,
                )
            })?;
            path.pop_if_empty().push("v1").extend(&self.segments);
            if let Some(id) = id {
                if id.is_empty() || id == "." || id == ".." {
                    return Err(DispatchError::backend(
                        format!("Invalid identifier {:?} for /v1/{}", id, self.segments.join("/")),
                        None,
                    ));
                }
                path.push(id);
            }
        }

        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        id: Option<&str>,
        params: Map<String, Value>,
        as_form: bool,
    ) -> Result<Value> {
        let url = self.url(id)?;
        let pairs = flatten_params(&params);

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        request = if as_form {
            request.form(&pairs)
        } else {
            request.query(&pairs)
        };

        debug!(method = %method, url = %url, params = pairs.len(), "Sending request");

        let response = request.send().await.map_err(|e| {
            DispatchError::backend(
                format!("{} {} failed", method, url),
                Some(error_chain(&e)),
            )
        })?;

        handle_response(response, &method, &url).await
    }
}

#[async_trait]
impl Capability for RestCapability {
    async fn list(&self, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::GET, None, params, false).await
    }

    async fn retrieve(&self, id: Option<String>, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::GET, id.as_deref(), params, false).await
    }

    async fn create(&self, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::POST, None, params, true).await
    }

    async fn update(&self, id: Option<String>, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::POST, id.as_deref(), params, true).await
    }

    async fn delete(&self, id: String, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::DELETE, Some(&id), params, false).await
    }

    async fn cancel(&self, id: String, params: Map<String, Value>) -> Result<Value> {
        self.send(Method::DELETE, Some(&id), params, false).await
    }

    fn child(&self, name: &str) -> Option<Arc<dyn Capability>> {
        let mut child = self.clone();
        child.segments.push(name.to_snake_case());
        Some(Arc::new(child))
    }
}

fn build_client(config: &RestConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| DispatchError::backend("Failed to create HTTP client", Some(error_chain(&e))))
}

async fn handle_response(response: Response, method: &Method, url: &Url) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(|e| {
        DispatchError::backend(
            format!("Failed to read response from {} {}", method, url),
            Some(error_chain(&e)),
        )
    })?;

    if !status.is_success() {
        return Err(DispatchError::backend(
            format!("{} {} returned {}", method, url, status),
            Some(text),
        ));
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| {
        DispatchError::backend(
            format!("Invalid JSON from {} {}: {}", method, url, e),
            Some(text),
        )
    })
}

/// Flatten a parameter bag into bracket-notation pairs
///
/// `{"metadata": {"a": 1}, "expand": ["x"]}` becomes
/// `metadata[a]=1` and `expand[0]=x`. `null` values are dropped.
pub fn flatten_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_value(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_value(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{}[{}]", key, i), item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten_value(format!("{}[{}]", key, sub), item, pairs);
            }
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
