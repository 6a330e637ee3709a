//! Proxy access: the same contract served by a remote crossview API.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ListQuery, Repository};
use crate::error::{Error, Result};
use crate::kubernetes::crossplane::{
    ClaimSummary, CompositeResourceSummary, CompositionSummary, FunctionSummary, PackageSummary,
};
use crate::kubernetes::{ClusterContext, ManagedResourceSet, NamespaceSummary, Page};

/// Repository backed by a remote crossview API endpoint
pub struct ProxyRepository {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct CurrentContextBody {
    context: Option<String>,
}

#[derive(Deserialize)]
struct HealthBody {
    #[serde(default)]
    connected: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

impl ProxyRepository {
    /// Build a proxy against a base URL such as `https://host:3001/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(operation = %operation, url = %url, "proxy request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| Error::Proxy {
                operation: operation.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(Error::ProxyStatus {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|source| Error::Proxy {
            operation: operation.to_string(),
            source,
        })
    }
}

/// Build the optional-context query fragment
fn context_query(context: Option<&str>) -> Vec<(&'static str, String)> {
    context
        .map(|ctx| vec![("context", ctx.to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl Repository for ProxyRepository {
    async fn list_contexts(&self) -> Result<Vec<ClusterContext>> {
        self.get_json("list contexts", "/contexts", &[]).await
    }

    async fn current_context(&self) -> Result<Option<String>> {
        match self
            .get_json::<CurrentContextBody>("get current context", "/contexts/current", &[])
            .await
        {
            Ok(body) => Ok(body.context),
            Err(err) => {
                debug!(error = %err, "current-context probe failed");
                Ok(None)
            }
        }
    }

    async fn set_current_context(&self, name: &str) -> Result<()> {
        let operation = "set current context";
        let url = format!("{}/contexts/current", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "context": name }))
            .send()
            .await
            .map_err(|source| Error::Proxy {
                operation: operation.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            return Err(Error::ProxyStatus {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn is_connected(&self, context: Option<&str>) -> bool {
        match self
            .get_json::<HealthBody>("health check", "/health", &context_query(context))
            .await
        {
            Ok(body) => body.connected,
            Err(err) => {
                debug!(error = %err, "health check failed");
                false
            }
        }
    }

    async fn list_namespaces(&self, context: Option<&str>) -> Result<Vec<NamespaceSummary>> {
        self.get_json("list namespaces", "/namespaces", &context_query(context))
            .await
    }

    async fn list(&self, query: ListQuery<'_>) -> Result<Page> {
        let mut params = vec![
            ("apiVersion", query.api_version.to_string()),
            ("kind", query.kind.to_string()),
        ];
        if let Some(namespace) = query.namespace {
            params.push(("namespace", namespace.to_string()));
        }
        if let Some(context) = query.context {
            params.push(("context", context.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(token) = query.continue_token {
            params.push(("continue", token.to_string()));
        }
        if let Some(plural) = query.plural {
            params.push(("plural", plural.to_string()));
        }

        self.get_json("list resources", "/resources", &params).await
    }

    async fn get(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
        plural: Option<&str>,
    ) -> Result<Value> {
        let mut params = vec![
            ("apiVersion", api_version.to_string()),
            ("kind", kind.to_string()),
            ("name", name.to_string()),
        ];
        if let Some(namespace) = namespace {
            params.push(("namespace", namespace.to_string()));
        }
        if let Some(context) = context {
            params.push(("context", context.to_string()));
        }
        if let Some(plural) = plural {
            params.push(("plural", plural.to_string()));
        }

        match self.get_json("get resource", "/resource", &params).await {
            Err(Error::ProxyStatus { status: 404, .. }) => Err(Error::ResourceNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
            other => other,
        }
    }

    async fn list_events(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
    ) -> Vec<Value> {
        let mut params = vec![("kind", kind.to_string()), ("name", name.to_string())];
        if let Some(namespace) = namespace {
            params.push(("namespace", namespace.to_string()));
        }
        if let Some(context) = context {
            params.push(("context", context.to_string()));
        }

        match self.get_json("list events", "/events", &params).await {
            Ok(events) => events,
            Err(err) => {
                warn!(kind = %kind, name = %name, error = %err, "event query through proxy failed");
                Vec::new()
            }
        }
    }

    async fn list_providers(&self, context: Option<&str>) -> Result<Vec<PackageSummary>> {
        self.get_json(
            "list providers",
            "/crossplane/providers",
            &context_query(context),
        )
        .await
    }

    async fn list_functions(&self, context: Option<&str>) -> Result<Vec<FunctionSummary>> {
        self.get_json(
            "list functions",
            "/crossplane/functions",
            &context_query(context),
        )
        .await
    }

    async fn list_compositions(&self, context: Option<&str>) -> Result<Vec<CompositionSummary>> {
        self.get_json(
            "list compositions",
            "/crossplane/compositions",
            &context_query(context),
        )
        .await
    }

    async fn list_composite_resource_definitions(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.get_json(
            "list composite resource definitions",
            "/crossplane/xrds",
            &context_query(context),
        )
        .await
    }

    async fn list_composite_resources(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<CompositeResourceSummary>> {
        self.get_json(
            "list composite resources",
            "/crossplane/composite-resources",
            &context_query(context),
        )
        .await
    }

    async fn list_claims(&self, context: Option<&str>) -> Result<Vec<ClaimSummary>> {
        self.get_json("list claims", "/crossplane/claims", &context_query(context))
            .await
    }

    async fn list_managed_resources(
        &self,
        context: Option<&str>,
        force_refresh: bool,
    ) -> Result<ManagedResourceSet> {
        let mut params = context_query(context);
        if force_refresh {
            params.push(("refresh", "true".to_string()));
        }
        self.get_json("list managed resources", "/crossplane/managed", &params)
            .await
    }
}
