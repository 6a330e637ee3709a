use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config, api::ListParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::cache::CachedEntry;
use super::credentials::{ClusterContext, CredentialSet, IN_CLUSTER_CONTEXT};
use crate::error::{Error, Result};

/// Timeout for connecting to a cluster API endpoint
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading cluster API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on the liveness probe discovery call
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Namespace listing entry, projected down to what the dashboard shows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub name: String,
    pub uid: String,
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Connection pool for multiple Kubernetes contexts.
///
/// Clients are built lazily per context and cached by context name, so
/// concurrent callers targeting different contexts never share a handle.
/// Switching the current context drops only the affected handle; handles
/// for other contexts stay bound to their own endpoint/credential pair.
///
/// The pool also owns the resolution and aggregation caches: the permanent
/// plural cache, the definition catalog cache (5 min TTL), and the managed
/// resource cache (10 min TTL). See the sibling modules for the operations
/// that populate them.
pub struct ClientPool {
    credentials: CredentialSet,
    current_context: RwLock<Option<String>>,
    clients: RwLock<HashMap<String, Client>>,
    /// (apiVersion, kind) -> plural; permanent for the process lifetime
    pub(super) plurals: RwLock<HashMap<String, String>>,
    /// context -> managed resource definitions
    pub(super) definitions: RwLock<HashMap<String, CachedEntry<Vec<Value>>>>,
    /// context -> merged managed resource instances
    pub(super) managed: RwLock<HashMap<String, CachedEntry<Vec<Value>>>>,
}

impl ClientPool {
    /// Create a pool from ambient credentials (in-cluster service account
    /// or kubeconfig). No I/O happens until a client is first requested.
    pub fn new() -> Result<Self> {
        Ok(Self::from_credentials(CredentialSet::load()?))
    }

    /// Create a pool from an already-loaded credential set
    pub fn from_credentials(credentials: CredentialSet) -> Self {
        let current = credentials.default_context();
        Self {
            credentials,
            current_context: RwLock::new(current),
            clients: RwLock::new(HashMap::new()),
            plurals: RwLock::new(HashMap::new()),
            definitions: RwLock::new(HashMap::new()),
            managed: RwLock::new(HashMap::new()),
        }
    }

    /// All contexts known to the credential set
    pub fn contexts(&self) -> Vec<ClusterContext> {
        self.credentials.contexts()
    }

    /// The currently selected context, if any
    pub async fn current_context(&self) -> Option<String> {
        self.current_context.read().await.clone()
    }

    /// Select a context by name.
    ///
    /// The named context's cached client handle is dropped: it may have
    /// been built against credentials that changed since, and the next
    /// call will rebuild it from the credential set.
    pub async fn set_current_context(&self, name: &str) -> Result<()> {
        if !self.credentials.has_context(name) {
            return Err(Error::ContextNotFound(name.to_string()));
        }

        *self.current_context.write().await = Some(name.to_string());
        self.invalidate(name).await;
        info!(context = %name, "switched current context");
        Ok(())
    }

    /// Drop the cached client handle for a context so the next call
    /// rebuilds it
    pub async fn invalidate(&self, context: &str) {
        self.clients.write().await.remove(context);
    }

    /// Resolve an optional caller-supplied context to a concrete name
    pub(super) async fn resolve_context(&self, context: Option<&str>) -> Result<String> {
        match context {
            Some(name) => {
                if !self.credentials.has_context(name) {
                    return Err(Error::ContextNotFound(name.to_string()));
                }
                Ok(name.to_string())
            }
            None => self
                .current_context
                .read()
                .await
                .clone()
                .ok_or_else(|| Error::ContextNotFound("<current>".to_string())),
        }
    }

    /// Resolve the context and return its client, building it on first use
    pub(super) async fn client_for(&self, context: Option<&str>) -> Result<(String, Client)> {
        let ctx = self.resolve_context(context).await?;
        let client = self.get_or_create_client(&ctx).await?;
        Ok((ctx, client))
    }

    async fn get_or_create_client(&self, context: &str) -> Result<Client> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(context) {
                return Ok(client.clone());
            }
        }

        let mut config = match &self.credentials {
            CredentialSet::InCluster => {
                if context != IN_CLUSTER_CONTEXT {
                    return Err(Error::ContextNotFound(context.to_string()));
                }
                Config::incluster().map_err(|e| Error::InvalidKubeconfig(e.to_string()))?
            }
            CredentialSet::Kubeconfig(kubeconfig) => Config::from_custom_kubeconfig(
                kubeconfig.clone(),
                &KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Error::InvalidKubeconfig(e.to_string()))?,
        };

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config).map_err(|source| Error::UpstreamApi {
            operation: format!("initialize client for context '{context}'"),
            source,
        })?;
        debug!(context = %context, "built cluster client");

        {
            let mut clients = self.clients.write().await;
            clients.insert(context.to_string(), client.clone());
        }

        Ok(client)
    }

    /// Liveness probe: a bounded core discovery call. Any failure, including
    /// a context that cannot even produce a client, reads as "not connected".
    pub async fn is_connected(&self, context: Option<&str>) -> bool {
        let (ctx, client) = match self.client_for(context).await {
            Ok(pair) => pair,
            Err(err) => {
                debug!(error = %err, "liveness probe could not build client");
                return false;
            }
        };

        match tokio::time::timeout(PROBE_TIMEOUT, client.list_core_api_versions()).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!(context = %ctx, error = %err, "liveness probe failed");
                false
            }
            Err(_) => {
                warn!(context = %ctx, "liveness probe timed out");
                false
            }
        }
    }

    /// List namespaces in a context
    pub async fn list_namespaces(&self, context: Option<&str>) -> Result<Vec<NamespaceSummary>> {
        let (ctx, client) = self.client_for(context).await?;
        let api: Api<Namespace> = Api::all(client);

        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| Error::UpstreamApi {
                operation: format!("list namespaces in context '{ctx}'"),
                source,
            })?;

        Ok(list
            .items
            .into_iter()
            .map(|ns| NamespaceSummary {
                name: ns.metadata.name.unwrap_or_default(),
                uid: ns.metadata.uid.unwrap_or_default(),
                creation_timestamp: ns.metadata.creation_timestamp.map(|t| t.0.to_rfc3339()),
                labels: ns.metadata.labels.unwrap_or_default(),
            })
            .collect())
    }
}
