//! Direct cluster access: the trait surface delegated to the client pool.

use async_trait::async_trait;
use serde_json::Value;

use super::{ListQuery, Repository};
use crate::error::Result;
use crate::kubernetes::crossplane::{
    ClaimSummary, CompositeResourceSummary, CompositionSummary, FunctionSummary, PackageSummary,
};
use crate::kubernetes::{
    ClientPool, ClusterContext, CredentialSet, ManagedResourceSet, NamespaceSummary, Page,
};

/// Repository backed by direct Kubernetes API access
pub struct ClusterRepository {
    pool: ClientPool,
}

impl ClusterRepository {
    /// Build from ambient credentials (in-cluster service account or
    /// kubeconfig)
    pub fn new() -> Result<Self> {
        Ok(Self {
            pool: ClientPool::new()?,
        })
    }

    /// Build from an already-loaded credential set
    pub fn from_credentials(credentials: CredentialSet) -> Self {
        Self {
            pool: ClientPool::from_credentials(credentials),
        }
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for ClusterRepository {
    async fn list_contexts(&self) -> Result<Vec<ClusterContext>> {
        Ok(self.pool.contexts())
    }

    async fn current_context(&self) -> Result<Option<String>> {
        Ok(self.pool.current_context().await)
    }

    async fn set_current_context(&self, name: &str) -> Result<()> {
        self.pool.set_current_context(name).await
    }

    async fn is_connected(&self, context: Option<&str>) -> bool {
        self.pool.is_connected(context).await
    }

    async fn list_namespaces(&self, context: Option<&str>) -> Result<Vec<NamespaceSummary>> {
        self.pool.list_namespaces(context).await
    }

    async fn list(&self, query: ListQuery<'_>) -> Result<Page> {
        self.pool
            .list_resources(
                query.api_version,
                query.kind,
                query.namespace,
                query.context,
                query.limit,
                query.continue_token,
                query.plural,
            )
            .await
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
        self.pool
            .get_resource(api_version, kind, name, namespace, context, plural)
            .await
    }

    async fn list_events(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
    ) -> Vec<Value> {
        self.pool.list_events(kind, name, namespace, context).await
    }

    async fn list_providers(&self, context: Option<&str>) -> Result<Vec<PackageSummary>> {
        self.pool.list_providers(context).await
    }

    async fn list_functions(&self, context: Option<&str>) -> Result<Vec<FunctionSummary>> {
        self.pool.list_functions(context).await
    }

    async fn list_compositions(&self, context: Option<&str>) -> Result<Vec<CompositionSummary>> {
        self.pool.list_compositions(context).await
    }

    async fn list_composite_resource_definitions(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.pool.list_composite_resource_definitions(context).await
    }

    async fn list_composite_resources(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<CompositeResourceSummary>> {
        self.pool.list_composite_resources(context).await
    }

    async fn list_claims(&self, context: Option<&str>) -> Result<Vec<ClaimSummary>> {
        self.pool.list_claims(context).await
    }

    async fn list_managed_resources(
        &self,
        context: Option<&str>,
        force_refresh: bool,
    ) -> Result<ManagedResourceSet> {
        self.pool
            .list_all_managed_resources(context, force_refresh)
            .await
    }
}
