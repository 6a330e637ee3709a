// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Repository capability interface.
//!
//! The dashboard talks to a cluster either directly or through another
//! crossview instance acting as a proxy. Both paths implement the same
//! explicit contract, selected at construction time, so callers never
//! probe for method presence at runtime.

mod cluster;
mod proxy;

use async_trait::async_trait;
use serde_json::Value;

pub use cluster::ClusterRepository;
pub use proxy::ProxyRepository;

use crate::error::Result;
use crate::kubernetes::crossplane::{
    ClaimSummary, CompositeResourceSummary, CompositionSummary, FunctionSummary, PackageSummary,
};
use crate::kubernetes::{ClusterContext, ManagedResourceSet, NamespaceSummary, Page};

/// Parameters for a resource listing
#[derive(Debug, Clone, Default)]
pub struct ListQuery<'a> {
    pub api_version: &'a str,
    pub kind: &'a str,
    pub namespace: Option<&'a str>,
    pub context: Option<&'a str>,
    pub limit: Option<u32>,
    pub continue_token: Option<&'a str>,
    pub plural: Option<&'a str>,
}

/// The access-layer surface consumed by the HTTP/auth layer
#[async_trait]
pub trait Repository: Send + Sync {
    /// Named contexts available to this repository
    async fn list_contexts(&self) -> Result<Vec<ClusterContext>>;

    /// The currently selected context, if any
    async fn current_context(&self) -> Result<Option<String>>;

    /// Select a context; invalidates client handles bound to it
    async fn set_current_context(&self, name: &str) -> Result<()>;

    /// Liveness probe; any failure reads as "not connected"
    async fn is_connected(&self, context: Option<&str>) -> bool;

    async fn list_namespaces(&self, context: Option<&str>) -> Result<Vec<NamespaceSummary>>;

    /// Server-side paginated listing of one resource type
    async fn list(&self, query: ListQuery<'_>) -> Result<Page>;

    /// Single resource read
    async fn get(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
        plural: Option<&str>,
    ) -> Result<Value>;

    /// Events for an involved object, newest first; failures yield an
    /// empty list
    async fn list_events(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
    ) -> Vec<Value>;

    async fn list_providers(&self, context: Option<&str>) -> Result<Vec<PackageSummary>>;

    async fn list_functions(&self, context: Option<&str>) -> Result<Vec<FunctionSummary>>;

    async fn list_compositions(&self, context: Option<&str>) -> Result<Vec<CompositionSummary>>;

    async fn list_composite_resource_definitions(&self, context: Option<&str>)
        -> Result<Vec<Value>>;

    async fn list_composite_resources(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<CompositeResourceSummary>>;

    async fn list_claims(&self, context: Option<&str>) -> Result<Vec<ClaimSummary>>;

    /// Merged managed resources across every provider-defined type
    async fn list_managed_resources(
        &self,
        context: Option<&str>,
        force_refresh: bool,
    ) -> Result<ManagedResourceSet>;
}
