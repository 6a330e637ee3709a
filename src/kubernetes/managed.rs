// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Managed-resource aggregation across every provider-defined type.
//!
//! One broken or slow CRD must never blank the dashboard: each per-type
//! query runs concurrently under its own timeout, failures contribute an
//! empty result, and the merged set is cached per context. The aggregation
//! as a whole only fails when the definition catalog itself cannot load.

use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::CachedEntry;
use super::catalog::{TypeTarget, definition_target};
use super::client::ClientPool;
use super::gvk::GroupVersion;
use crate::error::{Error, Result};

/// How long a merged instance scan stays valid. Instances change more often
/// than definitions, but a full re-scan fans out to every known type.
const MANAGED_TTL: Duration = Duration::from_secs(10 * 60);

/// Time budget for each fanned-out per-type list
const PER_TYPE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a managed-resource aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceSet {
    pub items: Vec<Value>,
    pub from_cache: bool,
}

impl ClientPool {
    /// List every managed resource instance across all provider-defined
    /// types, merging per-type results unordered.
    pub async fn list_all_managed_resources(
        &self,
        context: Option<&str>,
        force_refresh: bool,
    ) -> Result<ManagedResourceSet> {
        let ctx = self.resolve_context(context).await?;

        if !force_refresh {
            let managed = self.managed.read().await;
            if let Some(items) = managed.get(&ctx).and_then(|e| e.fresh(MANAGED_TTL)) {
                debug!(context = %ctx, "managed resources served from cache");
                return Ok(ManagedResourceSet {
                    items,
                    from_cache: true,
                });
            }
        }

        let definitions = self
            .list_managed_resource_definitions(Some(&ctx), force_refresh)
            .await?;
        let targets: Vec<TypeTarget> = definitions.iter().filter_map(definition_target).collect();

        debug!(context = %ctx, types = targets.len(), "fanning out managed resource scan");

        let queries = targets
            .iter()
            .map(|target| self.list_type_tolerant(target, &ctx));
        let items: Vec<Value> = join_all(queries).await.into_iter().flatten().collect();

        info!(context = %ctx, items = items.len(), "managed resource scan complete");

        {
            let mut managed = self.managed.write().await;
            managed.insert(ctx, CachedEntry::new(items.clone()));
        }

        Ok(ManagedResourceSet {
            items,
            from_cache: false,
        })
    }

    /// One fanned-out per-type list: bounded by the per-type timeout, and
    /// any failure degrades to an empty contribution so siblings survive
    pub(super) async fn list_type_tolerant(&self, target: &TypeTarget, ctx: &str) -> Vec<Value> {
        let gv = match GroupVersion::parse(&target.api_version) {
            Ok(gv) => gv,
            Err(err) => {
                warn!(kind = %target.kind, error = %err, "skipping type with malformed apiVersion");
                return Vec::new();
            }
        };

        let query = self.list_with_plural(
            &gv,
            &target.kind,
            &target.plural,
            None,
            Some(ctx),
            None,
            None,
        );

        match tokio::time::timeout(PER_TYPE_TIMEOUT, query).await {
            Ok(Ok(page)) => page.items,
            Ok(Err(err)) => {
                warn!(context = %ctx, kind = %target.kind, error = %err, "per-type query failed, skipping");
                Vec::new()
            }
            Err(_) => {
                let err = Error::QueryTimeout {
                    kind: target.kind.clone(),
                    timeout: PER_TYPE_TIMEOUT,
                };
                warn!(context = %ctx, error = %err, "per-type query timed out, skipping");
                Vec::new()
            }
        }
    }
}
