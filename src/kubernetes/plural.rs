// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Plural name resolution.
//!
//! A `(apiVersion, kind)` pair maps to the REST resource plural through an
//! ordered cascade: the permanent cache, the server's discovery document,
//! the CRD/XRD catalog, and finally a naming heuristic. A miss at any step
//! falls through to the next; only the first success is cached. The plural
//! of a kind does not change within a process lifetime, so cache entries
//! are never expired.

use kube::Client;
use tracing::debug;

use super::client::ClientPool;
use super::gvk::GroupVersion;
use crate::error::{Error, Result};

impl ClientPool {
    /// Resolve the REST plural for a kind, consulting cache, discovery,
    /// catalog, and heuristic in that order.
    pub async fn resolve_plural(
        &self,
        api_version: &str,
        kind: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let gv = GroupVersion::parse(api_version)?;
        let cache_key = format!("{}/{}", gv.api_version(), kind);

        {
            let plurals = self.plurals.read().await;
            if let Some(plural) = plurals.get(&cache_key) {
                return Ok(plural.clone());
            }
        }

        let plural = self.resolve_uncached(&gv, kind, context).await;

        {
            let mut plurals = self.plurals.write().await;
            plurals.insert(cache_key, plural.clone());
        }

        Ok(plural)
    }

    /// Run the network-backed strategies, degrading on every failure.
    /// This never errors: the heuristic always produces an answer.
    async fn resolve_uncached(&self, gv: &GroupVersion, kind: &str, context: Option<&str>) -> String {
        let client = match self.client_for(context).await {
            Ok((_, client)) => Some(client),
            Err(err) => {
                debug!(kind = %kind, error = %err, "no client for plural resolution, using heuristic");
                None
            }
        };

        if let Some(client) = &client {
            match discover_plural(client, gv, kind).await {
                Ok(Some(plural)) => {
                    debug!(kind = %kind, plural = %plural, "plural resolved via discovery");
                    return plural;
                }
                Ok(None) => {
                    debug!(kind = %kind, group = %gv.group, "discovery had no match for kind");
                }
                Err(err) => {
                    debug!(kind = %kind, error = %err, "discovery failed, trying catalog");
                }
            }

            match self.find_plural_in_definitions(&gv.group, kind, context).await {
                Ok(Some(plural)) => {
                    debug!(kind = %kind, plural = %plural, "plural resolved via definition catalog");
                    return plural;
                }
                Ok(None) => {
                    debug!(kind = %kind, group = %gv.group, "no matching definition in catalog");
                }
                Err(err) => {
                    debug!(kind = %kind, error = %err, "catalog lookup failed, using heuristic");
                }
            }
        }

        heuristic_plural(kind)
    }
}

/// Ask the API server's discovery document for the kind's plural.
/// Subresources (e.g. `pods/log`) are skipped; core-group matches must
/// themselves carry no group.
async fn discover_plural(
    client: &Client,
    gv: &GroupVersion,
    kind: &str,
) -> Result<Option<String>> {
    let list = if gv.is_core() {
        client.list_core_api_resources(&gv.version).await
    } else {
        client.list_api_group_resources(&gv.api_version()).await
    }
    .map_err(Error::DiscoveryTransport)?;

    Ok(list
        .resources
        .iter()
        .find(|resource| {
            resource.kind == kind
                && !resource.name.contains('/')
                && (!gv.is_core() || resource.group.as_deref().unwrap_or("").is_empty())
        })
        .map(|resource| resource.name.clone()))
}

/// Last-resort pluralization. Crossplane composite kinds carry a leading
/// `X` and their lowercased name is already addressable as-is; everything
/// else gets a trailing `s`.
fn heuristic_plural(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if kind.starts_with('X') {
        lower
    } else {
        format!("{lower}s")
    }
}
