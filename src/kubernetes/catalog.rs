// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Type catalog: CRD and composite-resource-definition lookup.
//!
//! Serves two purposes: the fallback source for plural resolution, and the
//! universe of managed-resource types the aggregator fans out over. The
//! managed-definition scan is expensive (providers, revisions, and the full
//! CRD list), so its result is cached per context with a bounded TTL.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::cache::CachedEntry;
use super::client::ClientPool;
use super::gvk::GroupVersion;
use crate::error::Result;

pub(super) const CRD_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub(super) const XRD_GROUP: &str = "apiextensions.crossplane.io";
pub(super) const PKG_API_VERSION: &str = "pkg.crossplane.io/v1";

/// How long a context's managed-definition scan stays valid. Definitions
/// change when packages are installed, which is rare next to instance churn.
const DEFINITION_TTL: Duration = Duration::from_secs(5 * 60);

/// A listable resource type derived from a definition object
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TypeTarget {
    pub api_version: String,
    pub kind: String,
    pub plural: String,
}

impl ClientPool {
    /// List all CustomResourceDefinitions in a context
    pub async fn list_crds(&self, context: Option<&str>) -> Result<Vec<Value>> {
        let gv = GroupVersion::parse(CRD_API_VERSION)?;
        Ok(self
            .list_with_plural(
                &gv,
                "CustomResourceDefinition",
                "customresourcedefinitions",
                None,
                context,
                None,
                None,
            )
            .await?
            .items)
    }

    /// List CompositeResourceDefinitions, merging the versions the cluster
    /// serves (v2 preferred). A version that is not served contributes an
    /// empty page, never an error.
    pub async fn list_composite_resource_definitions(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut merged: Vec<Value> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for version in ["v2", "v1"] {
            let gv = GroupVersion {
                group: XRD_GROUP.to_string(),
                version: version.to_string(),
            };
            match self
                .list_with_plural(
                    &gv,
                    "CompositeResourceDefinition",
                    "compositeresourcedefinitions",
                    None,
                    context,
                    None,
                    None,
                )
                .await
            {
                Ok(page) => {
                    for xrd in page.items {
                        let name = str_at(&xrd, "/metadata/name").unwrap_or_default().to_string();
                        if name.is_empty() || seen.insert(name) {
                            merged.push(xrd);
                        }
                    }
                }
                Err(err) => {
                    debug!(version = %version, error = %err, "XRD listing failed for version");
                }
            }
        }

        Ok(merged)
    }

    /// The CRDs that define managed infrastructure: those owned (directly
    /// or via a package revision) by an installed Provider, minus the
    /// `ProviderConfig`/`ProviderConfigUsage` configuration kinds.
    ///
    /// Cached per context for five minutes; `force_refresh` bypasses and
    /// repopulates unconditionally.
    pub async fn list_managed_resource_definitions(
        &self,
        context: Option<&str>,
        force_refresh: bool,
    ) -> Result<Vec<Value>> {
        let ctx = self.resolve_context(context).await?;

        if !force_refresh {
            let definitions = self.definitions.read().await;
            if let Some(cached) = definitions.get(&ctx).and_then(|e| e.fresh(DEFINITION_TTL)) {
                debug!(context = %ctx, "managed resource definitions served from cache");
                return Ok(cached);
            }
        }

        let pkg = GroupVersion::parse(PKG_API_VERSION)?;
        let providers = self
            .list_with_plural(&pkg, "Provider", "providers", None, Some(&ctx), None, None)
            .await?
            .items;

        let revisions = self
            .list_with_plural(
                &pkg,
                "ProviderRevision",
                "providerrevisions",
                None,
                Some(&ctx),
                None,
                None,
            )
            .await?
            .items;

        let provider_names: HashSet<&str> = providers
            .iter()
            .filter_map(|p| str_at(p, "/metadata/name"))
            .collect();
        let revision_owners = revision_to_provider(&revisions, &provider_names);

        let crds = self.list_crds(Some(&ctx)).await?;
        let definitions: Vec<Value> = crds
            .into_iter()
            .filter(|crd| owned_by_provider(crd, &provider_names, &revision_owners))
            .filter(|crd| !is_provider_config_kind(crd))
            .collect();

        info!(
            context = %ctx,
            providers = provider_names.len(),
            definitions = definitions.len(),
            "scanned managed resource definitions"
        );

        {
            let mut cache = self.definitions.write().await;
            cache.insert(ctx, CachedEntry::new(definitions.clone()));
        }

        Ok(definitions)
    }

    /// Catalog step of the plural-resolution cascade: scan CRDs and XRDs
    /// for a definition of the kind in the given group
    pub(super) async fn find_plural_in_definitions(
        &self,
        group: &str,
        kind: &str,
        context: Option<&str>,
    ) -> Result<Option<String>> {
        for crd in self.list_crds(context).await? {
            if let Some(plural) = definition_plural_for(&crd, group, kind) {
                return Ok(Some(plural));
            }
        }

        for xrd in self.list_composite_resource_definitions(context).await? {
            if let Some(plural) = definition_plural_for(&xrd, group, kind) {
                return Ok(Some(plural));
            }
        }

        Ok(None)
    }
}

/// Extract a string at a JSON pointer path
pub(super) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Match a definition's `names` or `claimNames` against a (group, kind)
/// pair and return the corresponding plural
fn definition_plural_for(definition: &Value, group: &str, kind: &str) -> Option<String> {
    if str_at(definition, "/spec/group") != Some(group) {
        return None;
    }
    if str_at(definition, "/spec/names/kind") == Some(kind) {
        return str_at(definition, "/spec/names/plural").map(String::from);
    }
    if str_at(definition, "/spec/claimNames/kind") == Some(kind) {
        return str_at(definition, "/spec/claimNames/plural").map(String::from);
    }
    None
}

/// Map ProviderRevision names back to the installed Provider that owns them
fn revision_to_provider<'a>(
    revisions: &'a [Value],
    provider_names: &HashSet<&str>,
) -> HashMap<&'a str, &'a str> {
    let mut owners = HashMap::new();
    for revision in revisions {
        let Some(revision_name) = str_at(revision, "/metadata/name") else {
            continue;
        };
        for owner in owner_references(revision) {
            if str_at(owner, "/kind") == Some("Provider")
                && str_at(owner, "/apiVersion") == Some(PKG_API_VERSION)
            {
                if let Some(name) = str_at(owner, "/name") {
                    if provider_names.contains(name) {
                        owners.insert(revision_name, name);
                        break;
                    }
                }
            }
        }
    }
    owners
}

/// A CRD belongs to a provider when an owner reference points at an
/// installed Provider or at one of its package revisions
fn owned_by_provider(
    crd: &Value,
    provider_names: &HashSet<&str>,
    revision_owners: &HashMap<&str, &str>,
) -> bool {
    owner_references(crd).iter().any(|owner| {
        if str_at(owner, "/apiVersion") != Some(PKG_API_VERSION) {
            return false;
        }
        match (str_at(owner, "/kind"), str_at(owner, "/name")) {
            (Some("Provider"), Some(name)) => provider_names.contains(name),
            (Some("ProviderRevision"), Some(name)) => revision_owners.contains_key(name),
            _ => false,
        }
    })
}

/// ProviderConfig and its usage tracker are configuration, not managed
/// infrastructure
fn is_provider_config_kind(crd: &Value) -> bool {
    matches!(
        str_at(crd, "/spec/names/kind"),
        Some("ProviderConfig") | Some("ProviderConfigUsage")
    )
}

fn owner_references(object: &Value) -> &[Value] {
    object
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Derive the listable type from a definition: group from the spec, the
/// first served version (falling back to the legacy `spec.version`, then
/// `v1`), and the plural/kind from `names`
pub(super) fn definition_target(definition: &Value) -> Option<TypeTarget> {
    let group = str_at(definition, "/spec/group")?;
    if group.is_empty() {
        return None;
    }

    let version = definition
        .pointer("/spec/versions/0/name")
        .and_then(Value::as_str)
        .or_else(|| str_at(definition, "/spec/version"))
        .unwrap_or("v1");

    let kind = str_at(definition, "/spec/names/kind")?;
    let plural = str_at(definition, "/spec/names/plural")?;

    Some(TypeTarget {
        api_version: format!("{group}/{version}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    })
}

/// Derive the claim type from an XRD's `claimNames`, when it offers one
pub(super) fn claim_target(xrd: &Value) -> Option<TypeTarget> {
    let group = str_at(xrd, "/spec/group")?;
    if group.is_empty() {
        return None;
    }

    let version = xrd
        .pointer("/spec/versions/0/name")
        .and_then(Value::as_str)
        .or_else(|| str_at(xrd, "/spec/version"))
        .unwrap_or("v1");

    let kind = str_at(xrd, "/spec/claimNames/kind")?;
    let plural = str_at(xrd, "/spec/claimNames/plural")?;

    Some(TypeTarget {
        api_version: format!("{group}/{version}"),
        kind: kind.to_string(),
        plural: plural.to_string(),
    })
}
