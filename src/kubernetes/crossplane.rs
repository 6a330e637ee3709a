// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Crossplane-specific convenience aggregations.
//!
//! Thin compositions of the resource client plus the field projections the
//! dashboard pages consume. Aggregation across derived types happens only
//! for unlimited exploratory queries; a caller that wants server-side
//! pagination for one specific type calls `list_resources` directly and
//! keeps the cursor semantics.

use std::collections::HashMap;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{PKG_API_VERSION, XRD_GROUP, claim_target, definition_target, str_at};
use super::client::ClientPool;
use crate::error::Result;

/// Installed Crossplane package (Provider or Function) summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub name: String,
    pub uid: String,
    pub creation_timestamp: String,
    pub package: String,
    pub revision: String,
    pub installed: bool,
    pub healthy: bool,
    pub conditions: Value,
}

/// Function summary with composition usage cross-references
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSummary {
    #[serde(flatten)]
    pub package: PackageSummary,
    pub used_in_compositions: Vec<String>,
    pub used_in_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSummary {
    pub name: String,
    pub uid: String,
    pub creation_timestamp: String,
    pub labels: Value,
    pub composite_type_ref: Value,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResourceSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: String,
    pub kind: String,
    pub api_version: String,
    pub creation_timestamp: String,
    pub labels: Value,
    pub composition_ref: Value,
    pub claim_ref: Value,
    pub resource_refs: Value,
    pub conditions: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: String,
    pub kind: String,
    pub api_version: String,
    pub creation_timestamp: String,
    pub labels: Value,
    pub resource_ref: Value,
    pub composition_ref: Value,
    pub conditions: Value,
}

impl ClientPool {
    /// Installed Providers
    pub async fn list_providers(&self, context: Option<&str>) -> Result<Vec<PackageSummary>> {
        let page = self
            .list_resources(PKG_API_VERSION, "Provider", None, context, None, None, Some("providers"))
            .await?;
        Ok(page.items.iter().map(project_package).collect())
    }

    /// Installed Functions, cross-referenced against composition pipelines
    pub async fn list_functions(&self, context: Option<&str>) -> Result<Vec<FunctionSummary>> {
        let functions = self
            .list_resources(PKG_API_VERSION, "Function", None, context, None, None, Some("functions"))
            .await?
            .items;

        let compositions = self
            .list_resources(
                &format!("{XRD_GROUP}/v1"),
                "Composition",
                None,
                context,
                None,
                None,
                Some("compositions"),
            )
            .await?
            .items;
        let usage = function_usage(&compositions);

        Ok(functions
            .iter()
            .map(|function| {
                let package = project_package(function);
                let used_in = usage.get(package.name.as_str()).cloned().unwrap_or_default();
                FunctionSummary {
                    used_in_count: used_in.len(),
                    used_in_compositions: used_in,
                    package,
                }
            })
            .collect())
    }

    /// Compositions
    pub async fn list_compositions(&self, context: Option<&str>) -> Result<Vec<CompositionSummary>> {
        let page = self
            .list_resources(
                &format!("{XRD_GROUP}/v1"),
                "Composition",
                None,
                context,
                None,
                None,
                Some("compositions"),
            )
            .await?;
        Ok(page.items.iter().map(project_composition).collect())
    }

    /// Composite resources: one cluster-scoped list per XRD-defined type.
    /// A type that fails or times out contributes nothing.
    pub async fn list_composite_resources(
        &self,
        context: Option<&str>,
    ) -> Result<Vec<CompositeResourceSummary>> {
        let ctx = self.resolve_context(context).await?;
        let xrds = self.list_composite_resource_definitions(Some(&ctx)).await?;
        let targets: Vec<_> = xrds.iter().filter_map(definition_target).collect();

        let queries = targets.iter().map(|t| self.list_type_tolerant(t, &ctx));
        let items: Vec<Value> = join_all(queries).await.into_iter().flatten().collect();

        Ok(items.iter().map(project_composite).collect())
    }

    /// Claims: one all-namespaces list per XRD claim type, same tolerance
    pub async fn list_claims(&self, context: Option<&str>) -> Result<Vec<ClaimSummary>> {
        let ctx = self.resolve_context(context).await?;
        let xrds = self.list_composite_resource_definitions(Some(&ctx)).await?;
        let targets: Vec<_> = xrds.iter().filter_map(claim_target).collect();

        let queries = targets.iter().map(|t| self.list_type_tolerant(t, &ctx));
        let items: Vec<Value> = join_all(queries).await.into_iter().flatten().collect();

        Ok(items.iter().map(project_claim).collect())
    }
}

/// True when a status condition of the given type reports "True"
fn condition_true(object: &Value, condition_type: &str) -> bool {
    object
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .map(|conditions| {
            conditions.iter().any(|c| {
                str_at(c, "/type") == Some(condition_type) && str_at(c, "/status") == Some("True")
            })
        })
        .unwrap_or(false)
}

fn value_at(object: &Value, pointer: &str) -> Value {
    object.pointer(pointer).cloned().unwrap_or(Value::Null)
}

fn string_at(object: &Value, pointer: &str) -> String {
    str_at(object, pointer).unwrap_or_default().to_string()
}

fn labels_of(object: &Value) -> Value {
    object
        .pointer("/metadata/labels")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()))
}

fn project_package(object: &Value) -> PackageSummary {
    PackageSummary {
        name: string_at(object, "/metadata/name"),
        uid: string_at(object, "/metadata/uid"),
        creation_timestamp: string_at(object, "/metadata/creationTimestamp"),
        package: string_at(object, "/spec/package"),
        revision: string_at(object, "/status/currentRevision"),
        installed: condition_true(object, "Installed"),
        healthy: condition_true(object, "Healthy"),
        conditions: value_at(object, "/status/conditions"),
    }
}

fn project_composition(object: &Value) -> CompositionSummary {
    CompositionSummary {
        name: string_at(object, "/metadata/name"),
        uid: string_at(object, "/metadata/uid"),
        creation_timestamp: string_at(object, "/metadata/creationTimestamp"),
        labels: labels_of(object),
        composite_type_ref: value_at(object, "/spec/compositeTypeRef"),
        mode: str_at(object, "/spec/mode").unwrap_or("Default").to_string(),
    }
}

fn project_composite(object: &Value) -> CompositeResourceSummary {
    CompositeResourceSummary {
        name: string_at(object, "/metadata/name"),
        namespace: str_at(object, "/metadata/namespace").map(String::from),
        uid: string_at(object, "/metadata/uid"),
        kind: string_at(object, "/kind"),
        api_version: string_at(object, "/apiVersion"),
        creation_timestamp: string_at(object, "/metadata/creationTimestamp"),
        labels: labels_of(object),
        composition_ref: value_at(object, "/spec/compositionRef"),
        claim_ref: value_at(object, "/spec/claimRef"),
        resource_refs: object
            .pointer("/spec/resourceRefs")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        conditions: value_at(object, "/status/conditions"),
    }
}

fn project_claim(object: &Value) -> ClaimSummary {
    ClaimSummary {
        name: string_at(object, "/metadata/name"),
        namespace: str_at(object, "/metadata/namespace").map(String::from),
        uid: string_at(object, "/metadata/uid"),
        kind: string_at(object, "/kind"),
        api_version: string_at(object, "/apiVersion"),
        creation_timestamp: string_at(object, "/metadata/creationTimestamp"),
        labels: labels_of(object),
        resource_ref: value_at(object, "/spec/resourceRef"),
        composition_ref: value_at(object, "/spec/compositionRef"),
        conditions: value_at(object, "/status/conditions"),
    }
}

/// Map function name -> names of compositions that reference it, from both
/// pipeline steps and the legacy `spec.functions` form
fn function_usage(compositions: &[Value]) -> HashMap<String, Vec<String>> {
    let mut usage: HashMap<String, Vec<String>> = HashMap::new();

    for composition in compositions {
        let Some(composition_name) = str_at(composition, "/metadata/name") else {
            continue;
        };

        for steps_path in ["/spec/pipeline", "/spec/functions"] {
            let Some(steps) = composition.pointer(steps_path).and_then(Value::as_array) else {
                continue;
            };
            for step in steps {
                if let Some(function_name) = str_at(step, "/functionRef/name") {
                    usage
                        .entry(function_name.to_string())
                        .or_default()
                        .push(composition_name.to_string());
                }
            }
        }
    }

    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_true() {
        let object = json!({
            "status": {"conditions": [
                {"type": "Installed", "status": "True"},
                {"type": "Healthy", "status": "False"}
            ]}
        });
        assert!(condition_true(&object, "Installed"));
        assert!(!condition_true(&object, "Healthy"));
        assert!(!condition_true(&object, "Ready"));
        assert!(!condition_true(&json!({}), "Installed"));
    }

    #[test]
    fn test_project_package() {
        let provider = json!({
            "metadata": {
                "name": "provider-aws",
                "uid": "abc-123",
                "creationTimestamp": "2025-05-01T00:00:00Z"
            },
            "spec": {"package": "xpkg.upbound.io/provider-aws:v1.4.0"},
            "status": {
                "currentRevision": "provider-aws-1234",
                "conditions": [
                    {"type": "Installed", "status": "True"},
                    {"type": "Healthy", "status": "True"}
                ]
            }
        });

        let summary = project_package(&provider);
        assert_eq!(summary.name, "provider-aws");
        assert_eq!(summary.package, "xpkg.upbound.io/provider-aws:v1.4.0");
        assert_eq!(summary.revision, "provider-aws-1234");
        assert!(summary.installed);
        assert!(summary.healthy);
    }

    #[test]
    fn test_project_composition_defaults_mode() {
        let composition = json!({
            "metadata": {"name": "db-aws", "uid": "u1", "creationTimestamp": "t"},
            "spec": {"compositeTypeRef": {"apiVersion": "platform.example.org/v1", "kind": "XDatabase"}}
        });
        let summary = project_composition(&composition);
        assert_eq!(summary.mode, "Default");
        assert_eq!(summary.composite_type_ref["kind"], "XDatabase");

        let pipelined = json!({
            "metadata": {"name": "db-gcp"},
            "spec": {"mode": "Pipeline"}
        });
        assert_eq!(project_composition(&pipelined).mode, "Pipeline");
    }

    #[test]
    fn test_project_composite_and_claim() {
        let composite = json!({
            "apiVersion": "platform.example.org/v1",
            "kind": "XDatabase",
            "metadata": {"name": "xdb-1", "uid": "u1", "creationTimestamp": "t"},
            "spec": {
                "compositionRef": {"name": "db-aws"},
                "claimRef": {"name": "db", "namespace": "team-a"},
                "resourceRefs": [{"kind": "Bucket", "name": "b1"}]
            },
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        });

        let summary = project_composite(&composite);
        assert_eq!(summary.kind, "XDatabase");
        assert_eq!(summary.namespace, None);
        assert_eq!(summary.composition_ref["name"], "db-aws");
        assert_eq!(summary.resource_refs.as_array().unwrap().len(), 1);

        let claim = json!({
            "apiVersion": "platform.example.org/v1",
            "kind": "Database",
            "metadata": {"name": "db", "namespace": "team-a"},
            "spec": {"resourceRef": {"name": "xdb-1"}}
        });
        let summary = project_claim(&claim);
        assert_eq!(summary.namespace.as_deref(), Some("team-a"));
        assert_eq!(summary.resource_ref["name"], "xdb-1");
    }

    #[test]
    fn test_function_usage_from_pipeline_and_legacy_forms() {
        let compositions = vec![
            json!({
                "metadata": {"name": "db-aws"},
                "spec": {"pipeline": [
                    {"step": "patch", "functionRef": {"name": "function-patch"}},
                    {"step": "ready", "functionRef": {"name": "function-ready"}}
                ]}
            }),
            json!({
                "metadata": {"name": "db-gcp"},
                "spec": {"functions": [
                    {"functionRef": {"name": "function-patch"}}
                ]}
            }),
        ];

        let usage = function_usage(&compositions);
        assert_eq!(
            usage.get("function-patch").unwrap(),
            &vec!["db-aws".to_string(), "db-gcp".to_string()]
        );
        assert_eq!(usage.get("function-ready").unwrap(), &vec!["db-aws".to_string()]);
        assert!(usage.get("function-unused").is_none());
    }
}
