//! Shared fixtures: a client pool pointed at a mock API server, and
//! Kubernetes-shaped response bodies.

#![allow(dead_code)]

use crossview::{ClientPool, CredentialSet};
use kube::config::Kubeconfig;
use serde_json::{Value, json};

/// A kubeconfig with a single context pointing at the mock server
pub fn kubeconfig_for(server_uri: &str) -> Kubeconfig {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{"name": "mock-cluster", "cluster": {"server": server_uri}}],
        "users": [{"name": "mock-user", "user": {}}],
        "contexts": [{
            "name": "mock",
            "context": {"cluster": "mock-cluster", "user": "mock-user"}
        }],
        "current-context": "mock"
    }))
    .expect("valid test kubeconfig")
}

/// Pool whose only context targets the mock server
pub fn pool_for(server_uri: &str) -> ClientPool {
    ClientPool::from_credentials(CredentialSet::Kubeconfig(kubeconfig_for(server_uri)))
}

/// A Kubernetes list response body
pub fn list_body(
    api_version: &str,
    kind: &str,
    items: Value,
    continue_token: Option<&str>,
    remaining: Option<i64>,
) -> Value {
    let mut metadata = json!({});
    if let Some(token) = continue_token {
        metadata["continue"] = json!(token);
    }
    if let Some(count) = remaining {
        metadata["remainingItemCount"] = json!(count);
    }
    json!({
        "apiVersion": api_version,
        "kind": format!("{kind}List"),
        "metadata": metadata,
        "items": items
    })
}

/// A Kubernetes NotFound status body
pub fn status_not_found(message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": "NotFound",
        "code": 404
    })
}

/// A server-side failure status body
pub fn status_internal_error(message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": "InternalError",
        "code": 500
    })
}

/// An APIResourceList discovery document
pub fn api_resource_list(group_version: &str, resources: Value) -> Value {
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
}

/// A CRD object owned by a Crossplane provider
pub fn provider_crd(provider: &str, group: &str, version: &str, kind: &str, plural: &str) -> Value {
    json!({
        "metadata": {
            "name": format!("{plural}.{group}"),
            "ownerReferences": [{
                "apiVersion": "pkg.crossplane.io/v1",
                "kind": "Provider",
                "name": provider
            }]
        },
        "spec": {
            "group": group,
            "versions": [{"name": version, "served": true}],
            "names": {"kind": kind, "plural": plural}
        }
    })
}
