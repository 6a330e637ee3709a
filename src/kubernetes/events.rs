// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Event queries for a specific involved object.
//!
//! Events are supplementary: a failure here must never block a resource
//! view, so every error path degrades to an empty list.

use k8s_openapi::api::core::v1::Event;
use kube::{Api, api::ListParams};
use serde_json::Value;
use tracing::{debug, warn};

use super::client::ClientPool;
use super::resources::normalize_namespace;

impl ClientPool {
    /// List events whose involved object matches kind, name, and (when
    /// given) namespace, newest first.
    ///
    /// Some API servers reject the namespace predicate in the field
    /// selector; on failure the query retries without it and the namespace
    /// match is applied client-side instead.
    pub async fn list_events(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
    ) -> Vec<Value> {
        let namespace = normalize_namespace(namespace);

        let (ctx, client) = match self.client_for(context).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(kind = %kind, name = %name, error = %err, "no client for event query");
                return Vec::new();
            }
        };

        let api: Api<Event> = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };

        let mut selector = format!("involvedObject.kind={kind},involvedObject.name={name}");
        if let Some(ns) = namespace {
            selector.push_str(&format!(",involvedObject.namespace={ns}"));
        }

        let events = match api.list(&ListParams::default().fields(&selector)).await {
            Ok(list) => list.items,
            Err(err) => {
                debug!(context = %ctx, error = %err, "event query failed, retrying without namespace predicate");
                let fallback = format!("involvedObject.kind={kind},involvedObject.name={name}");
                match api.list(&ListParams::default().fields(&fallback)).await {
                    Ok(list) => list.items,
                    Err(err) => {
                        warn!(context = %ctx, kind = %kind, name = %name, error = %err, "event query failed");
                        return Vec::new();
                    }
                }
            }
        };

        let mut values: Vec<Value> = events
            .into_iter()
            .filter(|event| involved_object_matches(event, kind, name, namespace))
            .filter_map(|event| serde_json::to_value(event).ok())
            .collect();

        values.sort_by(|a, b| event_sort_key(b).cmp(event_sort_key(a)));
        values
    }
}

/// Exact match on the involved object; a namespace absent on both sides
/// counts as a match
fn involved_object_matches(event: &Event, kind: &str, name: &str, namespace: Option<&str>) -> bool {
    let involved = &event.involved_object;
    involved.kind.as_deref() == Some(kind)
        && involved.name.as_deref() == Some(name)
        && involved.namespace.as_deref().unwrap_or("") == namespace.unwrap_or("")
}

/// Best available timestamp for ordering. The serialized forms are
/// sortable ISO-8601 strings, so lexicographic comparison is sufficient.
fn event_sort_key(event: &Value) -> &str {
    event
        .get("lastTimestamp")
        .and_then(Value::as_str)
        .or_else(|| event.get("eventTime").and_then(Value::as_str))
        .or_else(|| event.get("firstTimestamp").and_then(Value::as_str))
        .unwrap_or("")
}
