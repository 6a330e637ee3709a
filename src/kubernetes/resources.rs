use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::client::ClientPool;
use super::gvk::GroupVersion;
use crate::error::{Error, Result};

/// One page of a server-side paginated listing.
///
/// `continue_token == None` means the listing reached the end of the
/// result set for that query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Value>,
    pub continue_token: Option<String>,
    pub remaining_item_count: Option<i64>,
}

/// Callers sometimes serialize an absent namespace as the literal strings
/// "undefined" or "null"; treat those as absent
pub(super) fn normalize_namespace(namespace: Option<&str>) -> Option<&str> {
    match namespace {
        Some("") | Some("undefined") | Some("null") | None => None,
        other => other,
    }
}

/// Classify a not-found-class response: structured status code first, then
/// the structured reason, then message substrings from proxies that mangle
/// the body
pub(super) fn is_not_found(err: &kube::Error) -> bool {
    if let kube::Error::Api(response) = err {
        return response.code == 404 || response.reason == "NotFound";
    }
    let message = err.to_string();
    message.contains("404")
        || message.contains("NotFound")
        || message.contains("does not exist")
        || message.contains("not found")
}

/// Serialize a fetched object, injecting apiVersion and kind: the list API
/// does not repeat them per item
pub(super) fn object_to_value(object: DynamicObject, api_version: &str, kind: &str) -> Value {
    let mut value = serde_json::to_value(object).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("apiVersion".to_string(), Value::String(api_version.to_string()));
        map.insert("kind".to_string(), Value::String(kind.to_string()));
    }
    value
}

/// Typed read for a well-known built-in kind. Not-found maps to the typed
/// error so callers can render a 404 rather than a generic failure.
macro_rules! typed_get {
    ($type:ty, $client:expr, $name:expr, $kind:expr, namespaced $ns:expr) => {{
        let api: Api<$type> = Api::namespaced($client, $ns);
        typed_get!(@read api, $name, $kind)
    }};
    ($type:ty, $client:expr, $name:expr, $kind:expr, cluster) => {{
        let api: Api<$type> = Api::all($client);
        typed_get!(@read api, $name, $kind)
    }};
    (@read $api:expr, $name:expr, $kind:expr) => {{
        match $api.get($name).await {
            Ok(object) => Ok(serde_json::to_value(object).unwrap_or(Value::Null)),
            Err(err) if is_not_found(&err) => Err(Error::ResourceNotFound {
                kind: $kind.to_string(),
                name: $name.to_string(),
            }),
            Err(source) => Err(Error::UpstreamApi {
                operation: format!("get {} '{}'", $kind, $name),
                source,
            }),
        }
    }};
}

impl ClientPool {
    /// List resources of a dynamically-addressed kind.
    ///
    /// `limit` and `continue_token` pass straight through to the server;
    /// this never paginates client-side. A 404-class response yields an
    /// empty page: the type is simply not served on this cluster.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_resources(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        context: Option<&str>,
        limit: Option<u32>,
        continue_token: Option<&str>,
        plural: Option<&str>,
    ) -> Result<Page> {
        let gv = GroupVersion::parse(api_version)?;
        let namespace = normalize_namespace(namespace);

        let plural = match plural {
            Some(p) => p.to_string(),
            None => self.resolve_plural(api_version, kind, context).await?,
        };

        self.list_with_plural(&gv, kind, &plural, namespace, context, limit, continue_token)
            .await
    }

    /// Listing backend with the plural already known. The resolver cascade
    /// reaches the catalog through this entry point, so it must never
    /// resolve plurals itself.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn list_with_plural(
        &self,
        gv: &GroupVersion,
        kind: &str,
        plural: &str,
        namespace: Option<&str>,
        context: Option<&str>,
        limit: Option<u32>,
        continue_token: Option<&str>,
    ) -> Result<Page> {
        let (ctx, client) = self.client_for(context).await?;
        let api = dynamic_api(client, gv, kind, plural, namespace);

        debug!(
            context = %ctx,
            kind = %kind,
            plural = %plural,
            namespace = ?namespace,
            limit = ?limit,
            "listing resources"
        );

        let mut params = ListParams::default();
        if let Some(limit) = limit {
            params = params.limit(limit);
        }
        if let Some(token) = continue_token {
            params = params.continue_token(token);
        }

        let list = match api.list(&params).await {
            Ok(list) => list,
            Err(err) if is_not_found(&err) => {
                debug!(context = %ctx, kind = %kind, "type not served on this cluster, returning empty page");
                return Ok(Page::default());
            }
            Err(source) => {
                return Err(Error::UpstreamApi {
                    operation: format!("list {kind} in context '{ctx}'"),
                    source,
                });
            }
        };

        let api_version = gv.api_version();
        let continue_token = list.metadata.continue_.filter(|token| !token.is_empty());
        let remaining_item_count = list.metadata.remaining_item_count;

        Ok(Page {
            items: list
                .items
                .into_iter()
                .map(|item| object_to_value(item, &api_version, kind))
                .collect(),
            continue_token,
            remaining_item_count,
        })
    }

    /// Read a single resource by name.
    ///
    /// Well-known built-in kinds go through their typed APIs; everything
    /// else resolves a plural and uses the dynamic API. `Event` is refused:
    /// events are only addressable through the field-selector query.
    pub async fn get_resource(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context: Option<&str>,
        plural: Option<&str>,
    ) -> Result<Value> {
        use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
        use k8s_openapi::api::core::v1::{
            ConfigMap, Namespace, Node, PersistentVolume, Pod, Secret, Service,
        };

        if kind == "Event" {
            return Err(Error::EventsNotSupported);
        }

        let gv = GroupVersion::parse(api_version)?;
        let namespace = normalize_namespace(namespace);
        let (ctx, client) = self.client_for(context).await?;

        if gv.is_core() && gv.version == "v1" {
            if let Some(ns) = namespace {
                match kind {
                    "Service" => return typed_get!(Service, client, name, kind, namespaced ns),
                    "Pod" => return typed_get!(Pod, client, name, kind, namespaced ns),
                    "ConfigMap" => return typed_get!(ConfigMap, client, name, kind, namespaced ns),
                    "Secret" => return typed_get!(Secret, client, name, kind, namespaced ns),
                    _ => {}
                }
            } else {
                match kind {
                    "Namespace" => return typed_get!(Namespace, client, name, kind, cluster),
                    "Node" => return typed_get!(Node, client, name, kind, cluster),
                    "PersistentVolume" => {
                        return typed_get!(PersistentVolume, client, name, kind, cluster);
                    }
                    _ => {}
                }
            }
        }

        if gv.group == "apps" && gv.version == "v1" {
            if let Some(ns) = namespace {
                match kind {
                    "Deployment" => return typed_get!(Deployment, client, name, kind, namespaced ns),
                    "StatefulSet" => {
                        return typed_get!(StatefulSet, client, name, kind, namespaced ns);
                    }
                    "DaemonSet" => return typed_get!(DaemonSet, client, name, kind, namespaced ns),
                    "ReplicaSet" => return typed_get!(ReplicaSet, client, name, kind, namespaced ns),
                    _ => {}
                }
            }
        }

        let plural = match plural {
            Some(p) => p.to_string(),
            None => self.resolve_plural(api_version, kind, context).await?,
        };

        let api = dynamic_api(client, &gv, kind, &plural, namespace);
        debug!(context = %ctx, kind = %kind, name = %name, plural = %plural, "reading resource");

        match api.get(name).await {
            Ok(object) => Ok(object_to_value(object, &gv.api_version(), kind)),
            Err(err) if is_not_found(&err) => Err(Error::ResourceNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
            Err(source) => Err(Error::UpstreamApi {
                operation: format!("get {kind} '{name}' in context '{ctx}'"),
                source,
            }),
        }
    }
}

/// Build a dynamic API handle scoped by namespace presence
fn dynamic_api(
    client: Client,
    gv: &GroupVersion,
    kind: &str,
    plural: &str,
    namespace: Option<&str>,
) -> Api<DynamicObject> {
    let gvk = GroupVersionKind::gvk(&gv.group, &gv.version, kind);
    let ar = ApiResource::from_gvk_with_plural(&gvk, plural);
    match namespace {
        Some(ns) => Api::namespaced_with(client, ns, &ar),
        None => Api::all_with(client, &ar),
    }
}
