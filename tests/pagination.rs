//! Listing, pagination, plural resolution, and not-found normalization
//! against a mock API server.

mod common;

use common::{api_resource_list, list_body, pool_for, status_internal_error, status_not_found};
use crossview::Error;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Three-page walk over five objects with limit 2: each page carries the
/// server's continue token, and the final page carries none.
#[tokio::test]
async fn test_list_paginates_with_server_side_cursor() {
    let server = MockServer::start().await;

    // Later pages first: the no-continue mock would match any request
    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/widgets"))
        .and(query_param("continue", "cursor-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "example.org/v1",
            "Widget",
            json!([
                {"metadata": {"name": "w3"}},
                {"metadata": {"name": "w4"}}
            ]),
            Some("cursor-2"),
            Some(1),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/widgets"))
        .and(query_param("continue", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "example.org/v1",
            "Widget",
            json!([{"metadata": {"name": "w5"}}]),
            None,
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/widgets"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "example.org/v1",
            "Widget",
            json!([
                {"metadata": {"name": "w1"}},
                {"metadata": {"name": "w2"}}
            ]),
            Some("cursor-1"),
            Some(3),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());

    let first = pool
        .list_resources("example.org/v1", "Widget", None, None, Some(2), None, Some("widgets"))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0]["metadata"]["name"], "w1");
    assert_eq!(first.items[0]["apiVersion"], "example.org/v1");
    assert_eq!(first.items[0]["kind"], "Widget");
    assert_eq!(first.continue_token.as_deref(), Some("cursor-1"));
    assert_eq!(first.remaining_item_count, Some(3));

    let second = pool
        .list_resources(
            "example.org/v1",
            "Widget",
            None,
            None,
            Some(2),
            first.continue_token.as_deref(),
            Some("widgets"),
        )
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.continue_token.as_deref(), Some("cursor-2"));

    let third = pool
        .list_resources(
            "example.org/v1",
            "Widget",
            None,
            None,
            Some(2),
            second.continue_token.as_deref(),
            Some("widgets"),
        )
        .await
        .unwrap();
    assert_eq!(third.items.len(), 1);
    assert_eq!(third.items[0]["metadata"]["name"], "w5");
    assert_eq!(third.continue_token, None);
}

/// A 404 on the list path means the type is not served on this cluster:
/// empty page, not an error.
#[tokio::test]
async fn test_list_normalizes_not_found_to_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/widgets"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(status_not_found("widgets.example.org not found")),
        )
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let page = pool
        .list_resources("example.org/v1", "Widget", None, None, None, None, Some("widgets"))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.continue_token, None);
    assert_eq!(page.remaining_item_count, None);
}

/// The string sentinels "undefined" and "null" behave like an absent
/// namespace: the request goes to the cluster-scoped path.
#[tokio::test]
async fn test_list_treats_sentinel_namespace_as_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "example.org/v1",
            "Widget",
            json!([{"metadata": {"name": "w1"}}]),
            None,
            None,
        )))
        .expect(2)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());

    for sentinel in ["undefined", "null"] {
        let page = pool
            .list_resources(
                "example.org/v1",
                "Widget",
                Some(sentinel),
                None,
                None,
                None,
                Some("widgets"),
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }
}

/// A real namespace scopes the request under /namespaces/{ns}/
#[tokio::test]
async fn test_list_namespaced_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/namespaces/team-a/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "example.org/v1",
            "Widget",
            json!([{"metadata": {"name": "w1", "namespace": "team-a"}}]),
            None,
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let page = pool
        .list_resources(
            "example.org/v1",
            "Widget",
            Some("team-a"),
            None,
            None,
            None,
            Some("widgets"),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
}

/// Malformed apiVersion strings are a hard error before any API call
#[tokio::test]
async fn test_list_rejects_malformed_api_version() {
    let server = MockServer::start().await;
    let pool = pool_for(&server.uri());

    for bad in ["", "/v1", "apps/", "a/b/c"] {
        let err = pool
            .list_resources(bad, "Widget", None, None, None, None, Some("widgets"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGroupVersion(_)), "{bad}: {err}");
    }
}

/// Once resolved, the plural comes from the permanent cache: the second
/// resolution performs no discovery request.
#[tokio::test]
async fn test_resolve_plural_caches_discovery_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_resource_list(
            "example.org/v1",
            json!([{
                "name": "widgets",
                "singularName": "widget",
                "namespaced": true,
                "kind": "Widget",
                "verbs": ["list", "get"]
            }]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());

    let first = pool.resolve_plural("example.org/v1", "Widget", None).await.unwrap();
    assert_eq!(first, "widgets");

    let second = pool.resolve_plural("example.org/v1", "Widget", None).await.unwrap();
    assert_eq!(second, "widgets");

    // Mock expectation (exactly one discovery call) verifies on drop
}

/// Discovery of a core-group kind queries the legacy /api/v1 document
#[tokio::test]
async fn test_resolve_plural_core_group() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_resource_list(
            "v1",
            json!([
                {
                    "name": "configmaps",
                    "singularName": "configmap",
                    "namespaced": true,
                    "kind": "ConfigMap",
                    "verbs": ["list", "get"]
                },
                {
                    "name": "configmaps/status",
                    "singularName": "",
                    "namespaced": true,
                    "kind": "ConfigMap",
                    "verbs": ["get"]
                }
            ]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let plural = pool.resolve_plural("v1", "ConfigMap", None).await.unwrap();
    assert_eq!(plural, "configmaps");
}

/// With discovery failing, a matching CRD in the catalog supplies the
/// plural instead of the naming heuristic.
#[tokio::test]
async fn test_resolve_plural_falls_back_to_crd_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(status_internal_error("discovery broken")),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/apis/apiextensions.k8s.io/v1/customresourcedefinitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
            "apiextensions.k8s.io/v1",
            "CustomResourceDefinition",
            json!([{
                "metadata": {"name": "widgetz.example.org"},
                "spec": {
                    "group": "example.org",
                    "versions": [{"name": "v1"}],
                    "names": {"kind": "Widget", "plural": "widgetz"}
                }
            }]),
            None,
            None,
        )))
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let plural = pool.resolve_plural("example.org/v1", "Widget", None).await.unwrap();
    assert_eq!(plural, "widgetz");
}

/// With discovery and catalog both unavailable the heuristic answers,
/// and Crossplane composite kinds keep their already-plural form.
#[tokio::test]
async fn test_resolve_plural_heuristic_when_cluster_unhelpful() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(status_internal_error("nothing works")),
        )
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());

    let plural = pool.resolve_plural("example.org/v1", "Widget", None).await.unwrap();
    assert_eq!(plural, "widgets");

    let composite = pool
        .resolve_plural("platform.example.org/v1", "XNetwork", None)
        .await
        .unwrap();
    assert_eq!(composite, "xnetwork");
}

/// A typed built-in read that misses surfaces the typed not-found error
/// naming kind and name.
#[tokio::test]
async fn test_get_secret_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/secrets/x"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(status_not_found("secrets \"x\" not found")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let err = pool
        .get_resource("v1", "Secret", "x", Some("default"), None, None)
        .await
        .unwrap_err();

    match err {
        Error::ResourceNotFound { kind, name } => {
            assert_eq!(kind, "Secret");
            assert_eq!(name, "x");
        }
        other => panic!("expected ResourceNotFound, got {other}"),
    }
}

/// Dynamic get for a custom kind goes through the resolved plural path
#[tokio::test]
async fn test_get_custom_resource() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apis/example.org/v1/namespaces/team-a/widgets/w1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "example.org/v1",
            "kind": "Widget",
            "metadata": {"name": "w1", "namespace": "team-a"},
            "spec": {"size": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pool = pool_for(&server.uri());
    let widget = pool
        .get_resource("example.org/v1", "Widget", "w1", Some("team-a"), None, Some("widgets"))
        .await
        .unwrap();

    assert_eq!(widget["kind"], "Widget");
    assert_eq!(widget["spec"]["size"], 3);
}

/// A get on kind Event is refused: events go through the field-selector
/// query instead.
#[tokio::test]
async fn test_get_event_kind_is_refused() {
    let server = MockServer::start().await;
    let pool = pool_for(&server.uri());

    let err = pool
        .get_resource("v1", "Event", "e1", Some("default"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EventsNotSupported));
}
