// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for the access layer.
//!
//! Discovery failures during plural resolution never escape the resolver
//! cascade, and not-found conditions are normalized at the resource client
//! boundary (empty page for lists, typed not-found for single reads), so
//! callers only ever see the variants below.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the access layer
#[derive(Debug, Error)]
pub enum Error {
    /// Neither an in-cluster service account nor a kubeconfig file was found
    #[error(
        "no credentials found: no in-cluster service account and no kubeconfig at {searched} \
         (checked KUBECONFIG, then KUBE_CONFIG_PATH, then the home directory default)"
    )]
    CredentialsNotFound { searched: String },

    /// Context name not present in the loaded credential set
    #[error("context '{0}' not found")]
    ContextNotFound(String),

    /// Kubeconfig or in-cluster configuration could not be turned into a client config
    #[error("invalid client configuration: {0}")]
    InvalidKubeconfig(String),

    /// Malformed apiVersion string (empty, blank segment, or too many segments)
    #[error("invalid apiVersion '{0}': expected 'version' or 'group/version'")]
    InvalidGroupVersion(String),

    /// Network or parse failure while querying the discovery API.
    /// Recovered inside the plural-resolution cascade; only surfaces from
    /// direct discovery calls.
    #[error("discovery request failed: {0}")]
    DiscoveryTransport(#[source] kube::Error),

    /// Single-resource read targeted an object that does not exist
    #[error("resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    /// Events cannot be read like ordinary resources; they require a
    /// field-selector query against the involved object
    #[error("events must be fetched with list_events, not a direct get")]
    EventsNotSupported,

    /// A fanned-out per-type query exceeded its time budget.
    /// Recovered inside the aggregator as an empty contribution.
    #[error("query for '{kind}' timed out after {timeout:?}")]
    QueryTimeout { kind: String, timeout: Duration },

    /// Anything else the cluster returned
    #[error("{operation} failed: {source}")]
    UpstreamApi {
        operation: String,
        #[source]
        source: kube::Error,
    },

    /// Transport failure while talking to a remote crossview API
    #[error("{operation} failed: {source}")]
    Proxy {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success response from a remote crossview API
    #[error("{operation} failed with status {status}: {message}")]
    ProxyStatus {
        operation: String,
        status: u16,
        message: String,
    },
}

/// Result type alias for access-layer operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
