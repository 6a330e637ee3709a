// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Credential material and context resolution.
//!
//! An in-cluster service account (token + CA certificate under the
//! well-known mount) takes priority over a kubeconfig file. The kubeconfig
//! path is resolved from `KUBECONFIG`, then `KUBE_CONFIG_PATH`, then
//! `~/.kube/config`.

use std::path::{Path, PathBuf};

use kube::config::Kubeconfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Mount point of the in-cluster service account
const SERVICE_ACCOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Synthetic context name exposed when running inside a cluster
pub const IN_CLUSTER_CONTEXT: &str = "in-cluster";

/// A named connection target from the credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterContext {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: String,
}

/// Loaded connection material: either the pod's own service account or a
/// kubeconfig file with its named contexts
#[derive(Debug, Clone)]
pub enum CredentialSet {
    InCluster,
    Kubeconfig(Kubeconfig),
}

impl CredentialSet {
    /// Load credentials, preferring the in-cluster service account
    pub fn load() -> Result<Self> {
        if in_cluster_files_present(Path::new(SERVICE_ACCOUNT_PATH)) {
            info!("using in-cluster service account credentials");
            return Ok(Self::InCluster);
        }

        let path = kubeconfig_path();
        if !path.exists() {
            return Err(Error::CredentialsNotFound {
                searched: path.display().to_string(),
            });
        }

        let kubeconfig = Kubeconfig::read_from(&path)
            .map_err(|e| Error::InvalidKubeconfig(e.to_string()))?;
        info!(path = %path.display(), "loaded kubeconfig");
        Ok(Self::Kubeconfig(kubeconfig))
    }

    /// All named contexts in this credential set
    pub fn contexts(&self) -> Vec<ClusterContext> {
        match self {
            Self::InCluster => vec![ClusterContext {
                name: IN_CLUSTER_CONTEXT.to_string(),
                cluster: IN_CLUSTER_CONTEXT.to_string(),
                user: String::new(),
                namespace: "default".to_string(),
            }],
            Self::Kubeconfig(kc) => kc
                .contexts
                .iter()
                .map(|named| {
                    let ctx = named.context.as_ref();
                    ClusterContext {
                        name: named.name.clone(),
                        cluster: ctx.map(|c| c.cluster.clone()).unwrap_or_default(),
                        user: ctx.and_then(|c| c.user.clone()).unwrap_or_default(),
                        namespace: ctx
                            .and_then(|c| c.namespace.clone())
                            .unwrap_or_else(|| "default".to_string()),
                    }
                })
                .collect(),
        }
    }

    /// Whether a context with the given name exists
    pub fn has_context(&self, name: &str) -> bool {
        match self {
            Self::InCluster => name == IN_CLUSTER_CONTEXT,
            Self::Kubeconfig(kc) => kc.contexts.iter().any(|c| c.name == name),
        }
    }

    /// The context selected by the credential source itself, if any
    pub fn default_context(&self) -> Option<String> {
        match self {
            Self::InCluster => Some(IN_CLUSTER_CONTEXT.to_string()),
            Self::Kubeconfig(kc) => kc.current_context.clone(),
        }
    }
}

/// Both the token and the CA certificate must be present; a bare mount
/// directory is not enough to authenticate
fn in_cluster_files_present(dir: &Path) -> bool {
    dir.join("token").exists() && dir.join("ca.crt").exists()
}

/// Kubeconfig path: explicit override, secondary override, home default
fn kubeconfig_path() -> PathBuf {
    if let Ok(path) = std::env::var("KUBECONFIG") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Ok(path) = std::env::var("KUBE_CONFIG_PATH") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .unwrap_or_else(|| PathBuf::from(".kube/config"))
}
