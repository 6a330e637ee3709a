mod cache;
pub mod catalog;
mod client;
mod credentials;
pub mod crossplane;
mod events;
mod gvk;
mod managed;
mod plural;
mod resources;

pub use client::{ClientPool, NamespaceSummary};
pub use credentials::{ClusterContext, CredentialSet, IN_CLUSTER_CONTEXT};
pub use gvk::GroupVersion;
pub use managed::ManagedResourceSet;
pub use resources::Page;
