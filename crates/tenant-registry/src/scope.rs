//! Tenant resolution from the request context.

use tenant_model::{Cluster, ClusterName, GroupVersionResource, RequestContext};

use crate::error::{RegistryError, Result};

/// tenant and namespace a single call is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub cluster: ClusterName,
    pub namespace: Option<String>,
}

impl RequestScope {
    pub fn is_wildcard(&self) -> bool {
        self.cluster.is_wildcard()
    }
}

/// Namespace is only read for namespaced resources; for those an absent or
/// empty namespace is an error.
pub fn resolve_scope(
    ctx: &RequestContext,
    resource: &GroupVersionResource,
    namespaced: bool,
) -> Result<RequestScope> {
    let cluster = match ctx.cluster() {
        Some(Cluster::Named(name)) if !name.is_empty() => name.clone(),
        Some(Cluster::Wildcard) => ClusterName::wildcard(),
        _ => return Err(RegistryError::MissingCluster),
    };

    let namespace = if namespaced {
        match ctx.namespace().filter(|ns| !ns.is_empty()) {
            Some(ns) => Some(ns.to_owned()),
            None => return Err(RegistryError::MissingNamespace(resource.to_string())),
        }
    } else {
        None
    };

    Ok(RequestScope { cluster, namespace })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> GroupVersionResource {
        GroupVersionResource::new("example.io", "v1", "widgets")
    }

    #[test]
    fn test_missing_cluster() {
        let err = resolve_scope(&RequestContext::background(), &widgets(), false)
            .expect_err("no cluster");
        assert!(matches!(err, RegistryError::MissingCluster));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cluster_scoped_ignores_namespace() {
        let ctx = RequestContext::background()
            .with_cluster("root:a")
            .with_namespace("ns");
        let scope = resolve_scope(&ctx, &widgets(), false).expect("scope");
        assert_eq!(scope.cluster.as_str(), "root:a");
        assert_eq!(scope.namespace, None);
    }

    #[test]
    fn test_namespaced_requires_namespace() {
        let ctx = RequestContext::background().with_cluster("root:a");
        let err = resolve_scope(&ctx, &widgets(), true).expect_err("no namespace");
        assert!(matches!(err, RegistryError::MissingNamespace(_)));

        let ctx = ctx.with_namespace("");
        let err = resolve_scope(&ctx, &widgets(), true).expect_err("empty namespace");
        assert!(matches!(err, RegistryError::MissingNamespace(_)));
    }

    #[test]
    fn test_wildcard() {
        let ctx = RequestContext::background()
            .with_wildcard_cluster()
            .with_namespace("ns");
        let scope = resolve_scope(&ctx, &widgets(), true).expect("scope");
        assert!(scope.is_wildcard());
        assert_eq!(scope.namespace.as_deref(), Some("ns"));
    }
}
