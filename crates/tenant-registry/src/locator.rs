use tenant_client::{ClusterClientExt, DynamicClusterClient, ResourceClient, SharedClient};
use tenant_model::GroupVersionResource;

use crate::error::{RegistryError, Result};
use crate::scope::RequestScope;

/// Handle to the tenant's endpoint for `resource`, narrowed to the namespace
/// when the scope carries one. A wildcard scope addresses every tenant.
pub fn locate<C>(
    client: &SharedClient<C>,
    scope: &RequestScope,
    resource: &GroupVersionResource,
) -> ResourceClient<C>
where
    C: DynamicClusterClient,
{
    let handle = client.cluster(scope.cluster.clone()).resource(resource);
    match &scope.namespace {
        Some(namespace) => handle.namespace(namespace.clone()),
        None => handle,
    }
}

/// single-object operations never fan out across tenants
pub fn locate_concrete<C>(
    client: &SharedClient<C>,
    scope: &RequestScope,
    resource: &GroupVersionResource,
    operation: &'static str,
) -> Result<ResourceClient<C>>
where
    C: DynamicClusterClient,
{
    if scope.is_wildcard() {
        return Err(RegistryError::WildcardCluster(operation));
    }
    Ok(locate(client, scope, resource))
}
