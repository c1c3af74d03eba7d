use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use tenant_model::{
    ClusterName, DynamicList, DynamicObject, GetOptions, GroupVersionResource, ListOptions,
    RequestContext, UpdateOptions, WatchEvent,
};

use crate::{ClientError, SharedClient};

pub type WatchStream = BoxStream<'static, Result<WatchEvent, ClientError>>;

/// where a call lands: tenant, resource type and optional namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceScope {
    pub cluster: ClusterName,
    pub resource: GroupVersionResource,
    pub namespace: Option<String>,
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}|{}|{}", self.cluster, ns, self.resource.resource),
            None => write!(f, "{}|{}", self.cluster, self.resource.resource),
        }
    }
}

/// list / watch options in the shape the backing store accepts
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub label_selector: String,
    pub field_selector: String,
    pub resource_version: Option<String>,
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub allow_watch_bookmarks: bool,
}

impl From<&ListOptions> for ListParams {
    fn from(options: &ListOptions) -> Self {
        Self {
            label_selector: options.label_selector.clone().unwrap_or_default(),
            field_selector: options.field_selector.clone().unwrap_or_default(),
            resource_version: options.resource_version.clone(),
            limit: options.limit,
            continue_token: options.continue_token.clone(),
            timeout_seconds: options.timeout_seconds,
            allow_watch_bookmarks: options.allow_watch_bookmarks,
        }
    }
}

/// Dynamic client shared by every tenant.
///
/// Implementations must be safe for concurrent use; a wildcard cluster in
/// the scope addresses all tenants and is only meaningful for list/watch.
#[async_trait]
pub trait DynamicClusterClient: Send + Sync {
    async fn get(
        &self,
        ctx: &RequestContext,
        scope: &ResourceScope,
        name: &str,
        options: &GetOptions,
        sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError>;

    async fn list(
        &self,
        ctx: &RequestContext,
        scope: &ResourceScope,
        params: &ListParams,
    ) -> Result<DynamicList, ClientError>;

    /// stream must end once `ctx` is done
    async fn watch(
        &self,
        ctx: &RequestContext,
        scope: &ResourceScope,
        params: &ListParams,
    ) -> Result<WatchStream, ClientError>;

    async fn update(
        &self,
        ctx: &RequestContext,
        scope: &ResourceScope,
        object: DynamicObject,
        options: &UpdateOptions,
        sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError>;
}

/// fluent `cluster(..).resource(..).namespace(..)` addressing
pub trait ClusterClientExt<C> {
    fn cluster(&self, cluster: ClusterName) -> ClusterHandle<C>;
}

impl<C> ClusterClientExt<C> for SharedClient<C>
where
    C: DynamicClusterClient,
{
    fn cluster(&self, cluster: ClusterName) -> ClusterHandle<C> {
        ClusterHandle {
            client: self.clone(),
            cluster,
        }
    }
}

pub struct ClusterHandle<C> {
    client: SharedClient<C>,
    cluster: ClusterName,
}

impl<C> ClusterHandle<C>
where
    C: DynamicClusterClient,
{
    pub fn resource(&self, resource: &GroupVersionResource) -> ResourceClient<C> {
        ResourceClient {
            client: self.client.clone(),
            scope: ResourceScope {
                cluster: self.cluster.clone(),
                resource: resource.clone(),
                namespace: None,
            },
        }
    }
}

/// Handle to one tenant's endpoint for one resource type.
///
/// Cluster- and namespace-scoped access share this type; narrowing to a
/// namespace only changes the scope.
pub struct ResourceClient<C> {
    client: SharedClient<C>,
    scope: ResourceScope,
}

impl<C> fmt::Debug for ResourceClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceClient").field(&self.scope).finish()
    }
}

impl<C> Clone for ResourceClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<C> ResourceClient<C>
where
    C: DynamicClusterClient,
{
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.scope.namespace = Some(namespace.into());
        self
    }

    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
        sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError> {
        self.client
            .get(ctx, &self.scope, name, options, sub_resources)
            .await
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> Result<DynamicList, ClientError> {
        self.client.list(ctx, &self.scope, params).await
    }

    pub async fn watch(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> Result<WatchStream, ClientError> {
        self.client.watch(ctx, &self.scope, params).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        object: DynamicObject,
        options: &UpdateOptions,
        sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError> {
        self.client
            .update(ctx, &self.scope, object, options, sub_resources)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_from_options() {
        let options = ListOptions {
            label_selector: Some("env=prod".to_owned()),
            limit: Some(10),
            ..Default::default()
        };
        let params = ListParams::from(&options);
        assert_eq!(params.label_selector, "env=prod");
        assert_eq!(params.field_selector, "");
        assert_eq!(params.limit, Some(10));
    }
}
