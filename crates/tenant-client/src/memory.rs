//! In-memory multi-tenant backing store.
//!
//! Objects are kept per (cluster, resource, namespace, name). Every write
//! bumps a store-wide revision which becomes the object's resource version;
//! updates carrying a stale resource version are rejected with a conflict.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_channel::{Sender, unbounded};
use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, trace};

use tenant_model::{
    ClusterName, DynamicList, DynamicObject, GetOptions, GroupVersionResource, LabelSelector,
    RequestContext, StatusError, UpdateOptions, WatchEvent,
};

use crate::client::{DynamicClusterClient, ListParams, ResourceScope, WatchStream};
use crate::ClientError;

const CONFLICT_DETAIL: &str =
    "the object has been modified; please apply your changes to the latest version and try again";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    cluster: ClusterName,
    resource: GroupVersionResource,
    namespace: String,
    name: String,
}

impl ObjectKey {
    fn new(scope: &ResourceScope, name: &str) -> Self {
        Self {
            cluster: scope.cluster.clone(),
            resource: scope.resource.clone(),
            namespace: scope.namespace.clone().unwrap_or_default(),
            name: name.to_owned(),
        }
    }

    fn in_scope(&self, scope: &ResourceScope) -> bool {
        self.resource == scope.resource
            && (scope.cluster.is_wildcard() || self.cluster == scope.cluster)
            && scope
                .namespace
                .as_ref()
                .is_none_or(|namespace| &self.namespace == namespace)
    }
}

#[derive(Debug)]
struct Watcher {
    scope: ResourceScope,
    selector: LabelSelector,
    sender: Sender<WatchEvent>,
}

impl Watcher {
    fn wants(&self, key: &ObjectKey, object: &DynamicObject) -> bool {
        key.in_scope(&self.scope) && self.selector.matches(&object.labels())
    }
}

#[derive(Debug, Default)]
pub struct MemoryClusterClient {
    objects: RwLock<BTreeMap<ObjectKey, DynamicObject>>,
    watchers: Mutex<Vec<Watcher>>,
    revision: AtomicU64,
}

impl MemoryClusterClient {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn current_revision(&self) -> String {
        self.revision.load(Ordering::SeqCst).to_string()
    }

    /// seed an object; the cluster annotation and namespace follow the scope
    pub async fn create(
        &self,
        scope: &ResourceScope,
        mut object: DynamicObject,
    ) -> Result<DynamicObject, ClientError> {
        reject_wildcard(scope, "create")?;
        let key = ObjectKey::new(scope, object.name());

        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(StatusError::conflict(
                &scope.resource.group_resource(),
                &key.name,
                "object already exists",
            )
            .into());
        }
        if let Some(namespace) = &scope.namespace {
            object.set_namespace(namespace.clone());
        }
        object.set_cluster(scope.cluster.as_str());
        object.set_resource_version(self.next_revision());
        objects.insert(key.clone(), object.clone());

        debug!(%scope, name = %key.name, "created");
        // publish under the write guard so watchers see writes in version order
        self.publish(&key, WatchEvent::Added(object.clone())).await;
        Ok(object)
    }

    pub async fn delete(&self, scope: &ResourceScope, name: &str) -> Result<(), ClientError> {
        reject_wildcard(scope, "delete")?;
        let key = ObjectKey::new(scope, name);

        let mut objects = self.objects.write().await;
        let Some(removed) = objects.remove(&key) else {
            return Err(StatusError::not_found(&scope.resource.group_resource(), name).into());
        };

        debug!(%scope, name, "deleted");
        self.publish(&key, WatchEvent::Deleted(removed)).await;
        Ok(())
    }

    /// number of watch streams still held by a consumer
    pub async fn active_watchers(&self) -> usize {
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|watcher| !watcher.sender.is_closed());
        watchers.len()
    }

    async fn publish(&self, key: &ObjectKey, event: WatchEvent) {
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|watcher| !watcher.sender.is_closed());
        for watcher in watchers.iter().filter(|w| w.wants(key, event.object())) {
            if let Err(err) = watcher.sender.try_send(event.clone()) {
                trace!("dropping event for closed watcher: {err}");
            }
        }
    }
}

fn reject_wildcard(scope: &ResourceScope, verb: &str) -> Result<(), ClientError> {
    if scope.cluster.is_wildcard() {
        Err(StatusError::bad_request(format!(
            "{verb} of {} requires a concrete cluster",
            scope.resource.group_resource()
        ))
        .into())
    } else {
        Ok(())
    }
}

fn parse_selector(params: &ListParams) -> Result<LabelSelector, ClientError> {
    LabelSelector::parse(&params.label_selector)
        .map_err(|err| StatusError::bad_request(format!("unable to parse selector: {err}")).into())
}

#[async_trait]
impl DynamicClusterClient for MemoryClusterClient {
    async fn get(
        &self,
        _ctx: &RequestContext,
        scope: &ResourceScope,
        name: &str,
        _options: &GetOptions,
        _sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError> {
        reject_wildcard(scope, "get")?;
        let objects = self.objects.read().await;
        objects
            .get(&ObjectKey::new(scope, name))
            .cloned()
            .ok_or_else(|| StatusError::not_found(&scope.resource.group_resource(), name).into())
    }

    async fn list(
        &self,
        _ctx: &RequestContext,
        scope: &ResourceScope,
        params: &ListParams,
    ) -> Result<DynamicList, ClientError> {
        let selector = parse_selector(params)?;
        trace!(%scope, %selector, "listing");

        let objects = self.objects.read().await;
        let mut items: Vec<DynamicObject> = objects
            .iter()
            .filter(|(key, object)| key.in_scope(scope) && selector.matches(&object.labels()))
            .map(|(_, object)| object.clone())
            .collect();
        drop(objects);

        if let Some(limit) = params.limit.filter(|limit| *limit > 0) {
            items.truncate(limit as usize);
        }

        let mut list = DynamicList::new(scope.resource.api_version(), "List");
        list.metadata.resource_version = self.current_revision();
        list.items = items;
        Ok(list)
    }

    async fn watch(
        &self,
        ctx: &RequestContext,
        scope: &ResourceScope,
        params: &ListParams,
    ) -> Result<WatchStream, ClientError> {
        let selector = parse_selector(params)?;
        let (sender, receiver) = unbounded();
        debug!(%scope, %selector, "watch registered");

        self.watchers.lock().await.push(Watcher {
            scope: scope.clone(),
            selector,
            sender,
        });

        Ok(receiver
            .map(Ok::<_, ClientError>)
            .take_until(ctx.done_owned())
            .boxed())
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        scope: &ResourceScope,
        mut object: DynamicObject,
        options: &UpdateOptions,
        _sub_resources: &[String],
    ) -> Result<DynamicObject, ClientError> {
        reject_wildcard(scope, "update")?;
        let resource = scope.resource.group_resource();
        let key = ObjectKey::new(scope, object.name());

        let mut objects = self.objects.write().await;
        let Some(current) = objects.get(&key) else {
            return Err(StatusError::not_found(&resource, &key.name).into());
        };
        let requested = object.resource_version();
        if !requested.is_empty() && requested != current.resource_version() {
            debug!(
                %scope,
                name = %key.name,
                requested,
                current = current.resource_version(),
                "stale update"
            );
            return Err(StatusError::conflict(&resource, &key.name, CONFLICT_DETAIL).into());
        }

        if let Some(namespace) = &scope.namespace {
            object.set_namespace(namespace.clone());
        }
        object.set_cluster(scope.cluster.as_str());

        if !options.dry_run.is_empty() {
            object.set_resource_version(current.resource_version().to_owned());
            return Ok(object);
        }

        object.set_resource_version(self.next_revision());
        objects.insert(key.clone(), object.clone());

        debug!(%scope, name = %key.name, version = object.resource_version(), "updated");
        self.publish(&key, WatchEvent::Modified(object.clone())).await;
        Ok(object)
    }
}
