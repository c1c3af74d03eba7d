//! Forwarding store: serves one resource type for every tenant by delegating
//! to the tenant's backing endpoint, narrowed by a fixed label scope.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use tenant_client::{DynamicClusterClient, ListParams, ResourceClient, SharedClient};
use tenant_model::{
    DynamicList, DynamicObject, GetOptions, GroupResource, ListOptions, RequestContext,
    ResetFields, ResourceCoordinate, RuntimeObject, StatusError, StopSignal, Table, TableOptions,
    UpdateOptions, Verb,
};

use crate::backoff::BackoffPolicy;
use crate::error::{RegistryError, Result};
use crate::labels::LabelScope;
use crate::locator::{locate, locate_concrete};
use crate::rest::StandardStorage;
use crate::retry::retry_on_conflict;
use crate::scope::{RequestScope, resolve_scope};
use crate::strategy::{
    CreateStrategy, DeleteStrategy, ResetFieldsStrategy, TableConvertor, UpdateStrategy,
    UpdatedObjectInfo, ValidateObjectFn, ValidateObjectUpdateFn,
};
use crate::watch::{ForwardedWatch, WatchLifecycle};

pub type NewObjectFn = Arc<dyn Fn() -> DynamicObject + Send + Sync>;
pub type NewListFn = Arc<dyn Fn() -> DynamicList + Send + Sync>;

pub struct Store<C> {
    pub(crate) new_fn: NewObjectFn,
    pub(crate) new_list_fn: NewListFn,
    pub(crate) default_qualified_resource: GroupResource,
    pub(crate) create_strategy: Arc<dyn CreateStrategy>,
    pub(crate) update_strategy: Arc<dyn UpdateStrategy>,
    pub(crate) delete_strategy: Arc<dyn DeleteStrategy>,
    pub(crate) table_convertor: Arc<dyn TableConvertor>,
    pub(crate) reset_fields_strategy: Option<Arc<dyn ResetFieldsStrategy>>,
    pub(crate) coordinate: ResourceCoordinate,
    pub(crate) client: SharedClient<C>,
    pub(crate) patch_conflict_backoff: BackoffPolicy,
    pub(crate) label_scope: LabelScope,
    pub(crate) watches: WatchLifecycle,
}

impl<C> fmt::Debug for Store<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("resource", &self.coordinate)
            .field("qualified", &self.default_qualified_resource)
            .field("label_scope", &self.label_scope)
            .finish_non_exhaustive()
    }
}

impl<C> Store<C>
where
    C: DynamicClusterClient + 'static,
{
    pub fn coordinate(&self) -> &ResourceCoordinate {
        &self.coordinate
    }

    pub fn label_scope(&self) -> &LabelScope {
        &self.label_scope
    }

    pub fn create_strategy(&self) -> &Arc<dyn CreateStrategy> {
        &self.create_strategy
    }

    pub fn update_strategy(&self) -> &Arc<dyn UpdateStrategy> {
        &self.update_strategy
    }

    pub fn delete_strategy(&self) -> &Arc<dyn DeleteStrategy> {
        &self.delete_strategy
    }

    pub fn stop_signal(&self) -> &Arc<StopSignal> {
        self.watches.stop_signal()
    }

    /// watch observer tasks still running
    pub fn live_watch_tasks(&self) -> usize {
        self.watches.live_tasks()
    }

    fn resolve(&self, ctx: &RequestContext) -> Result<RequestScope> {
        resolve_scope(
            ctx,
            self.coordinate.resource(),
            self.create_strategy.namespace_scoped(),
        )
    }

    fn endpoint(&self, ctx: &RequestContext) -> Result<ResourceClient<C>> {
        let scope = self.resolve(ctx)?;
        Ok(locate(&self.client, &scope, self.coordinate.resource()))
    }

    fn concrete_endpoint(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
    ) -> Result<ResourceClient<C>> {
        let scope = self.resolve(ctx)?;
        locate_concrete(&self.client, &scope, self.coordinate.resource(), operation)
    }

    fn scoped_params(&self, options: &ListOptions) -> ListParams {
        let mut params = ListParams::from(options);
        params.label_selector = self.label_scope.inject_into_selector(&params.label_selector);
        params
    }

    async fn fetch(
        &self,
        endpoint: &ResourceClient<C>,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<DynamicObject> {
        let object = endpoint
            .get(ctx, name, options, self.coordinate.sub_resources())
            .await?;

        if !self.label_scope.matches(&object) {
            trace!(name, "object outside label scope");
            return Err(StatusError::not_found(&self.default_qualified_resource, name).into());
        }
        Ok(object)
    }

    /// one read-modify-write cycle against the freshest copy
    async fn update_once(
        &self,
        ctx: &RequestContext,
        name: &str,
        object_info: &dyn UpdatedObjectInfo,
        update_validation: &ValidateObjectUpdateFn,
        options: &UpdateOptions,
    ) -> Result<DynamicObject> {
        let endpoint = self.concrete_endpoint(ctx, "update")?;
        let old = self.fetch(&endpoint, ctx, name, &GetOptions::default()).await?;

        let candidate = object_info.updated_object(ctx, &old)?;
        let mut new = DynamicObject::try_from(candidate)
            .map_err(|err| RegistryError::TypeMismatch(err.to_string()))?;
        if new.name() != name {
            debug!(name, renamed = new.name(), "update tried to rename the object");
            return Err(StatusError::bad_request(format!(
                "the name of the object ({}) does not match the name on the URL ({name})",
                new.name()
            ))
            .into());
        }

        self.update_strategy.prepare_for_update(ctx, &mut new, &old);
        let errors = self.update_strategy.validate_update(ctx, &new, &old);
        if !errors.is_empty() {
            debug!(name, count = errors.len(), "update rejected by strategy");
            return Err(StatusError::invalid(&new.group_kind(), new.name(), errors).into());
        }
        update_validation(ctx, &new, &old)?;

        Ok(endpoint
            .update(ctx, new, options, self.coordinate.sub_resources())
            .await?)
    }
}

#[async_trait]
impl<C> StandardStorage for Store<C>
where
    C: DynamicClusterClient + 'static,
{
    fn new_object(&self) -> DynamicObject {
        (self.new_fn)()
    }

    fn new_list(&self) -> DynamicList {
        (self.new_list_fn)()
    }

    #[instrument(skip(self, ctx, options), fields(resource = %self.coordinate))]
    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<DynamicObject> {
        let endpoint = self.concrete_endpoint(ctx, "get")?;
        self.fetch(&endpoint, ctx, name, options).await
    }

    #[instrument(skip(self, ctx, options), fields(resource = %self.coordinate))]
    async fn list(&self, ctx: &RequestContext, options: &ListOptions) -> Result<DynamicList> {
        let endpoint = self.endpoint(ctx)?;
        let params = self.scoped_params(options);
        trace!(selector = %params.label_selector, "forwarding list");
        Ok(endpoint.list(ctx, &params).await?)
    }

    #[instrument(skip(self, ctx, options), fields(resource = %self.coordinate))]
    async fn watch(&self, ctx: &RequestContext, options: &ListOptions) -> Result<ForwardedWatch> {
        let endpoint = self.endpoint(ctx)?;
        let params = self.scoped_params(options);

        let (watch_ctx, guard) = self.watches.bind(ctx);
        // guard drops on failure and releases the observer
        let stream = endpoint.watch(&watch_ctx, &params).await?;
        debug!(selector = %params.label_selector, "watch started");
        Ok(ForwardedWatch::new(stream, &watch_ctx, guard))
    }

    #[instrument(
        skip(self, ctx, object_info, _create_validation, update_validation, options),
        fields(resource = %self.coordinate)
    )]
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        object_info: &dyn UpdatedObjectInfo,
        _create_validation: &ValidateObjectFn,
        update_validation: &ValidateObjectUpdateFn,
        _force_allow_create: bool,
        options: &UpdateOptions,
    ) -> Result<(DynamicObject, bool)> {
        let is_patch = ctx
            .request_info()
            .is_some_and(|info| info.verb == Verb::Patch);

        let object = if is_patch {
            retry_on_conflict(&self.patch_conflict_backoff, || {
                self.update_once(ctx, name, object_info, update_validation, options)
            })
            .await?
        } else {
            self.update_once(ctx, name, object_info, update_validation, options)
                .await?
        };
        Ok((object, false))
    }

    async fn create(
        &self,
        _ctx: &RequestContext,
        _object: DynamicObject,
        _create_validation: &ValidateObjectFn,
    ) -> Result<DynamicObject> {
        unimplemented!("create is not served by the forwarding store")
    }

    async fn delete(
        &self,
        _ctx: &RequestContext,
        _name: &str,
        _delete_validation: &ValidateObjectFn,
    ) -> Result<(DynamicObject, bool)> {
        unimplemented!("delete is not served by the forwarding store")
    }

    async fn delete_collection(
        &self,
        _ctx: &RequestContext,
        _delete_validation: &ValidateObjectFn,
        _options: &ListOptions,
    ) -> Result<DynamicList> {
        unimplemented!("delete collection is not served by the forwarding store")
    }

    async fn convert_to_table(
        &self,
        ctx: &RequestContext,
        object: &RuntimeObject,
        options: &TableOptions,
    ) -> Result<Table> {
        self.table_convertor
            .convert_to_table(ctx, object, options)
            .await
    }

    fn get_reset_fields(&self) -> Option<ResetFields> {
        self.reset_fields_strategy
            .as_ref()
            .map(|strategy| strategy.reset_fields())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use fluvio_future::task::run_block_on;
    use serde_json::{Value, json};

    use tenant_client::{MemoryClusterClient, ResourceScope};
    use tenant_model::{
        ClusterName, FieldError, FieldErrorList, GroupVersionResource, IncludeObjectPolicy,
    };

    use crate::builder::StoreBuilder;
    use crate::config::RegistryConfig;
    use crate::strategy::{MockTableConvertor, validate_all_object_updates, validate_all_objects};

    use super::*;

    struct WidgetStrategy {
        namespaced: bool,
    }

    impl CreateStrategy for WidgetStrategy {
        fn namespace_scoped(&self) -> bool {
            self.namespaced
        }
    }

    impl UpdateStrategy for WidgetStrategy {
        fn prepare_for_update(
            &self,
            _ctx: &RequestContext,
            new: &mut DynamicObject,
            old: &DynamicObject,
        ) {
            if let Some(status) = old.get("status") {
                new.insert("status", status.clone());
            }
        }

        fn validate_update(
            &self,
            _ctx: &RequestContext,
            new: &DynamicObject,
            _old: &DynamicObject,
        ) -> FieldErrorList {
            match new.get("spec").and_then(|spec| spec.get("size")) {
                Some(Value::Number(n)) if n.as_i64().is_some_and(|n| n < 0) => {
                    vec![FieldError::invalid(
                        "spec.size",
                        Value::Number(n.clone()),
                        "must be non-negative",
                    )]
                }
                _ => vec![],
            }
        }
    }

    impl DeleteStrategy for WidgetStrategy {}

    struct OwnedStatus;

    impl ResetFieldsStrategy for OwnedStatus {
        fn reset_fields(&self) -> ResetFields {
            BTreeMap::from([(
                "example.io/v1".to_owned(),
                BTreeSet::from(["status".to_owned()]),
            )])
        }
    }

    fn widgets() -> GroupVersionResource {
        GroupVersionResource::new("example.io", "v1", "widgets")
    }

    fn backing_scope(cluster: &str) -> ResourceScope {
        ResourceScope {
            cluster: ClusterName::new(cluster),
            resource: widgets(),
            namespace: None,
        }
    }

    fn builder(client: &Arc<MemoryClusterClient>) -> StoreBuilder<MemoryClusterClient> {
        StoreBuilder::new(
            widgets(),
            "Widget",
            client.clone(),
            Arc::new(WidgetStrategy { namespaced: false }),
        )
        .config(RegistryConfig::default().with_label("env", "prod"))
    }

    fn widget(name: &str, env: &str) -> DynamicObject {
        DynamicObject::new("example.io/v1", "Widget")
            .with_name(name)
            .with_labels([("env", env)])
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
            .with_cluster("root:a")
            .with_verb(Verb::Update)
    }

    fn set_size(size: i64) -> impl Fn(&RequestContext, &DynamicObject) -> Result<Value> {
        move |_, old| {
            let mut next = old.clone();
            next.insert("spec", json!({ "size": size }));
            Ok(next.into_value())
        }
    }

    #[test]
    fn test_factories() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client).build();
        let object = store.new_object();
        assert_eq!(object.kind(), "Widget");
        assert_eq!(object.api_version(), "example.io/v1");
        assert_eq!(store.new_list().kind, "WidgetList");
        assert!(store.get_reset_fields().is_none());
    }

    #[test]
    fn test_reset_fields() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client)
            .reset_fields_strategy(Arc::new(OwnedStatus))
            .build();
        let fields = store.get_reset_fields().expect("strategy set");
        assert!(fields["example.io/v1"].contains("status"));
    }

    #[fluvio_future::test]
    async fn test_get_outside_scope_is_not_found() {
        let client = MemoryClusterClient::new_shared();
        client
            .create(&backing_scope("root:a"), widget("y", "dev"))
            .await
            .expect("seed");
        let store = builder(&client).build();

        let hidden = store
            .get(&ctx(), "y", &GetOptions::default())
            .await
            .expect_err("hidden");
        let missing = store
            .get(&ctx(), "nope", &GetOptions::default())
            .await
            .expect_err("missing");
        assert!(hidden.is_not_found());
        assert_eq!(hidden.to_string(), r#"widgets.example.io "y" not found"#);
        assert_eq!(missing.to_string(), r#"widgets.example.io "nope" not found"#);
    }

    #[fluvio_future::test]
    async fn test_update_rejects_non_object() {
        let client = MemoryClusterClient::new_shared();
        client
            .create(&backing_scope("root:a"), widget("x", "prod"))
            .await
            .expect("seed");
        let store = builder(&client).build();

        let info = |_: &RequestContext, _: &DynamicObject| -> Result<Value> { Ok(json!([1, 2])) };
        let err = store
            .update(
                &ctx(),
                "x",
                &info,
                &validate_all_objects,
                &validate_all_object_updates,
                false,
                &UpdateOptions::default(),
            )
            .await
            .expect_err("type mismatch");
        assert!(matches!(err, RegistryError::TypeMismatch(_)));
    }

    #[fluvio_future::test]
    async fn test_update_aggregates_validation() {
        let client = MemoryClusterClient::new_shared();
        client
            .create(&backing_scope("root:a"), widget("x", "prod"))
            .await
            .expect("seed");
        let store = builder(&client).build();

        let err = store
            .update(
                &ctx(),
                "x",
                &set_size(-1),
                &validate_all_objects,
                &validate_all_object_updates,
                false,
                &UpdateOptions::default(),
            )
            .await
            .expect_err("invalid");
        assert!(err.is_invalid());
        assert!(err.to_string().starts_with(r#"Widget.example.io "x" is invalid"#));
    }

    #[fluvio_future::test]
    async fn test_update_runs_hooks_in_order() {
        let client = MemoryClusterClient::new_shared();
        let mut seeded = widget("x", "prod");
        seeded.insert("status", json!({ "ready": true }));
        client
            .create(&backing_scope("root:a"), seeded)
            .await
            .expect("seed");
        let store = builder(&client).build();

        let transform = |_: &RequestContext, old: &DynamicObject| -> Result<Value> {
            let mut next = old.clone();
            next.insert("status", json!({ "ready": false }));
            next.insert("spec", json!({ "size": 2 }));
            Ok(next.into_value())
        };
        let check = |_: &RequestContext, new: &DynamicObject, _: &DynamicObject| -> Result<()> {
            assert_eq!(new.get("status"), Some(&json!({ "ready": true })));
            Ok(())
        };

        let (updated, created) = store
            .update(
                &ctx(),
                "x",
                &transform,
                &validate_all_objects,
                &check,
                true,
                &UpdateOptions::default(),
            )
            .await
            .expect("update");
        assert!(!created);
        assert_eq!(updated.get("spec"), Some(&json!({ "size": 2 })));
        assert_eq!(updated.get("status"), Some(&json!({ "ready": true })));
    }

    #[fluvio_future::test]
    async fn test_update_validation_error_propagates() {
        let client = MemoryClusterClient::new_shared();
        client
            .create(&backing_scope("root:a"), widget("x", "prod"))
            .await
            .expect("seed");
        let store = builder(&client).build();

        let reject = |_: &RequestContext, new: &DynamicObject, _: &DynamicObject| -> Result<()> {
            Err(StatusError::bad_request(format!("{} is frozen", new.name())).into())
        };
        let err = store
            .update(
                &ctx(),
                "x",
                &set_size(1),
                &validate_all_objects,
                &reject,
                false,
                &UpdateOptions::default(),
            )
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "x is frozen");
    }

    #[fluvio_future::test]
    async fn test_wildcard_update_is_configuration_error() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client).build();
        let ctx = RequestContext::background().with_wildcard_cluster();

        let err = store
            .update(
                &ctx,
                "x",
                &set_size(1),
                &validate_all_objects,
                &validate_all_object_updates,
                false,
                &UpdateOptions::default(),
            )
            .await
            .expect_err("wildcard");
        assert!(matches!(err, RegistryError::WildcardCluster("update")));
    }

    #[fluvio_future::test]
    async fn test_convert_to_table_delegates() {
        let client = MemoryClusterClient::new_shared();
        let mut convertor = MockTableConvertor::new();
        convertor
            .expect_convert_to_table()
            .withf(|_, object, options| {
                matches!(object, RuntimeObject::Object(o) if o.name() == "x")
                    && options.include_object == IncludeObjectPolicy::Object
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(Table {
                    resource_version: "42".to_owned(),
                    ..Default::default()
                })
            });
        let store = builder(&client)
            .table_convertor(Arc::new(convertor))
            .build();

        let table = store
            .convert_to_table(
                &ctx(),
                &widget("x", "prod").into(),
                &TableOptions {
                    include_object: IncludeObjectPolicy::Object,
                },
            )
            .await
            .expect("table");
        assert_eq!(table.resource_version, "42");
    }

    #[test]
    #[should_panic(expected = "create is not served")]
    fn test_create_is_fatal() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client).build();
        run_block_on(async {
            let _ = store
                .create(&ctx(), widget("x", "prod"), &validate_all_objects)
                .await;
        });
    }

    #[test]
    #[should_panic(expected = "delete is not served")]
    fn test_delete_is_fatal() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client).build();
        run_block_on(async {
            let _ = store.delete(&ctx(), "x", &validate_all_objects).await;
        });
    }

    #[test]
    #[should_panic(expected = "delete collection is not served")]
    fn test_delete_collection_is_fatal() {
        let client = MemoryClusterClient::new_shared();
        let store = builder(&client).build();
        run_block_on(async {
            let _ = store
                .delete_collection(&ctx(), &validate_all_objects, &ListOptions::default())
                .await;
        });
    }
}
