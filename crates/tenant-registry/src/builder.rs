use std::sync::Arc;

use tenant_client::{DynamicClusterClient, SharedClient};
use tenant_model::{DynamicList, DynamicObject, GroupResource, ResourceCoordinate, StopSignal};

use crate::backoff::BackoffPolicy;
use crate::config::RegistryConfig;
use crate::labels::LabelScope;
use crate::store::{NewListFn, NewObjectFn, Store};
use crate::strategy::{
    CreateStrategy, DefaultTableConvertor, DeleteStrategy, ResetFieldsStrategy, TableConvertor,
    UpdateStrategy,
};
use crate::watch::WatchLifecycle;

/// Assembles a [`Store`] for one resource coordinate.
///
/// The factories default to empty objects of `kind` and `{kind}List` under
/// the coordinate's api version.
pub struct StoreBuilder<C> {
    coordinate: ResourceCoordinate,
    kind: String,
    client: SharedClient<C>,
    create_strategy: Arc<dyn CreateStrategy>,
    update_strategy: Arc<dyn UpdateStrategy>,
    delete_strategy: Arc<dyn DeleteStrategy>,
    table_convertor: Option<Arc<dyn TableConvertor>>,
    reset_fields_strategy: Option<Arc<dyn ResetFieldsStrategy>>,
    qualified_resource: Option<GroupResource>,
    new_fn: Option<NewObjectFn>,
    new_list_fn: Option<NewListFn>,
    label_scope: LabelScope,
    backoff: BackoffPolicy,
    stop: Option<Arc<StopSignal>>,
}

impl<C> StoreBuilder<C>
where
    C: DynamicClusterClient + 'static,
{
    pub fn new<S>(
        coordinate: impl Into<ResourceCoordinate>,
        kind: impl Into<String>,
        client: SharedClient<C>,
        strategy: Arc<S>,
    ) -> Self
    where
        S: CreateStrategy + UpdateStrategy + DeleteStrategy + 'static,
    {
        Self {
            coordinate: coordinate.into(),
            kind: kind.into(),
            client,
            create_strategy: strategy.clone(),
            update_strategy: strategy.clone(),
            delete_strategy: strategy,
            table_convertor: None,
            reset_fields_strategy: None,
            qualified_resource: None,
            new_fn: None,
            new_list_fn: None,
            label_scope: LabelScope::default(),
            backoff: BackoffPolicy::default(),
            stop: None,
        }
    }

    /// label scope and patch backoff
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.label_scope = LabelScope::new(config.label_scope);
        self.backoff = config.patch_conflict_backoff;
        self
    }

    pub fn label_scope(mut self, label_scope: LabelScope) -> Self {
        self.label_scope = label_scope;
        self
    }

    pub fn patch_conflict_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// shared with every other store that should stop together
    pub fn stop_signal(mut self, stop: Arc<StopSignal>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn create_strategy(mut self, strategy: Arc<dyn CreateStrategy>) -> Self {
        self.create_strategy = strategy;
        self
    }

    pub fn update_strategy(mut self, strategy: Arc<dyn UpdateStrategy>) -> Self {
        self.update_strategy = strategy;
        self
    }

    pub fn delete_strategy(mut self, strategy: Arc<dyn DeleteStrategy>) -> Self {
        self.delete_strategy = strategy;
        self
    }

    pub fn table_convertor(mut self, convertor: Arc<dyn TableConvertor>) -> Self {
        self.table_convertor = Some(convertor);
        self
    }

    pub fn reset_fields_strategy(mut self, strategy: Arc<dyn ResetFieldsStrategy>) -> Self {
        self.reset_fields_strategy = Some(strategy);
        self
    }

    pub fn qualified_resource(mut self, resource: GroupResource) -> Self {
        self.qualified_resource = Some(resource);
        self
    }

    pub fn new_fn(mut self, new_fn: NewObjectFn) -> Self {
        self.new_fn = Some(new_fn);
        self
    }

    pub fn new_list_fn(mut self, new_list_fn: NewListFn) -> Self {
        self.new_list_fn = Some(new_list_fn);
        self
    }

    pub fn build(self) -> Store<C> {
        let api_version = self.coordinate.resource().api_version();

        let new_fn = self.new_fn.unwrap_or_else(|| {
            let (api_version, kind) = (api_version.clone(), self.kind.clone());
            Arc::new(move || DynamicObject::new(api_version.clone(), kind.clone()))
        });
        let new_list_fn = self.new_list_fn.unwrap_or_else(|| {
            let list_kind = format!("{}List", self.kind);
            Arc::new(move || DynamicList::new(api_version.clone(), list_kind.clone()))
        });
        let default_qualified_resource = self
            .qualified_resource
            .unwrap_or_else(|| self.coordinate.resource().group_resource());
        let stop = self.stop.unwrap_or_else(StopSignal::new_shared);

        Store {
            new_fn,
            new_list_fn,
            default_qualified_resource,
            create_strategy: self.create_strategy,
            update_strategy: self.update_strategy,
            delete_strategy: self.delete_strategy,
            table_convertor: self
                .table_convertor
                .unwrap_or_else(|| Arc::new(DefaultTableConvertor)),
            reset_fields_strategy: self.reset_fields_strategy,
            coordinate: self.coordinate,
            client: self.client,
            patch_conflict_backoff: self.backoff,
            label_scope: self.label_scope,
            watches: WatchLifecycle::new(stop),
        }
    }
}

#[cfg(test)]
mod tests {
    use tenant_client::MemoryClusterClient;
    use tenant_model::{FieldErrorList, GroupVersionResource, RequestContext};

    use crate::rest::StandardStorage;

    use super::*;

    struct Plain;

    impl CreateStrategy for Plain {
        fn namespace_scoped(&self) -> bool {
            true
        }
    }

    impl UpdateStrategy for Plain {
        fn prepare_for_update(&self, _: &RequestContext, _: &mut DynamicObject, _: &DynamicObject) {}

        fn validate_update(
            &self,
            _: &RequestContext,
            _: &DynamicObject,
            _: &DynamicObject,
        ) -> FieldErrorList {
            vec![]
        }
    }

    impl DeleteStrategy for Plain {}

    #[test]
    fn test_defaults_follow_coordinate() {
        let coordinate = ResourceCoordinate::new(GroupVersionResource::new("", "v1", "configmaps"))
            .with_sub_resources(["status"]);
        let store = StoreBuilder::new(
            coordinate,
            "ConfigMap",
            MemoryClusterClient::new_shared(),
            Arc::new(Plain),
        )
        .build();

        assert_eq!(store.new_object().api_version(), "v1");
        assert_eq!(store.new_list().kind, "ConfigMapList");
        assert_eq!(store.default_qualified_resource.to_string(), "configmaps");
        assert_eq!(store.coordinate().sub_resources(), ["status".to_owned()]);
        assert!(store.label_scope().is_empty());
        assert_eq!(store.patch_conflict_backoff, BackoffPolicy::default());
        assert!(!store.stop_signal().is_closed());
    }

    #[test]
    fn test_shared_stop_and_config() {
        let stop = StopSignal::new_shared();
        let store = StoreBuilder::new(
            GroupVersionResource::new("example.io", "v1", "widgets"),
            "Widget",
            MemoryClusterClient::new_shared(),
            Arc::new(Plain),
        )
        .config(RegistryConfig::default().with_label("env", "prod"))
        .stop_signal(stop.clone())
        .build();

        assert_eq!(store.label_scope().to_string(), "env=prod");
        stop.close();
        assert!(store.stop_signal().is_closed());
    }
}
