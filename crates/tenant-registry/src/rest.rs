use async_trait::async_trait;

use tenant_model::{
    DynamicList, DynamicObject, GetOptions, ListOptions, RequestContext, ResetFields,
    RuntimeObject, Table, TableOptions, UpdateOptions,
};

use crate::error::Result;
use crate::strategy::{UpdatedObjectInfo, ValidateObjectFn, ValidateObjectUpdateFn};
use crate::watch::ForwardedWatch;

/// Storage contract the API frontend dispatches against for one resource.
#[async_trait]
pub trait StandardStorage: Send + Sync {
    /// empty instance of the served kind
    fn new_object(&self) -> DynamicObject;

    fn new_list(&self) -> DynamicList;

    async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &GetOptions,
    ) -> Result<DynamicObject>;

    async fn list(&self, ctx: &RequestContext, options: &ListOptions) -> Result<DynamicList>;

    async fn watch(&self, ctx: &RequestContext, options: &ListOptions) -> Result<ForwardedWatch>;

    /// Returns the stored object and whether it was created.
    #[allow(clippy::too_many_arguments)]
    async fn update(
        &self,
        ctx: &RequestContext,
        name: &str,
        object_info: &dyn UpdatedObjectInfo,
        create_validation: &ValidateObjectFn,
        update_validation: &ValidateObjectUpdateFn,
        force_allow_create: bool,
        options: &UpdateOptions,
    ) -> Result<(DynamicObject, bool)>;

    async fn create(
        &self,
        ctx: &RequestContext,
        object: DynamicObject,
        create_validation: &ValidateObjectFn,
    ) -> Result<DynamicObject>;

    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        delete_validation: &ValidateObjectFn,
    ) -> Result<(DynamicObject, bool)>;

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        delete_validation: &ValidateObjectFn,
        options: &ListOptions,
    ) -> Result<DynamicList>;

    async fn convert_to_table(
        &self,
        ctx: &RequestContext,
        object: &RuntimeObject,
        options: &TableOptions,
    ) -> Result<Table>;

    fn get_reset_fields(&self) -> Option<ResetFields>;
}
