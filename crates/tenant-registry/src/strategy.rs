//! Hooks supplied by the surrounding server for each served type.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use tenant_model::{
    DynamicObject, FieldErrorList, IncludeObjectPolicy, RequestContext, ResetFields,
    RuntimeObject, Table, TableColumnDefinition, TableOptions, TableRow,
};

use crate::error::Result;

pub trait CreateStrategy: Send + Sync {
    fn namespace_scoped(&self) -> bool;
}

pub trait UpdateStrategy: Send + Sync {
    /// clear or default fields the caller may not set
    fn prepare_for_update(&self, ctx: &RequestContext, new: &mut DynamicObject, old: &DynamicObject);

    fn validate_update(
        &self,
        ctx: &RequestContext,
        new: &DynamicObject,
        old: &DynamicObject,
    ) -> FieldErrorList;
}

/// Carried for the delete path served elsewhere.
pub trait DeleteStrategy: Send + Sync {}

pub trait ResetFieldsStrategy: Send + Sync {
    fn reset_fields(&self) -> ResetFields;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableConvertor: Send + Sync {
    async fn convert_to_table(
        &self,
        ctx: &RequestContext,
        object: &RuntimeObject,
        options: &TableOptions,
    ) -> Result<Table>;
}

/// Produces the candidate object from the current one.
///
/// Called once per update attempt, always with the freshest read.
pub trait UpdatedObjectInfo: Send + Sync {
    fn updated_object(&self, ctx: &RequestContext, old: &DynamicObject) -> Result<Value>;
}

impl<F> UpdatedObjectInfo for F
where
    F: Fn(&RequestContext, &DynamicObject) -> Result<Value> + Send + Sync,
{
    fn updated_object(&self, ctx: &RequestContext, old: &DynamicObject) -> Result<Value> {
        self(ctx, old)
    }
}

pub type ValidateObjectFn = dyn Fn(&RequestContext, &DynamicObject) -> Result<()> + Send + Sync;

/// called with `(ctx, new, old)`
pub type ValidateObjectUpdateFn =
    dyn Fn(&RequestContext, &DynamicObject, &DynamicObject) -> Result<()> + Send + Sync;

pub fn validate_all_objects(_ctx: &RequestContext, _object: &DynamicObject) -> Result<()> {
    Ok(())
}

pub fn validate_all_object_updates(
    _ctx: &RequestContext,
    _new: &DynamicObject,
    _old: &DynamicObject,
) -> Result<()> {
    Ok(())
}

/// Name and creation time columns, used when no convertor is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTableConvertor;

impl DefaultTableConvertor {
    fn columns() -> Vec<TableColumnDefinition> {
        vec![
            TableColumnDefinition {
                name: "Name".to_owned(),
                type_: "string".to_owned(),
                format: "name".to_owned(),
                description: "name of the object".to_owned(),
                priority: 0,
            },
            TableColumnDefinition {
                name: "Created At".to_owned(),
                type_: "date".to_owned(),
                description: "creation timestamp of the object".to_owned(),
                ..Default::default()
            },
        ]
    }

    fn row(object: &DynamicObject, policy: IncludeObjectPolicy) -> TableRow {
        let created = object
            .metadata()
            .and_then(|meta| meta.get("creationTimestamp"))
            .cloned()
            .unwrap_or(Value::Null);

        let embedded = match policy {
            IncludeObjectPolicy::None => None,
            IncludeObjectPolicy::Metadata => {
                let mut partial = Map::new();
                partial.insert("apiVersion".to_owned(), json!(object.api_version()));
                partial.insert("kind".to_owned(), json!(object.kind()));
                if let Some(meta) = object.metadata() {
                    partial.insert("metadata".to_owned(), Value::Object(meta.clone()));
                }
                Some(Value::Object(partial))
            }
            IncludeObjectPolicy::Object => Some(object.clone().into_value()),
        };

        TableRow {
            cells: vec![json!(object.name()), created],
            object: embedded,
        }
    }
}

#[async_trait]
impl TableConvertor for DefaultTableConvertor {
    async fn convert_to_table(
        &self,
        _ctx: &RequestContext,
        object: &RuntimeObject,
        options: &TableOptions,
    ) -> Result<Table> {
        let (rows, resource_version) = match object {
            RuntimeObject::Object(object) => (
                vec![Self::row(object, options.include_object)],
                object.resource_version().to_owned(),
            ),
            RuntimeObject::List(list) => (
                list.items
                    .iter()
                    .map(|item| Self::row(item, options.include_object))
                    .collect(),
                list.metadata.resource_version.clone(),
            ),
        };

        Ok(Table {
            column_definitions: Self::columns(),
            rows,
            resource_version,
        })
    }
}
