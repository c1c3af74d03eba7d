use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coordinate::GroupKind;

const API_VERSION: &str = "apiVersion";
const KIND: &str = "kind";
const METADATA: &str = "metadata";
const NAME: &str = "name";
const NAMESPACE: &str = "namespace";
const LABELS: &str = "labels";
const ANNOTATIONS: &str = "annotations";
const RESOURCE_VERSION: &str = "resourceVersion";

/// annotation recording which logical cluster owns an object
pub const CLUSTER_ANNOTATION: &str = "kcp.io/cluster";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectShapeError {
    #[error("not an object: {0}")]
    NotAnObject(&'static str),
    #[error("object has no kind")]
    MissingKind,
    #[error("metadata is not an object")]
    MalformedMetadata,
}

/// Schema-less object; any resource kind fits.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicObject(Map<String, Value>);

impl DynamicObject {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(API_VERSION.to_owned(), Value::String(api_version.into()));
        fields.insert(KIND.to_owned(), Value::String(kind.into()));
        Self(fields)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.set_namespace(namespace);
        self
    }

    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.set_labels(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn api_version(&self) -> &str {
        self.str_field(API_VERSION)
    }

    pub fn kind(&self) -> &str {
        self.str_field(KIND)
    }

    pub fn group_kind(&self) -> GroupKind {
        let group = match self.api_version().split_once('/') {
            Some((group, _version)) => group,
            None => "",
        };
        GroupKind::new(group, self.kind())
    }

    pub fn name(&self) -> &str {
        self.meta_str(NAME)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata_mut()
            .insert(NAME.to_owned(), Value::String(name.into()));
    }

    pub fn namespace(&self) -> Option<&str> {
        match self.meta_str(NAMESPACE) {
            "" => None,
            namespace => Some(namespace),
        }
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.metadata_mut()
            .insert(NAMESPACE.to_owned(), Value::String(namespace.into()));
    }

    pub fn resource_version(&self) -> &str {
        self.meta_str(RESOURCE_VERSION)
    }

    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        self.metadata_mut()
            .insert(RESOURCE_VERSION.to_owned(), Value::String(version.into()));
    }

    /// labels as a sorted map; non-string values are ignored
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map(LABELS)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .and_then(|meta| meta.get(LABELS))
            .and_then(|labels| labels.get(key))
            .and_then(Value::as_str)
    }

    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        self.set_string_map(LABELS, labels);
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map(ANNOTATIONS)
    }

    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.set_string_map(ANNOTATIONS, annotations);
    }

    /// owning logical cluster, if recorded
    pub fn cluster(&self) -> Option<String> {
        self.annotations().remove(CLUSTER_ANNOTATION)
    }

    pub fn set_cluster(&mut self, cluster: impl Into<String>) {
        let mut annotations = self.annotations();
        annotations.insert(CLUSTER_ANNOTATION.to_owned(), cluster.into());
        self.set_annotations(annotations);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get(METADATA).and_then(Value::as_object)
    }

    fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .0
            .entry(METADATA)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(meta) => meta,
            _ => unreachable!("metadata normalized to an object"),
        }
    }

    fn str_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    fn meta_str(&self, key: &str) -> &str {
        self.metadata()
            .and_then(|meta| meta.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.metadata()
            .and_then(|meta| meta.get(key))
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_string_map(&mut self, key: &str, values: BTreeMap<String, String>) {
        let values: Map<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        self.metadata_mut()
            .insert(key.to_owned(), Value::Object(values));
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for DynamicObject {
    type Error = ObjectShapeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Array(_) => return Err(ObjectShapeError::NotAnObject("array")),
            Value::String(_) => return Err(ObjectShapeError::NotAnObject("string")),
            Value::Number(_) => return Err(ObjectShapeError::NotAnObject("number")),
            Value::Bool(_) => return Err(ObjectShapeError::NotAnObject("bool")),
            Value::Null => return Err(ObjectShapeError::NotAnObject("null")),
        };
        match fields.get(KIND).and_then(Value::as_str) {
            Some(kind) if !kind.is_empty() => {}
            _ => return Err(ObjectShapeError::MissingKind),
        }
        match fields.get(METADATA) {
            None | Some(Value::Object(_)) => {}
            Some(_) => return Err(ObjectShapeError::MalformedMetadata),
        }
        Ok(Self(fields))
    }
}

impl From<DynamicObject> for Value {
    fn from(object: DynamicObject) -> Self {
        object.into_value()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, rename = "continue", skip_serializing_if = "String::is_empty")]
    pub continue_token: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicList {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<DynamicObject>,
}

impl DynamicList {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(DynamicObject::name).collect()
    }
}

/// what storage hands out: a single object or a list of them
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeObject {
    Object(DynamicObject),
    List(DynamicList),
}

impl From<DynamicObject> for RuntimeObject {
    fn from(object: DynamicObject) -> Self {
        Self::Object(object)
    }
}

impl From<DynamicList> for RuntimeObject {
    fn from(list: DynamicList) -> Self {
        Self::List(list)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object")]
pub enum WatchEvent {
    #[serde(rename = "ADDED")]
    Added(DynamicObject),
    #[serde(rename = "MODIFIED")]
    Modified(DynamicObject),
    #[serde(rename = "DELETED")]
    Deleted(DynamicObject),
    #[serde(rename = "BOOKMARK")]
    Bookmark(DynamicObject),
}

impl WatchEvent {
    pub fn object(&self) -> &DynamicObject {
        match self {
            Self::Added(object)
            | Self::Modified(object)
            | Self::Deleted(object)
            | Self::Bookmark(object) => object,
        }
    }
}
