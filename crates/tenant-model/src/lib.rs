//! Object model shared by the tenant-aware storage crates.
//!
//! Objects are schema-less attribute bags; only the envelope fields
//! (name, namespace, labels, resource version) have typed accessors.

pub mod coordinate;
pub mod context;
pub mod event;
pub mod field;
pub mod object;
pub mod options;
pub mod selector;
pub mod status;
pub mod table;

pub use coordinate::{GroupKind, GroupResource, GroupVersionResource, ResourceCoordinate};
pub use context::{CancelHandle, Cluster, ClusterName, RequestContext, RequestInfo, Verb};
pub use event::StopSignal;
pub use field::{FieldError, FieldErrorList, FieldErrorType};
pub use object::{
    CLUSTER_ANNOTATION, DynamicList, DynamicObject, ListMeta, ObjectShapeError, RuntimeObject,
    WatchEvent,
};
pub use options::{GetOptions, ListOptions, UpdateOptions};
pub use selector::{LabelSelector, SelectorParseError};
pub use status::{StatusDetails, StatusError, StatusReason};
pub use table::{
    IncludeObjectPolicy, ResetFields, Table, TableColumnDefinition, TableOptions, TableRow,
};
