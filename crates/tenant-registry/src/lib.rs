//! Tenant-scoped forwarding storage.
//!
//! A [`Store`] serves one resource type for every logical cluster sharing a
//! process. Each call is routed to the caller's tenant on the shared backing
//! client, constrained by the store's label scope, and watches are torn
//! down when the caller goes away or the shared stop signal closes.

mod backoff;
mod builder;
mod config;
mod error;
mod labels;
mod locator;
mod rest;
mod retry;
mod scope;
mod store;
mod strategy;
mod watch;

pub use backoff::{BackoffError, BackoffPolicy, Delays};
pub use builder::StoreBuilder;
pub use config::{LoadConfigError, RegistryConfig};
pub use error::{RegistryError, Result};
pub use labels::LabelScope;
pub use locator::{locate, locate_concrete};
pub use rest::StandardStorage;
pub use retry::retry_on_conflict;
pub use scope::{RequestScope, resolve_scope};
pub use store::{NewListFn, NewObjectFn, Store};
pub use strategy::{
    CreateStrategy, DefaultTableConvertor, DeleteStrategy, ResetFieldsStrategy, TableConvertor,
    UpdateStrategy, UpdatedObjectInfo, ValidateObjectFn, ValidateObjectUpdateFn,
    validate_all_object_updates, validate_all_objects,
};
pub use watch::{ForwardedWatch, WatchGuard, WatchLifecycle};

pub use tenant_client as client;
pub use tenant_model as model;
