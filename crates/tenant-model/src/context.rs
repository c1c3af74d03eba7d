//! Ambient request state carried explicitly alongside every call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, pending, select_all};
use serde::{Deserialize, Serialize};

use crate::event::StopSignal;

/// name of a logical cluster (tenant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterName(String);

impl ClusterName {
    /// reserved name addressing every tenant at once
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn wildcard() -> Self {
        Self(Self::WILDCARD.to_owned())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClusterName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// tenant identity attached to a request by the frontend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cluster {
    Named(ClusterName),
    /// merged view over every tenant
    Wildcard,
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Wildcard => f.write_str(ClusterName::WILDCARD),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Update,
    Patch,
    Delete,
    DeleteCollection,
    Other,
}

impl FromStr for Verb {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "get" => Self::Get,
            "list" => Self::List,
            "watch" => Self::Watch,
            "create" => Self::Create,
            "update" => Self::Update,
            "patch" => Self::Patch,
            "delete" => Self::Delete,
            "deletecollection" => Self::DeleteCollection,
            _ => Self::Other,
        })
    }
}

/// routing metadata the frontend derived from the request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub verb: Verb,
    pub resource: String,
    pub subresource: String,
    pub name: String,
}

impl RequestInfo {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            resource: String::new(),
            subresource: String::new(),
            name: String::new(),
        }
    }
}

/// Per-request scope: tenant, namespace, request info and cancellation.
///
/// Cloning is cheap; clones share the same cancellation chain.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cluster: Option<Cluster>,
    namespace: Option<String>,
    request_info: Option<RequestInfo>,
    cancellation: Vec<Arc<StopSignal>>,
}

impl RequestContext {
    /// context that is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, name: impl Into<ClusterName>) -> Self {
        let name = name.into();
        self.cluster = Some(if name.is_wildcard() {
            Cluster::Wildcard
        } else {
            Cluster::Named(name)
        });
        self
    }

    pub fn with_wildcard_cluster(mut self) -> Self {
        self.cluster = Some(Cluster::Wildcard);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_request_info(mut self, info: RequestInfo) -> Self {
        self.request_info = Some(info);
        self
    }

    pub fn with_verb(self, verb: Verb) -> Self {
        self.with_request_info(RequestInfo::new(verb))
    }

    pub fn cluster(&self) -> Option<&Cluster> {
        self.cluster.as_ref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn request_info(&self) -> Option<&RequestInfo> {
        self.request_info.as_ref()
    }

    /// derive a child that is done when either `cancel` fires or this context is done
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let signal = StopSignal::new_shared();
        let mut child = self.clone();
        child.cancellation.push(signal.clone());
        (child, CancelHandle(signal))
    }

    pub fn is_done(&self) -> bool {
        self.cancellation.iter().any(|signal| signal.is_closed())
    }

    /// resolves once the context is cancelled; never resolves for background contexts
    pub async fn done(&self) {
        wait_any(&self.cancellation).await
    }

    /// owned variant of [`RequestContext::done`] for spawned tasks and stream adapters
    pub fn done_owned(&self) -> BoxFuture<'static, ()> {
        let signals = self.cancellation.clone();
        async move { wait_any(&signals).await }.boxed()
    }
}

async fn wait_any(signals: &[Arc<StopSignal>]) {
    if signals.is_empty() {
        return pending::<()>().await;
    }
    select_all(signals.iter().map(|signal| signal.closed_pinned())).await;
}

/// cancels the context it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<StopSignal>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_closed()
    }

    /// resolves once this handle (not an ancestor) has been cancelled
    pub async fn cancelled(&self) {
        self.0.closed().await
    }
}
