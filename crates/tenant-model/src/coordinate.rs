use std::fmt;

use serde::{Deserialize, Serialize};

/// group, version and plural resource name of a served type
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    pub fn group_resource(&self) -> GroupResource {
        GroupResource {
            group: self.group.clone(),
            resource: self.resource.clone(),
        }
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}, Resource={}",
            self.group, self.version, self.resource
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// The type a storage instance serves, fixed at construction.
///
/// Sub-resource segments (for example `status`) are appended to every
/// single-object call made to the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCoordinate {
    resource: GroupVersionResource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_resources: Vec<String>,
}

impl ResourceCoordinate {
    pub fn new(resource: GroupVersionResource) -> Self {
        Self {
            resource,
            sub_resources: vec![],
        }
    }

    pub fn with_sub_resources<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_resources = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource(&self) -> &GroupVersionResource {
        &self.resource
    }

    pub fn sub_resources(&self) -> &[String] {
        &self.sub_resources
    }
}

impl From<GroupVersionResource> for ResourceCoordinate {
    fn from(resource: GroupVersionResource) -> Self {
        Self::new(resource)
    }
}

impl fmt::Display for ResourceCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_resources.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}/{}", self.resource, self.sub_resources.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_resource_display() {
        assert_eq!(
            GroupResource::new("example.io", "widgets").to_string(),
            "widgets.example.io"
        );
        assert_eq!(GroupResource::new("", "configmaps").to_string(), "configmaps");
        assert_eq!(GroupKind::new("example.io", "Widget").to_string(), "Widget.example.io");
    }

    #[test]
    fn test_api_version() {
        let gvr = GroupVersionResource::new("example.io", "v1", "widgets");
        assert_eq!(gvr.api_version(), "example.io/v1");
        let core = GroupVersionResource::new("", "v1", "configmaps");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_coordinate_sub_resources() {
        let coordinate = ResourceCoordinate::new(GroupVersionResource::new(
            "example.io",
            "v1",
            "widgets",
        ))
        .with_sub_resources(["status"]);
        assert_eq!(coordinate.sub_resources(), &["status".to_string()]);
        assert_eq!(
            coordinate.to_string(),
            "example.io/v1, Resource=widgets/status"
        );
    }
}
