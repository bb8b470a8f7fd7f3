use serde::{Deserialize, Serialize};

/// Component identifier with component type information
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub(crate) name: String,
    pub(crate) component_type: String,
}

impl ComponentId {
    /// Create a new component ID
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
        }
    }

    /// Get the component name, unique within a workspace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the component type
    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    /// Create a handle for one of this component's attribute containers
    pub fn container(&self, key: &str) -> ContainerKey {
        ContainerKey {
            component: self.clone(),
            key: key.to_string(),
        }
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Owner-scoped key of an attribute container (a neuron, a table column, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerKey {
    pub(crate) component: ComponentId,
    pub(crate) key: String,
}

impl ContainerKey {
    pub fn new(component: ComponentId, key: impl Into<String>) -> Self {
        Self {
            component,
            key: key.into(),
        }
    }

    pub fn component(&self) -> &ComponentId {
        &self.component
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Create a handle for a member attribute of this container
    pub fn attribute(&self, member: &str) -> AttributeRef {
        AttributeRef {
            container: self.clone(),
            member: member.to_string(),
        }
    }
}

impl std::fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.component, self.key)
    }
}

/// Persistable reference to a producer or consumer: container key plus member name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeRef {
    pub(crate) container: ContainerKey,
    pub(crate) member: String,
}

impl AttributeRef {
    pub fn new(container: ContainerKey, member: impl Into<String>) -> Self {
        Self {
            container,
            member: member.into(),
        }
    }

    pub fn container(&self) -> &ContainerKey {
        &self.container
    }

    pub fn component(&self) -> &ComponentId {
        &self.container.component
    }

    pub fn member(&self) -> &str {
        &self.member
    }
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.container, self.member)
    }
}
