//! Module full names (`registry/owner/name`)

use crate::error::{CacheError, CacheResult};
use std::fmt;
use std::str::FromStr;

/// Fully qualified module name, e.g. `buf.build/acme/weather`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleFullName {
    registry: String,
    owner: String,
    name: String,
}

impl ModuleFullName {
    /// Create a full name from its components
    pub fn new(
        registry: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> CacheResult<Self> {
        let full_name = Self {
            registry: registry.into(),
            owner: owner.into(),
            name: name.into(),
        };
        for component in [&full_name.registry, &full_name.owner, &full_name.name] {
            validate_component(&full_name.to_string(), component)?;
        }
        Ok(full_name)
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_component(full_name: &str, component: &str) -> CacheResult<()> {
    let invalid = |reason: &str| CacheError::InvalidModuleFullName {
        name: full_name.to_string(),
        reason: reason.to_string(),
    };

    if component.is_empty() {
        return Err(invalid("components must not be empty"));
    }
    if component == "." || component == ".." {
        return Err(invalid("components must not be . or .."));
    }
    if component
        .chars()
        .any(|c| c == '/' || c == '\\' || c == ':' || c.is_whitespace() || c.is_control())
    {
        return Err(invalid("components must not contain separators or whitespace"));
    }
    Ok(())
}

impl FromStr for ModuleFullName {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [registry, owner, name] => Self::new(*registry, *owner, *name),
            _ => Err(CacheError::InvalidModuleFullName {
                name: s.to_string(),
                reason: "expected registry/owner/name".to_string(),
            }),
        }
    }
}

impl fmt::Display for ModuleFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.registry, self.owner, self.name)
    }
}
