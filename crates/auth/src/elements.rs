use serde::{Deserialize, Serialize};

use rolegate_core::{DomainResult, ElementId};

use crate::roles::normalize_name;

/// Longest business element name the store accepts.
pub const MAX_ELEMENT_NAME_LEN: usize = 100;

/// A named class of protected resources ("users", "products").
///
/// Endpoints declare the element they guard by name; the name is the resource
/// tag handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessElement {
    pub id: ElementId,
    pub name: String,
}

impl BusinessElement {
    pub fn new(name: &str) -> DomainResult<Self> {
        Ok(Self {
            id: ElementId::new(),
            name: normalize_name(name, MAX_ELEMENT_NAME_LEN, "business element")?,
        })
    }
}

impl core::fmt::Display for BusinessElement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}
