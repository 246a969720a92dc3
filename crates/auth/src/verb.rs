use serde::{Deserialize, Serialize};

/// The action a request performs on a business element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Read, Verb::Create, Verb::Update, Verb::Delete];

    /// Map an HTTP method name onto a verb.
    ///
    /// GET → Read, POST → Create, PUT/PATCH → Update, DELETE → Delete.
    /// Anything else (HEAD, OPTIONS, lowercase spellings, ...) has no verb.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(Verb::Read),
            "POST" => Some(Verb::Create),
            "PUT" | "PATCH" => Some(Verb::Update),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Read => "read",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
