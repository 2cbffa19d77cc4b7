use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Identifier of a node within one flow graph.
    NodeId
}

string_id! {
    /// Named output port on a node. Edges route by matching their
    /// `source_handle` against one of the handles the node declares.
    HandleId
}

string_id! {
    /// Identifier of one resumable conversation session. For WhatsApp
    /// sessions the conventional shape is `<instance>:<recipient>`, which
    /// the outbound dispatcher uses as a recipient fallback.
    SessionId
}

impl HandleId {
    /// The fallthrough handle shared by all linear node variants.
    pub fn default_handle() -> Self {
        Self::new("default")
    }

    pub fn truthy() -> Self {
        Self::new("true")
    }

    pub fn falsy() -> Self {
        Self::new("false")
    }

    pub fn otherwise() -> Self {
        Self::new("otherwise")
    }
}

impl SessionId {
    /// Fresh random id, for channels without a natural composite shape
    /// (Chatwoot and Dialogy sessions address via conversation variables).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Recipient embedded in the conventional `<instance>:<recipient>`
    /// session id shape, if any.
    pub fn embedded_recipient(&self) -> Option<&str> {
        self.0.rsplit_once(':').map(|(_, recipient)| recipient)
    }
}
