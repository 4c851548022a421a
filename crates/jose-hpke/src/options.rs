//! Caller-facing encryption options.

use serde::{Deserialize, Serialize};

/// Output form of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Serialization {
    /// Five dot-separated base64url segments. Single recipient only.
    #[serde(alias = "compact")]
    Compact,
    #[serde(alias = "generalJson", alias = "GeneralJSON")]
    GeneralJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptOptions {
    pub serialization: Serialization,
}

impl EncryptOptions {
    pub fn compact() -> Self {
        Self {
            serialization: Serialization::Compact,
        }
    }

    pub fn general_json() -> Self {
        Self {
            serialization: Serialization::GeneralJson,
        }
    }
}

/// Default for key encryption. Integrated encryption falls back to
/// [`EncryptOptions::compact`] when no options are given.
impl Default for EncryptOptions {
    fn default() -> Self {
        Self::general_json()
    }
}
