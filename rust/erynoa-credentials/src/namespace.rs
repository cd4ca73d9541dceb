use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DidError;

/// The ten fixed namespaces of the `did:erynoa` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Natural persons. Rendered as `self`.
    #[default]
    #[serde(rename = "self")]
    Personal,
    /// Organisations, companies, DAOs.
    Guild,
    /// AI agents and autonomous systems.
    Spirit,
    /// IoT devices and physical assets.
    Thing,
    /// Containers and means of transport.
    Vessel,
    /// Data sources and APIs.
    Source,
    /// Services and trades.
    Craft,
    /// Storage and safes.
    Vault,
    /// Contracts and agreements.
    Pact,
    /// Groups and communities.
    Circle,
}

impl Namespace {
    /// Every namespace, in canonical order.
    pub const ALL: [Namespace; 10] = [
        Namespace::Personal,
        Namespace::Guild,
        Namespace::Spirit,
        Namespace::Thing,
        Namespace::Vessel,
        Namespace::Source,
        Namespace::Craft,
        Namespace::Vault,
        Namespace::Pact,
        Namespace::Circle,
    ];

    /// The tag used inside DID strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Namespace::Personal => "self",
            Namespace::Guild => "guild",
            Namespace::Spirit => "spirit",
            Namespace::Thing => "thing",
            Namespace::Vessel => "vessel",
            Namespace::Source => "source",
            Namespace::Craft => "craft",
            Namespace::Vault => "vault",
            Namespace::Pact => "pact",
            Namespace::Circle => "circle",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|namespace| namespace.as_str() == s)
            .ok_or_else(|| DidError::InvalidNamespace(s.to_string()))
    }
}
