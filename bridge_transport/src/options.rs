//! Initiation options, roles and per-post options

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target origin used when a restricted configuration does not name one
pub const DEFAULT_TARGET_ORIGIN: &str = "https://www.figma.com";

/// Target origin that accepts any receiver
pub const WILDCARD_ORIGIN: &str = "*";

/// Which side of the channel an engine plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Embedding side: posts immediately and opens the handshake
    Initiator,
    /// Sandboxed side: holds outbound traffic until the handshake arrives
    Responder,
}

impl Role {
    /// Checks if outbound messages must wait for the handshake
    pub fn buffers_until_connected(&self) -> bool {
        matches!(self, Role::Responder)
    }

    /// Checks if this role opens the handshake once its listener is installed
    pub fn sends_connect(&self) -> bool {
        matches!(self, Role::Initiator)
    }

    /// Returns human-readable role name
    pub fn name(&self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

/// Origin restriction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginType {
    Restricted,
    Unrestricted,
}

/// One-time configuration consumed when the transport is installed
///
/// Deserializes from the JSON shape the embedding page uses, e.g.
/// `{"originType": "restricted", "pluginId": "42", "mainHost": "https://host"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "originType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InitiationOptions {
    /// Traffic is pinned to one plugin and one host
    #[serde(alias = "non_null")]
    Restricted {
        plugin_id: String,
        main_host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_origin: Option<String>,
    },
    /// No origin restriction
    #[serde(alias = "null")]
    Unrestricted,
}

impl InitiationOptions {
    /// Creates restricted options with the default target origin
    pub fn restricted(plugin_id: impl Into<String>, main_host: impl Into<String>) -> Self {
        InitiationOptions::Restricted {
            plugin_id: plugin_id.into(),
            main_host: main_host.into(),
            target_origin: None,
        }
    }

    /// Creates unrestricted options
    pub fn unrestricted() -> Self {
        InitiationOptions::Unrestricted
    }

    /// Overrides the target origin (restricted options only)
    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        if let InitiationOptions::Restricted { target_origin, .. } = &mut self {
            *target_origin = Some(origin.into());
        }
        self
    }

    /// Returns the origin restriction mode
    pub fn origin_type(&self) -> OriginType {
        match self {
            InitiationOptions::Restricted { .. } => OriginType::Restricted,
            InitiationOptions::Unrestricted => OriginType::Unrestricted,
        }
    }

    /// Returns the plugin id, if restricted
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            InitiationOptions::Restricted { plugin_id, .. } => Some(plugin_id),
            InitiationOptions::Unrestricted => None,
        }
    }

    /// Returns the origin the initiator posts to
    pub fn target_origin(&self) -> &str {
        match self {
            InitiationOptions::Restricted { target_origin, .. } => target_origin
                .as_deref()
                .unwrap_or(DEFAULT_TARGET_ORIGIN),
            InitiationOptions::Unrestricted => WILDCARD_ORIGIN,
        }
    }

    /// Derives what every physical post of `role` is parameterized with
    pub fn post_options(&self, role: Role) -> PostOptions {
        match (self, role) {
            (InitiationOptions::Restricted { main_host, .. }, Role::Responder) => PostOptions {
                target_origin: WILDCARD_ORIGIN.to_string(),
                origin: Some(main_host.clone()),
                plugin_id: None,
            },
            (InitiationOptions::Restricted { plugin_id, .. }, Role::Initiator) => PostOptions {
                target_origin: self.target_origin().to_string(),
                origin: None,
                plugin_id: Some(plugin_id.clone()),
            },
            (InitiationOptions::Unrestricted, _) => PostOptions::default(),
        }
    }
}

/// Parameters handed to the physical post primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOptions {
    /// Origin the receiving window must have
    pub target_origin: String,
    /// Origin the host restricts responder traffic to
    pub origin: Option<String>,
    /// Plugin the initiator addresses
    pub plugin_id: Option<String>,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            target_origin: WILDCARD_ORIGIN.to_string(),
            origin: None,
            plugin_id: None,
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bridge configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Role plus initiation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Side of the channel this engine plays
    pub role: Role,
    /// Origin configuration
    #[serde(flatten)]
    pub options: InitiationOptions,
}

impl BridgeConfig {
    /// Creates a config with given role and options
    pub fn new(role: Role, options: InitiationOptions) -> Self {
        Self { role, options }
    }

    /// Creates initiator config
    pub fn initiator(options: InitiationOptions) -> Self {
        Self::new(Role::Initiator, options)
    }

    /// Creates responder config
    pub fn responder(options: InitiationOptions) -> Self {
        Self::new(Role::Responder, options)
    }

    /// Parses config from JSON
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the post options for this config
    pub fn post_options(&self) -> PostOptions {
        self.options.post_options(self.role)
    }
}
