//! Declaration parsing and validation
//!
//! A declaration is a YAML document listing the resources that should exist:
//!
//! ```yaml
//! actions:
//!   - identifier: main-domain
//!     resource: DO_DOMAIN
//!     properties:
//!       name: example.com
//!   - identifier: www
//!     resource: DO_DNS_RECORD
//!     properties:
//!       domain: example.com
//!       type: A
//!       name: www
//!       data: 203.0.113.10
//! ```
//!
//! Validation happens once, here. A [`Declaration`] can only be obtained
//! through validation, so everything downstream works with typed,
//! complete actions. Any invalid action rejects the whole document.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::resource::{ResourceKind, ResourceProperties};

/// One declared unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredAction {
    /// Caller-supplied label, unique within the declaration
    pub identifier: String,
    /// Typed properties; the variant carries the resource kind
    pub properties: ResourceProperties,
}

impl DesiredAction {
    /// Create a new action
    pub fn new(identifier: impl Into<String>, properties: ResourceProperties) -> Self {
        Self {
            identifier: identifier.into(),
            properties,
        }
    }

    /// Kind of resource this action manages
    pub fn kind(&self) -> ResourceKind {
        self.properties.kind()
    }
}

/// A validated, ordered list of desired actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    actions: Vec<DesiredAction>,
}

/// Document shape before validation
#[derive(Debug, Deserialize)]
struct RawDeclaration {
    actions: Option<Vec<RawAction>>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    identifier: Option<String>,
    resource: Option<String>,
    properties: Option<serde_yaml::Value>,
}

impl Declaration {
    /// Build a declaration from already-typed actions
    ///
    /// The same checks as for parsed documents apply.
    pub fn new(actions: Vec<DesiredAction>) -> Result<Self> {
        let declaration = Self { actions };
        declaration.validate()?;
        Ok(declaration)
    }

    /// Parse and validate a YAML declaration
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawDeclaration = serde_yaml::from_str(content)
            .map_err(|e| Error::invalid_declaration(format!("not a valid document: {}", e)))?;

        let raw_actions = raw
            .actions
            .ok_or_else(|| Error::invalid_declaration("`actions` attribute is required"))?;

        let actions = raw_actions
            .into_iter()
            .enumerate()
            .map(|(index, raw)| parse_action(index, raw))
            .collect::<Result<Vec<_>>>()?;

        Self::new(actions)
    }

    /// Read, parse and validate a YAML declaration file
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::invalid_declaration(format!("cannot read {}: {}", path.display(), e))
        })?;

        tracing::debug!("Read declaration from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Check every action and identifier uniqueness
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, action) in self.actions.iter().enumerate() {
            if action.identifier.trim().is_empty() {
                return Err(Error::invalid_declaration(format!(
                    "action #{}: `identifier` attribute is required",
                    index + 1
                )));
            }

            action.properties.validate().map_err(|e| {
                Error::invalid_declaration(format!(
                    "action '{}': {}",
                    action.identifier,
                    strip_prefix(&e)
                ))
            })?;

            if !seen.insert(action.identifier.as_str()) {
                return Err(Error::invalid_declaration(format!(
                    "identifier '{}' is declared more than once",
                    action.identifier
                )));
            }
        }

        Ok(())
    }

    /// Actions in declaration order
    pub fn actions(&self) -> &[DesiredAction] {
        &self.actions
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the declaration has no actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Distinct resource kinds used by this declaration
    pub fn kinds(&self) -> HashSet<ResourceKind> {
        self.actions.iter().map(DesiredAction::kind).collect()
    }
}

fn parse_action(index: usize, raw: RawAction) -> Result<DesiredAction> {
    let position = index + 1;

    let identifier = raw
        .identifier
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            Error::invalid_declaration(format!(
                "action #{}: `identifier` attribute is required",
                position
            ))
        })?;

    let properties = match raw.properties {
        Some(serde_yaml::Value::Mapping(map)) if !map.is_empty() => serde_yaml::Value::Mapping(map),
        Some(serde_yaml::Value::Mapping(_)) | None | Some(serde_yaml::Value::Null) => {
            return Err(Error::invalid_declaration(format!(
                "action '{}': `properties` attribute is required",
                identifier
            )));
        }
        Some(_) => {
            return Err(Error::invalid_declaration(format!(
                "action '{}': `properties` must be a mapping",
                identifier
            )));
        }
    };

    let kind = raw
        .resource
        .ok_or_else(|| {
            Error::invalid_declaration(format!(
                "action '{}': `resource` attribute is required",
                identifier
            ))
        })?
        .parse::<ResourceKind>()
        .map_err(|e| Error::invalid_declaration(format!("action '{}': {}", identifier, strip_prefix(&e))))?;

    let properties = typed_properties(kind, properties)
        .map_err(|e| Error::invalid_declaration(format!("action '{}': {}", identifier, e)))?;

    Ok(DesiredAction {
        identifier,
        properties,
    })
}

fn typed_properties(
    kind: ResourceKind,
    value: serde_yaml::Value,
) -> std::result::Result<ResourceProperties, serde_yaml::Error> {
    Ok(match kind {
        ResourceKind::Domain => ResourceProperties::Domain(serde_yaml::from_value(value)?),
        ResourceKind::DnsRecord => ResourceProperties::DnsRecord(serde_yaml::from_value(value)?),
        ResourceKind::Droplet => ResourceProperties::Droplet(serde_yaml::from_value(value)?),
    })
}

/// Message of an `InvalidInput` error without its display prefix
fn strip_prefix(err: &Error) -> String {
    match err {
        Error::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    }
}
