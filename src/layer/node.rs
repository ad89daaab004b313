//! Layer node descriptor.

use super::types::{LayerType, ParamValue};
use crate::error::{ArchError, ArchResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Configuration of a layer: parameter name to value, in name order.
pub type LayerConfig = BTreeMap<String, ParamValue>;

/// Stable identifier of a node within one graph.
///
/// Ids are issued in creation order and never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One layer occurrence in an architecture.
///
/// A node is immutable once created; operators that change a layer build a
/// new node and swap it in under the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    layer_type: LayerType,
    config: LayerConfig,
    rank: Option<u8>,
}

impl LayerNode {
    /// Creates a node after checking `config` against the type's schema.
    ///
    /// # Errors
    /// [`ArchError::InvalidConfig`] for an unknown parameter name or a value
    /// of the wrong kind.
    pub fn new(layer_type: LayerType, config: LayerConfig) -> ArchResult<Self> {
        check_config(layer_type, &config)?;
        let rank = Some(nominal_rank(layer_type, &config));
        Ok(Self {
            layer_type,
            config,
            rank,
        })
    }

    /// Creates a node with an empty configuration.
    pub fn bare(layer_type: LayerType) -> Self {
        let config = LayerConfig::new();
        let rank = Some(nominal_rank(layer_type, &config));
        Self {
            layer_type,
            config,
            rank,
        }
    }

    /// Creates a structural placeholder: a node without a real output.
    ///
    /// The scheduler never waits on placeholders and never binds them as
    /// inputs.
    pub fn placeholder(layer_type: LayerType) -> Self {
        Self {
            layer_type,
            config: LayerConfig::new(),
            rank: None,
        }
    }

    /// Rebuilds a node from persisted parts, re-checking the config.
    pub(crate) fn from_parts(
        layer_type: LayerType,
        config: LayerConfig,
        rank: Option<u8>,
    ) -> ArchResult<Self> {
        check_config(layer_type, &config)?;
        Ok(Self {
            layer_type,
            config,
            rank,
        })
    }

    pub fn layer_type(&self) -> LayerType {
        self.layer_type
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.config.get(name)
    }

    /// Nominal output rank, or `None` for placeholders.
    pub fn rank(&self) -> Option<u8> {
        self.rank
    }

    /// Whether this node produces an output other nodes can consume.
    pub fn is_real(&self) -> bool {
        self.rank.is_some()
    }
}

/// Validates every entry of `config` against the schema of `layer_type`.
fn check_config(layer_type: LayerType, config: &LayerConfig) -> ArchResult<()> {
    for (name, value) in config {
        match layer_type.param_kind(name) {
            None => {
                return Err(ArchError::InvalidConfig {
                    layer_type,
                    param: name.clone(),
                    reason: "unknown parameter",
                })
            }
            Some(kind) if kind != value.kind() => {
                return Err(ArchError::InvalidConfig {
                    layer_type,
                    param: name.clone(),
                    reason: "wrong value kind",
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Output rank (batch axis included) a layer nominally produces.
///
/// Upstream shapes are not consulted; shape inference happens downstream.
fn nominal_rank(layer_type: LayerType, config: &LayerConfig) -> u8 {
    match layer_type {
        LayerType::Input => config
            .get("shape")
            .and_then(ParamValue::as_shape)
            .map(|s| (s.len() + 1).min(u8::MAX as usize) as u8)
            .unwrap_or(2),
        LayerType::Embedding | LayerType::Conv1d | LayerType::MaxPool1d => 3,
        LayerType::Conv2d | LayerType::MaxPool2d => 4,
        LayerType::Lstm | LayerType::Bidirectional => {
            let sequences = config
                .get("return_sequences")
                .and_then(ParamValue::as_bool)
                .unwrap_or(false);
            if sequences {
                3
            } else {
                2
            }
        }
        LayerType::Dense | LayerType::Dropout | LayerType::Flatten | LayerType::Output => 2,
    }
}
