//! Layer catalogue and configuration value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of layer a node stands for.
///
/// `Input` and `Output` are reserved for the two graph endpoints; the
/// remaining variants may appear anywhere in the interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Input,
    Embedding,
    Conv1d,
    Conv2d,
    MaxPool1d,
    MaxPool2d,
    Lstm,
    Bidirectional,
    Dense,
    Dropout,
    Flatten,
    /// Terminal classifier layer (the finisher).
    Output,
}

impl LayerType {
    /// Every layer type, in declaration order.
    pub const ALL: [LayerType; 12] = [
        LayerType::Input,
        LayerType::Embedding,
        LayerType::Conv1d,
        LayerType::Conv2d,
        LayerType::MaxPool1d,
        LayerType::MaxPool2d,
        LayerType::Lstm,
        LayerType::Bidirectional,
        LayerType::Dense,
        LayerType::Dropout,
        LayerType::Flatten,
        LayerType::Output,
    ];

    /// Snake-case name used in logs and persisted records.
    pub fn name(self) -> &'static str {
        match self {
            LayerType::Input => "input",
            LayerType::Embedding => "embedding",
            LayerType::Conv1d => "conv1d",
            LayerType::Conv2d => "conv2d",
            LayerType::MaxPool1d => "max_pool1d",
            LayerType::MaxPool2d => "max_pool2d",
            LayerType::Lstm => "lstm",
            LayerType::Bidirectional => "bidirectional",
            LayerType::Dense => "dense",
            LayerType::Dropout => "dropout",
            LayerType::Flatten => "flatten",
            LayerType::Output => "output",
        }
    }

    /// Whether this type may only appear as a graph endpoint.
    pub fn is_reserved(self) -> bool {
        matches!(self, LayerType::Input | LayerType::Output)
    }

    /// Whether mutation operators must leave nodes of this type alone.
    ///
    /// Embeddings form the fixed prefix of text networks.
    pub fn is_fixed(self) -> bool {
        self.is_reserved() || self == LayerType::Embedding
    }

    /// Parameters accepted by this layer type.
    pub fn schema(self) -> &'static [(&'static str, ParamKind)] {
        use ParamKind::*;
        match self {
            LayerType::Input => &[("shape", Shape)],
            LayerType::Embedding => &[
                ("vocabular", Int),
                ("embedding_dim", Int),
                ("sentences_length", Int),
            ],
            LayerType::Conv1d | LayerType::Conv2d => &[
                ("filters", Int),
                ("kernel_size", Int),
                ("strides", Int),
                ("padding", Text),
                ("dilation_rate", Int),
                ("activation", Text),
            ],
            LayerType::MaxPool1d | LayerType::MaxPool2d => {
                &[("pool_size", Int), ("strides", Int), ("padding", Text)]
            }
            LayerType::Lstm | LayerType::Bidirectional => &[
                ("units", Int),
                ("return_sequences", Bool),
                ("dropout", Float),
                ("recurrent_dropout", Float),
            ],
            LayerType::Dense | LayerType::Output => &[("units", Int), ("activation", Text)],
            LayerType::Dropout => &[("rate", Float)],
            LayerType::Flatten => &[],
        }
    }

    /// Looks up the expected kind of a parameter.
    pub fn param_kind(self, name: &str) -> Option<ParamKind> {
        self.schema()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, kind)| kind)
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Text,
    Shape,
}

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Shape(Vec<usize>),
}

impl ParamValue {
    /// The kind of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Text(_) => ParamKind::Text,
            ParamValue::Shape(_) => ParamKind::Shape,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&[usize]> {
        match self {
            ParamValue::Shape(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Vec<usize>> for ParamValue {
    fn from(v: Vec<usize>) -> Self {
        ParamValue::Shape(v)
    }
}
