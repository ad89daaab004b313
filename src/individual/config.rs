//! Individual options.

use serde::{Deserialize, Serialize};

/// Kind of data the network consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Token sequences; networks start with a fixed embedding layer.
    Text,
    /// Dense feature tensors of `input_shape`.
    Generic,
}

/// Data options shared by an individual and its offspring.
///
/// # Examples
///
/// ```
/// use u_neuroarch::individual::{DataKind, IndividualOptions};
///
/// let options = IndividualOptions::default()
///     .with_data_kind(DataKind::Text)
///     .with_classes(4)
///     .with_vocabulary_size(20_000)
///     .with_sentence_length(80);
/// assert!(options.validate().is_ok());
/// assert_eq!(options.input_shape(), vec![80]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualOptions {
    pub data_kind: DataKind,

    /// Shape of one sample, batch axis excluded. Ignored for text.
    pub input_shape: Vec<usize>,

    /// Number of output classes.
    pub classes: usize,

    pub vocabulary_size: usize,
    pub sentence_length: usize,
}

impl Default for IndividualOptions {
    fn default() -> Self {
        Self {
            data_kind: DataKind::Text,
            input_shape: vec![100],
            classes: 2,
            vocabulary_size: 10_000,
            sentence_length: 100,
        }
    }
}

impl IndividualOptions {
    pub fn with_data_kind(mut self, kind: DataKind) -> Self {
        self.data_kind = kind;
        self
    }

    pub fn with_input_shape(mut self, shape: Vec<usize>) -> Self {
        self.input_shape = shape;
        self
    }

    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_vocabulary_size(mut self, size: usize) -> Self {
        self.vocabulary_size = size;
        self
    }

    pub fn with_sentence_length(mut self, length: usize) -> Self {
        self.sentence_length = length;
        self
    }

    /// Shape of the input node.
    pub fn input_shape(&self) -> Vec<usize> {
        match self.data_kind {
            DataKind::Text => vec![self.sentence_length],
            DataKind::Generic => self.input_shape.clone(),
        }
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes < 2 {
            return Err(format!("classes must be at least 2, got {}", self.classes));
        }
        match self.data_kind {
            DataKind::Text => {
                if self.vocabulary_size == 0 {
                    return Err("vocabulary_size must be positive".into());
                }
                if self.sentence_length == 0 {
                    return Err("sentence_length must be positive".into());
                }
            }
            DataKind::Generic => {
                if self.input_shape.is_empty() || self.input_shape.contains(&0) {
                    return Err(format!(
                        "input_shape must be non-empty and positive, got {:?}",
                        self.input_shape
                    ));
                }
            }
        }
        Ok(())
    }
}
