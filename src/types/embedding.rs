//! Embedding request/response.

use serde::{Deserialize, Serialize};

use super::extension::{wire_fields, ExtensionData};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(
    EmbeddingRequest,
    ["model", "input", "dimensions", "encoding_format", "user"]
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingRequest {
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_input(model, EmbeddingInput::Single(text.into()))
    }

    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self::with_input(model, EmbeddingInput::Batch(texts))
    }

    fn with_input(model: impl Into<String>, input: EmbeddingInput) -> Self {
        Self {
            model: model.into(),
            input,
            dimensions: None,
            encoding_format: None,
            user: None,
            extension: ExtensionData::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingResponse {
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<EmbeddingUsage>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(EmbeddingResponse, ["data", "model", "usage"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl EmbeddingResponse {
    /// Vectors ordered by their `index`, regardless of wire order.
    pub fn vectors(&self) -> Vec<&[f32]> {
        let mut data: Vec<&Embedding> = self.data.iter().collect();
        data.sort_by_key(|e| e.index);
        data.into_iter().map(|e| e.embedding.as_slice()).collect()
    }
}
