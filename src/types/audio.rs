//! Speech synthesis (JSON in, audio bytes out) and transcription (multipart in).

use serde::{Deserialize, Serialize};

use super::extension::{wire_fields, ExtensionData};
use crate::codec::multipart::{FilePart, FileUpload, MultipartRequest};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechRequest {
    pub model: String,
    pub input: String,
    pub voice: String,
    /// mp3, opus, aac, flac, wav, pcm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(
    SpeechRequest,
    ["model", "input", "voice", "response_format", "speed", "instructions"]
);

impl SpeechRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            voice: voice.into(),
            response_format: None,
            speed: None,
            instructions: None,
            extension: ExtensionData::new(),
        }
    }

    pub fn response_format(mut self, format: impl Into<String>) -> Self {
        self.response_format = Some(format.into());
        self
    }
}

/// Multipart transcription upload.
///
/// Optional fields are sent as empty strings when unset; the file part is
/// appended after the text fields.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionRequest {
    #[serde(skip)]
    pub file: FileUpload,
    pub model: String,
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub response_format: Option<String>,
    pub temperature: Option<f32>,
    /// Sent as repeated `timestamp_granularities[]` fields.
    pub timestamp_granularities: Vec<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(
    TranscriptionRequest,
    [
        "model",
        "language",
        "prompt",
        "response_format",
        "temperature",
        "timestamp_granularities",
    ]
);

impl TranscriptionRequest {
    pub fn new(model: impl Into<String>, file: FileUpload) -> Self {
        Self {
            file,
            model: model.into(),
            language: None,
            prompt: None,
            response_format: None,
            temperature: None,
            timestamp_granularities: Vec::new(),
            extension: ExtensionData::new(),
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl MultipartRequest for TranscriptionRequest {
    fn files(&self) -> Vec<FilePart> {
        vec![FilePart::new("file", self.file.clone())]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcription {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(Transcription, ["text", "language", "duration"]);
