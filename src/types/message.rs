//! Chat messages and their content.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::extension::{colliding_keys, wire_fields, ExtensionData, WireFields};
use super::tool::ToolCall;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Id of the tool call this message answers (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Outgoing tool calls (assistant role only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(
    Message,
    ["role", "content", "name", "tool_call_id", "tool_calls"]
);

impl Message {
    pub fn new(role: Role, content: Option<Content>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
            extension: ExtensionData::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Some(Content::Text(text.into())))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Some(Content::Text(text.into())))
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, Some(Content::Parts(parts)))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(Content::Text(text.into())))
    }

    /// Assistant turn requesting tool invocations. Content is usually absent.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content.map(Content::Text));
        msg.tool_calls = tool_calls;
        msg
    }

    /// Result of one tool call, tagged with the call id it answers.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, Some(Content::Text(content.into())));
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Concatenated text of the message (text parts only).
    pub fn text(&self) -> Option<String> {
        match self.content.as_ref()? {
            Content::Text(t) => Some(t.clone()),
            Content::Parts(parts) => {
                let text: String = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text, .. } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                Some(text)
            }
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub(crate) fn collisions_at(&self, prefix: &str) -> Vec<String> {
        let mut keys = colliding_keys(Self::FIELDS, &self.extension, prefix);
        if let Some(Content::Parts(parts)) = &self.content {
            for (i, part) in parts.iter().enumerate() {
                keys.extend(part.collisions_at(&format!("{}content[{}].", prefix, i)));
            }
        }
        for (i, call) in self.tool_calls.iter().enumerate() {
            keys.extend(call.collisions_at(&format!("{}tool_calls[{}].", prefix, i)));
        }
        keys
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: plain text or an ordered list of typed parts, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<ContentPart>> for Content {
    fn from(parts: Vec<ContentPart>) -> Self {
        Content::Parts(parts)
    }
}

/// One typed part of a multi-part message, tagged by `type`.
///
/// Each variant and payload keeps unknown provider fields (`cache_control`,
/// ...) in its own `extension`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
        #[serde(flatten)]
        extension: ExtensionData,
    },
    ImageUrl {
        image_url: ImageUrl,
        #[serde(flatten)]
        extension: ExtensionData,
    },
    InputAudio {
        input_audio: InputAudio,
        #[serde(flatten)]
        extension: ExtensionData,
    },
    File {
        file: FileRef,
        #[serde(flatten)]
        extension: ExtensionData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    /// `https://` URL or `data:` URL with base64 payload.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ImageUrl, ["url", "detail"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudio {
    /// Base64 encoded audio.
    pub data: String,
    /// "wav", "mp3", ...
    pub format: String,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(InputAudio, ["data", "format"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(FileRef, ["file_id", "filename", "file_data"]);

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            extension: ExtensionData::new(),
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
                extension: ExtensionData::new(),
            },
            extension: ExtensionData::new(),
        }
    }

    pub fn image_base64(data: &[u8], media_type: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        Self::image_url(format!("data:{};base64,{}", media_type, encoded))
    }

    pub fn audio_base64(data: &[u8], format: impl Into<String>) -> Self {
        ContentPart::InputAudio {
            input_audio: InputAudio {
                data: base64::engine::general_purpose::STANDARD.encode(data),
                format: format.into(),
                extension: ExtensionData::new(),
            },
            extension: ExtensionData::new(),
        }
    }

    pub fn file_id(file_id: impl Into<String>) -> Self {
        ContentPart::File {
            file: FileRef {
                file_id: Some(file_id.into()),
                filename: None,
                file_data: None,
                extension: ExtensionData::new(),
            },
            extension: ExtensionData::new(),
        }
    }

    pub fn extension(&self) -> &ExtensionData {
        match self {
            ContentPart::Text { extension, .. }
            | ContentPart::ImageUrl { extension, .. }
            | ContentPart::InputAudio { extension, .. }
            | ContentPart::File { extension, .. } => extension,
        }
    }

    pub(crate) fn collisions_at(&self, prefix: &str) -> Vec<String> {
        let (fields, payload): (&[&str], Option<(&str, Vec<String>)>) = match self {
            ContentPart::Text { .. } => (&["type", "text"], None),
            ContentPart::ImageUrl { image_url, .. } => (
                &["type", "image_url"],
                Some(("image_url", image_url.colliding_extension_keys())),
            ),
            ContentPart::InputAudio { input_audio, .. } => (
                &["type", "input_audio"],
                Some(("input_audio", input_audio.colliding_extension_keys())),
            ),
            ContentPart::File { file, .. } => {
                (&["type", "file"], Some(("file", file.colliding_extension_keys())))
            }
        };
        let mut keys = colliding_keys(fields, self.extension(), prefix);
        if let Some((name, nested)) = payload {
            keys.extend(nested.into_iter().map(|k| format!("{}{}.{}", prefix, name, k)));
        }
        keys
    }

    pub fn image_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            crate::Error::validation_with_context(
                format!("cannot read image: {}", e),
                crate::ErrorContext::new().with_field_path(path.display().to_string()),
            )
        })?;
        let media_type = guess_media_type(path).unwrap_or("application/octet-stream");
        Ok(Self::image_base64(&bytes, media_type))
    }

    pub fn audio_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            crate::Error::validation_with_context(
                format!("cannot read audio: {}", e),
                crate::ErrorContext::new().with_field_path(path.display().to_string()),
            )
        })?;
        let format = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("wav")
            .to_lowercase();
        Ok(Self::audio_base64(&bytes, format))
    }
}

pub(crate) fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mt)
}
