//! `multipart/form-data` encoding.
//!
//! Request DTOs are flattened into text fields by a serde [`Serializer`] that
//! walks the derived `Serialize` impl depth-first:
//!
//! | Value | Fields |
//! |-------|--------|
//! | `None` / unit | `name` = `""` (present, never omitted) |
//! | string | `name` = value, verbatim |
//! | bool | `name` = [`TRUE_LITERAL`] / [`FALSE_LITERAL`] |
//! | integer, char, unit enum variant | `name` = textual form |
//! | float | `name` = JSON number text (`1.0`, `0.5`, `-3.25`) |
//! | sequence of scalars | one `name[]` field per element, in order |
//! | nested struct / map | recurse with `name.` prefix |
//! | `#[serde(flatten)]` extension data | same scope as declared fields |
//!
//! Sequences holding sequences or objects have no representation on the wire and
//! fail with [`Error::Validation`] naming the field path. Binary parts are not
//! serialized; they come from [`MultipartRequest::files`].

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::ser::{self, Impossible, Serialize, Serializer};

use crate::types::extension::WireFields;
use crate::{Error, ErrorContext, Result};

/// Literal sent for `true`. Some providers parse form booleans case-sensitively.
pub const TRUE_LITERAL: &str = "true";
/// Literal sent for `false`.
pub const FALSE_LITERAL: &str = "false";

/// One flattened text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// In-memory file content for an upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Bytes,
    pub mime_type: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::validation_with_context(
                format!("cannot read upload: {}", e),
                ErrorContext::new().with_field_path(path.display().to_string()),
            )
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        Ok(Self {
            file_name,
            bytes: Bytes::from(bytes),
            mime_type: crate::types::message::guess_media_type(path).map(String::from),
        })
    }
}

/// Binary part attached under a form field name.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub upload: FileUpload,
}

impl FilePart {
    pub fn new(field: impl Into<String>, upload: FileUpload) -> Self {
        Self {
            field: field.into(),
            upload,
        }
    }
}

/// A request sent as `multipart/form-data`.
pub trait MultipartRequest: Serialize + WireFields {
    fn files(&self) -> Vec<FilePart> {
        Vec::new()
    }
}

/// Flatten a value into ordered text fields.
pub fn flatten<T: Serialize + ?Sized>(value: &T) -> Result<Vec<FormField>> {
    let mut out = Vec::new();
    value
        .serialize(FieldSerializer {
            out: &mut out,
            name: String::new(),
            scope: Scope::Root,
        })
        .map_err(|e| {
            Error::validation_with_context(
                e.message,
                ErrorContext::new()
                    .with_field_path(e.path)
                    .with_source("multipart_encoder"),
            )
        })?;
    Ok(out)
}

/// Build the multipart body: flattened text fields first, then file parts.
pub fn encode<T: MultipartRequest>(value: &T) -> Result<Form> {
    super::json::check_collisions(value)?;
    let fields = flatten(value)?;
    tracing::trace!(fields = fields.len(), "flattened multipart request");

    let mut form = Form::new();
    for field in fields {
        form = form.text(field.name, field.value);
    }
    for file in value.files() {
        let mut part = Part::bytes(file.upload.bytes.to_vec()).file_name(file.upload.file_name);
        if let Some(mime) = &file.upload.mime_type {
            part = part.mime_str(mime).map_err(|e| {
                Error::validation_with_context(
                    format!("invalid mime type '{}': {}", mime, e),
                    ErrorContext::new()
                        .with_field_path(file.field.clone())
                        .with_source("multipart_encoder"),
                )
            })?;
        }
        form = form.part(file.field, part);
    }
    Ok(form)
}

#[derive(Debug)]
struct FormError {
    path: String,
    message: String,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.path)
    }
}

impl std::error::Error for FormError {}

impl ser::Error for FormError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        FormError {
            path: String::new(),
            message: msg.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// The request itself; must be an object.
    Root,
    /// A named field.
    Field,
    /// An element of a `name[]` sequence; must be a scalar.
    Element,
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

struct FieldSerializer<'a> {
    out: &'a mut Vec<FormField>,
    name: String,
    scope: Scope,
}

impl<'a> FieldSerializer<'a> {
    fn fail(&self, message: impl Into<String>) -> FormError {
        FormError {
            path: if self.name.is_empty() {
                "<root>".to_string()
            } else {
                self.name.clone()
            },
            message: message.into(),
        }
    }

    fn push(self, value: impl Into<String>) -> std::result::Result<(), FormError> {
        if self.scope == Scope::Root {
            return Err(self.fail("multipart request must serialize to an object"));
        }
        self.out.push(FormField::new(self.name, value));
        Ok(())
    }

    /// Floats use their JSON text, so `1.0` stays `1.0`.
    fn push_float(self, finite: bool, text: serde_json::Result<String>) -> Done {
        if !finite {
            return Err(self.fail("NaN and infinite numbers have no JSON form"));
        }
        match text {
            Ok(text) => self.push(text),
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    fn composite(self, prefix: String) -> std::result::Result<MapFields<'a>, FormError> {
        if self.scope == Scope::Element {
            return Err(self.fail("arrays of objects are not supported in multipart bodies"));
        }
        Ok(MapFields {
            out: self.out,
            prefix,
            key: None,
        })
    }
}

type Done = std::result::Result<(), FormError>;

impl<'a> Serializer for FieldSerializer<'a> {
    type Ok = ();
    type Error = FormError;
    type SerializeSeq = SeqFields<'a>;
    type SerializeTuple = SeqFields<'a>;
    type SerializeTupleStruct = SeqFields<'a>;
    type SerializeTupleVariant = Impossible<(), FormError>;
    type SerializeMap = MapFields<'a>;
    type SerializeStruct = MapFields<'a>;
    type SerializeStructVariant = MapFields<'a>;

    fn serialize_bool(self, v: bool) -> Done {
        self.push(if v { TRUE_LITERAL } else { FALSE_LITERAL })
    }

    fn serialize_i8(self, v: i8) -> Done {
        self.push(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Done {
        self.push(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Done {
        self.push(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Done {
        self.push(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Done {
        self.push(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Done {
        self.push(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Done {
        self.push(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Done {
        self.push(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Done {
        self.push(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Done {
        self.push(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Done {
        self.push_float(v.is_finite(), serde_json::to_string(&v))
    }

    fn serialize_f64(self, v: f64) -> Done {
        self.push_float(v.is_finite(), serde_json::to_string(&v))
    }

    fn serialize_char(self, v: char) -> Done {
        self.push(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Done {
        self.push(v)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Done {
        Err(self.fail("raw bytes must be sent as a file part"))
    }

    fn serialize_none(self) -> Done {
        self.push("")
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Done {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Done {
        self.push("")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Done {
        self.push("")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Done {
        self.push(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Done {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Done {
        if self.scope == Scope::Element {
            return Err(self.fail("arrays of objects are not supported in multipart bodies"));
        }
        let name = join(&self.name, variant);
        value.serialize(FieldSerializer {
            out: self.out,
            name,
            scope: Scope::Field,
        })
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<SeqFields<'a>, FormError> {
        match self.scope {
            Scope::Root => Err(self.fail("multipart request must serialize to an object")),
            Scope::Element => Err(self.fail("nested arrays are not supported in multipart bodies")),
            Scope::Field => Ok(SeqFields {
                name: format!("{}[]", self.name),
                out: self.out,
            }),
        }
    }

    fn serialize_tuple(self, len: usize) -> std::result::Result<SeqFields<'a>, FormError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> std::result::Result<SeqFields<'a>, FormError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, FormError> {
        Err(self.fail("tuple enum variants are not supported in multipart bodies"))
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<MapFields<'a>, FormError> {
        let prefix = self.name.clone();
        self.composite(prefix)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<MapFields<'a>, FormError> {
        let prefix = self.name.clone();
        self.composite(prefix)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> std::result::Result<MapFields<'a>, FormError> {
        let prefix = join(&self.name, variant);
        self.composite(prefix)
    }
}

struct SeqFields<'a> {
    out: &'a mut Vec<FormField>,
    name: String,
}

impl SeqFields<'_> {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Done {
        value.serialize(FieldSerializer {
            out: &mut *self.out,
            name: self.name.clone(),
            scope: Scope::Element,
        })
    }
}

impl ser::SerializeSeq for SeqFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Done {
        self.element(value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}

impl ser::SerializeTuple for SeqFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Done {
        self.element(value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for SeqFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Done {
        self.element(value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}

struct MapFields<'a> {
    out: &'a mut Vec<FormField>,
    prefix: String,
    key: Option<String>,
}

impl MapFields<'_> {
    fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Done {
        value.serialize(FieldSerializer {
            out: &mut *self.out,
            name: join(&self.prefix, key),
            scope: Scope::Field,
        })
    }
}

impl ser::SerializeMap for MapFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Done {
        let key = match serde_json::to_value(key).map_err(<FormError as ser::Error>::custom)? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(FormError {
                    path: self.prefix.clone(),
                    message: format!("unsupported map key {}", other),
                })
            }
        };
        self.key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Done {
        let key = self
            .key
            .take()
            .ok_or_else(|| <FormError as ser::Error>::custom("map value without key"))?;
        self.field(&key, value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}

impl ser::SerializeStruct for MapFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Done {
        self.field(key, value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}

impl ser::SerializeStructVariant for MapFields<'_> {
    type Ok = ();
    type Error = FormError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Done {
        self.field(key, value)
    }

    fn end(self) -> Done {
        Ok(())
    }
}
