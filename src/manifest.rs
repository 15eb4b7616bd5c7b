//! Parsing of manifest text into documents
//!
//! A manifest is YAML (or JSON) text holding any number of documents
//! separated by `---`. Every non-empty document is either a single API
//! object or a list wrapping several of them.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ParseError;

/// A single API object as written in a manifest
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    /// Wraps the given mapping without validating it.
    pub fn new(object: Map<String, Value>) -> Self {
        Manifest(object)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    /// Returns `metadata/name`.
    pub fn name(&self) -> Option<&str> {
        self.metadata()
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
    }

    /// Returns `metadata/namespace`.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata()
            .and_then(|metadata| metadata.get("namespace"))
            .and_then(Value::as_str)
    }

    pub(crate) fn set_api_version(&mut self, api_version: &str) {
        self.0
            .insert(String::from("apiVersion"), Value::from(api_version));
    }

    pub(crate) fn set_kind(&mut self, kind: &str) {
        self.0.insert(String::from("kind"), Value::from(kind));
    }

    /// Sets `metadata/namespace`, creating `metadata` if necessary.
    pub(crate) fn set_namespace(&mut self, namespace: &str) {
        let metadata = self
            .0
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = metadata {
            metadata.insert(String::from("namespace"), Value::from(namespace));
        }
    }

    pub(crate) fn clear_namespace(&mut self) {
        if let Some(Value::Object(metadata)) = self.0.get_mut("metadata") {
            metadata.remove("namespace");
        }
    }

    /// Returns the object as it is sent to the API server.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata").and_then(Value::as_object)
    }
}

/// How the items of a list document are typed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListKind {
    /// `kind: List`; every item declares its own kind.
    Heterogeneous,
    /// `kind: <Kind>List`; every item is of the given kind.
    Homogeneous(String),
}

impl ListKind {
    /// Returns the list kind for the given `kind` or `None` if the kind
    /// does not denote a list.
    pub fn from_kind(kind: &str) -> Option<ListKind> {
        match kind.strip_suffix("List") {
            Some("") => Some(ListKind::Heterogeneous),
            Some(item_kind) => Some(ListKind::Homogeneous(item_kind.to_owned())),
            None => None,
        }
    }
}

/// A document whose `kind` ends with `List`
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestList {
    pub api_version: String,
    pub kind: ListKind,
    pub items: Vec<Manifest>,
}

/// A parsed manifest document
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Object(Manifest),
    List(ManifestList),
}

impl Document {
    /// Interprets a decoded value as a document.
    ///
    /// Returns `None` for a null value, i.e. an empty document.
    pub fn from_value(value: Value) -> Result<Option<Document>, ParseError> {
        Document::from_indexed_value(0, value)
    }

    fn from_indexed_value(document: usize, value: Value) -> Result<Option<Document>, ParseError> {
        let mut object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            _ => return Err(ParseError::NotAMapping { document }),
        };

        let api_version = string_field(&object, document, "apiVersion")?;
        let kind = string_field(&object, document, "kind")?;

        let list_kind = match ListKind::from_kind(&kind) {
            Some(list_kind) => list_kind,
            None => return Ok(Some(Document::Object(Manifest(object)))),
        };

        let items = match object.remove("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(item) => Ok(Manifest(item)),
                    _ => Err(ParseError::NotAMapping { document }),
                })
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(ParseError::InvalidItems { document }),
        };

        Ok(Some(Document::List(ManifestList {
            api_version,
            kind: list_kind,
            items,
        })))
    }
}

fn string_field(
    object: &Map<String, Value>,
    document: usize,
    field: &'static str,
) -> Result<String, ParseError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ParseError::MissingField { document, field })
}

/// Parses the given YAML or JSON text into its documents.
///
/// Empty documents are skipped. Document indices in errors count every
/// document, including empty ones, starting at 0.
pub fn parse(text: &str) -> Result<Vec<Document>, ParseError> {
    let mut documents = Vec::new();

    for (index, deserializer) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(deserializer).map_err(|source| ParseError::Yaml {
            document: index,
            source,
        })?;

        if let Some(document) = Document::from_indexed_value(index, value)? {
            documents.push(document);
        }
    }

    Ok(documents)
}
