//! Form payloads and session credentials.
//!
//! A payload maps logical field names to values and is read-only during a
//! run. It is loaded from a JSON fixture whose keys are logical field names;
//! the keys `mileage_km`, `price_million_vnd` and `image` are accepted as
//! aliases of `mileage`, `price` and `attachment`.

use crate::page_object::{FieldKind, LocatorRegistry};
use crate::pages::fields;
use crate::result::{FormError, FormResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const KEY_ALIASES: &[(&str, &str)] = &[
    ("mileage_km", fields::MILEAGE),
    ("price_million_vnd", fields::PRICE),
    ("image", fields::ATTACHMENT),
    ("images", fields::ATTACHMENT),
];

/// Value of one logical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text, or the value of a select option / radio
    Text(String),
    /// Number, kept in its fixture rendering
    Number(String),
    /// Files to attach
    Files(Vec<PathBuf>),
}

impl FieldValue {
    /// Value as written into a control
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) | Self::Number(s) => s.clone(),
            Self::Files(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Whether the value is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::Number(s) => s.trim().is_empty(),
            Self::Files(paths) => paths.is_empty(),
        }
    }

    /// Attached files, if this is a file value
    #[must_use]
    pub fn files(&self) -> Option<&[PathBuf]> {
        match self {
            Self::Files(paths) => Some(paths),
            Self::Text(_) | Self::Number(_) => None,
        }
    }

    fn from_json(key: &str, value: &Value) -> FormResult<Option<Self>> {
        let parsed = match value {
            Value::Null => None,
            Value::String(s) if key == fields::ATTACHMENT => {
                Some(Self::Files(vec![PathBuf::from(s)]))
            }
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(Self::Number(n.to_string())),
            Value::Array(items) if key == fields::ATTACHMENT => {
                let paths = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(PathBuf::from).ok_or_else(|| {
                            FormError::invalid_payload(format!(
                                "`{key}` entries must be file paths, got {item}"
                            ))
                        })
                    })
                    .collect::<FormResult<Vec<_>>>()?;
                Some(Self::Files(paths))
            }
            other => {
                return Err(FormError::invalid_payload(format!(
                    "`{key}` must be a string or number, got {other}"
                )))
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Mapping from logical field name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    values: BTreeMap<String, FieldValue>,
}

impl FormPayload {
    /// Create an empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text value
    #[must_use]
    pub fn with_text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.values.insert(field.into(), FieldValue::Text(value.into()));
        self
    }

    /// Set a numeric value
    #[must_use]
    pub fn with_number(mut self, field: impl Into<String>, value: i64) -> Self {
        let _ = self
            .values
            .insert(field.into(), FieldValue::Number(value.to_string()));
        self
    }

    /// Set the attachment
    #[must_use]
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        let _ = self
            .values
            .insert(fields::ATTACHMENT.to_string(), FieldValue::Files(vec![path.into()]));
        self
    }

    /// Parse a JSON fixture
    pub fn from_json_str(json: &str) -> FormResult<Self> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(map) = root else {
            return Err(FormError::invalid_payload("fixture must be a JSON object"));
        };
        let mut values = BTreeMap::new();
        for (key, value) in &map {
            let field = canonical_key(key);
            if let Some(parsed) = FieldValue::from_json(field, value)? {
                if values.insert(field.to_string(), parsed).is_some() {
                    return Err(FormError::invalid_payload(format!(
                        "`{field}` is given more than once (alias `{key}`)"
                    )));
                }
            }
        }
        Ok(Self { values })
    }

    /// Load a JSON fixture from disk.
    ///
    /// Relative attachment paths are resolved against the fixture's directory
    /// when the file exists there, and left as given otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> FormResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut payload = Self::from_json_str(&json)?;
        if let Some(dir) = path.parent() {
            if let Some(FieldValue::Files(files)) = payload.values.get_mut(fields::ATTACHMENT) {
                for file in files.iter_mut() {
                    let candidate = dir.join(&*file);
                    if file.is_relative() && candidate.exists() {
                        *file = candidate;
                    }
                }
            }
        }
        tracing::debug!(fixture = %path.display(), fields = payload.values.len(), "payload loaded");
        Ok(payload)
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Value of a field as text
    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        self.values.get(field).map(FieldValue::as_text)
    }

    /// Listing title, if present
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.text(fields::TITLE)
    }

    /// Logical field names present in the payload
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Suffix the title with a short random id so concurrent runs stay distinct
    #[must_use]
    pub fn with_unique_title(mut self) -> Self {
        if let Some(FieldValue::Text(title)) = self.values.get_mut(fields::TITLE) {
            let id = uuid::Uuid::new_v4().simple().to_string();
            title.push_str(" #");
            title.push_str(&id[..8]);
        }
        self
    }

    /// Check the payload against a form's required-field set.
    ///
    /// A select the payload omits resolves to the first available option, so
    /// only an explicit blank value is rejected there. Attachment files must
    /// exist.
    pub fn validate(&self, registry: &LocatorRegistry) -> FormResult<()> {
        for field in registry.fields().iter().filter(|f| f.kind() == FieldKind::Select) {
            let blank = self
                .values
                .get(field.name())
                .is_some_and(|v| v.as_text().trim().is_empty());
            if blank && field.is_required() {
                return Err(FormError::MissingRequiredField {
                    field: field.name().to_string(),
                });
            }
            if blank {
                return Err(FormError::invalid_payload(format!(
                    "`{}` is blank; omit it to take the first available option",
                    field.name()
                )));
            }
        }
        for field in registry.required_fields() {
            if field.kind() == FieldKind::Select {
                continue;
            }
            let value = self.values.get(field.name());
            let missing = match value {
                None => true,
                Some(v) => v.is_empty() || field.normalize(&v.as_text()).is_empty(),
            };
            if missing {
                return Err(FormError::MissingRequiredField {
                    field: field.name().to_string(),
                });
            }
        }
        if let Some(files) = self.values.get(fields::ATTACHMENT).and_then(FieldValue::files) {
            if let Some(absent) = files.iter().find(|f| !f.exists()) {
                return Err(FormError::invalid_payload(format!(
                    "attachment {} does not exist",
                    absent.display()
                )));
            }
        }
        Ok(())
    }
}

fn canonical_key(key: &str) -> &str {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| canonical)
}

/// Login identifier and secret, supplied externally and never persisted
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Login identifier
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Login secret
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether either part is empty
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty() || self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
