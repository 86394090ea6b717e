//! Declarative form schemas.
//!
//! A [`FormSchema`] is the total allow-list of fields a form accepts. Schemas
//! are built once at startup and shared immutably by every request.

use std::fmt;

/// Declared type of a form field.
///
/// `Unknown` keeps the wire name of a type this crate does not recognise so
/// schemas assembled from external definitions fail at validation time with
/// `unknown type: <name>` rather than at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Free text with a character length range
    String,
    /// `local@domain.tld`, 3..=254 characters
    Email,
    /// Permissive phone characters, at least 4 when present
    Phone,
    /// Strict `YYYY-MM-DD`
    Date,
    /// Strict 24h `HH:MM`
    Time,
    /// Exact member of `options`
    Enum,
    /// Array of strings with item count and byte caps
    StrArrayCapped,
    /// A type name with no validator
    Unknown(String),
}

impl FieldType {
    /// Parses a wire type name such as `"strArrayCapped"`.
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => FieldType::String,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "enum" => FieldType::Enum,
            "strArrayCapped" => FieldType::StrArrayCapped,
            other => FieldType::Unknown(other.to_string()),
        }
    }

    /// Whether an empty optional value defaults to `[]` instead of `""`.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::StrArrayCapped)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Email => write!(f, "email"),
            FieldType::Phone => write!(f, "phone"),
            FieldType::Date => write!(f, "date"),
            FieldType::Time => write!(f, "time"),
            FieldType::Enum => write!(f, "enum"),
            FieldType::StrArrayCapped => write!(f, "strArrayCapped"),
            FieldType::Unknown(name) => write!(f, "{}", name),
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in the submitted JSON
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Whether an empty value is rejected
    pub required: bool,
    /// Minimum length in characters (`string` only)
    pub min: Option<usize>,
    /// Maximum length in characters
    pub max: Option<usize>,
    /// Allowed values (`enum` only)
    pub options: Vec<String>,
}

impl FieldSpec {
    /// Creates a field with no limits.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    /// Marks the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets an inclusive character length range.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Sets only the maximum length.
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the allowed values of an `enum` field.
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Error building a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate field in schema '{form}': {field}")]
pub struct DuplicateField {
    /// Form identity
    pub form: String,
    /// The repeated field name
    pub field: String,
}

/// An ordered, uniquely named set of fields bound to a form identity.
///
/// # Examples
///
/// ```
/// use form_intake::schema::{FieldSpec, FieldType, FormSchema};
///
/// let schema = FormSchema::new(
///     "newsletter",
///     vec![FieldSpec::new("Email", FieldType::Email).required()],
/// )
/// .expect("unique names");
///
/// assert_eq!(schema.form(), "newsletter");
/// assert!(schema.field("Email").is_some());
/// assert!(schema.field("Name").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    form: String,
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Builds a schema, rejecting duplicate field names.
    pub fn new(form: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, DuplicateField> {
        let form = form.into();
        for (i, spec) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == spec.name) {
                return Err(DuplicateField {
                    form,
                    field: spec.name.clone(),
                });
            }
        }
        Ok(Self { form, fields })
    }

    /// The form identity this schema validates.
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Declared fields in schema order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Built-in forms served by the intake handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// General contact form
    Contact,
    /// "Join us" / onboarding interest form
    Join,
}

impl FormKind {
    /// All known forms, used by the transit broker's shape gate.
    pub const ALL: [FormKind; 2] = [FormKind::Contact, FormKind::Join];

    /// Wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            FormKind::Contact => "contact",
            FormKind::Join => "join",
        }
    }

    /// Parses a wire identifier.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Schema for this form.
    pub fn schema(self) -> FormSchema {
        match self {
            FormKind::Contact => contact(),
            FormKind::Join => join(),
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options offered by the join form's interest selector.
pub const JOIN_INTERESTS: [&str; 5] = [
    "IT Support",
    "Web Development",
    "Cloud Services",
    "Cybersecurity",
    "Other",
];

const CONTACT_SUBJECTS: [&str; 5] = [
    "General Inquiry",
    "Support",
    "Sales",
    "Partnership",
    "Other",
];

// Both built-ins have unique names, so the constructor cannot fail.
fn built_in(form: &str, fields: Vec<FieldSpec>) -> FormSchema {
    FormSchema {
        form: form.to_string(),
        fields,
    }
}

/// Schema of the contact form.
pub fn contact() -> FormSchema {
    built_in(
        FormKind::Contact.as_str(),
        vec![
            FieldSpec::new("Name", FieldType::String).required().length(1, 200),
            FieldSpec::new("Email", FieldType::Email).required(),
            FieldSpec::new("Phone", FieldType::Phone).max(40),
            FieldSpec::new("Company", FieldType::String).length(0, 200),
            FieldSpec::new("Subject", FieldType::Enum).options(CONTACT_SUBJECTS),
            FieldSpec::new("Comments", FieldType::String)
                .required()
                .length(1, 5000),
        ],
    )
}

/// Schema of the join form.
pub fn join() -> FormSchema {
    built_in(
        FormKind::Join.as_str(),
        vec![
            FieldSpec::new("Name", FieldType::String).required().length(1, 200),
            FieldSpec::new("Email", FieldType::Email).required(),
            FieldSpec::new("Phone", FieldType::Phone).max(40),
            FieldSpec::new("What are you interested in?", FieldType::Enum)
                .required()
                .options(JOIN_INTERESTS),
            FieldSpec::new("Preferred Date", FieldType::Date),
            FieldSpec::new("Preferred Time", FieldType::Time),
            FieldSpec::new("Services", FieldType::StrArrayCapped),
            FieldSpec::new("Comments", FieldType::String).length(0, 5000),
        ],
    )
}
