//! Schema validation and byte-limit enforcement.
//!
//! [`validate`] is the only way to turn a [`Tainted`] field map into a
//! [`Verified`] one. It fails fast: the first violation in schema order is
//! returned and no partial output escapes.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{FieldSpec, FieldType, FormSchema};
use crate::{Tainted, Verified};

/// Untyped field map as carried on the wire.
pub type FieldMap = Map<String, Value>;

/// Per-field byte cap shared by `strArrayCapped` items and the
/// [`enforce_byte_limits`] default.
pub const DEFAULT_FIELD_BYTE_CAP: usize = 5000;

/// Maximum number of items in a `strArrayCapped` field.
pub const MAX_ARRAY_ITEMS: usize = 50;

/// Maximum UTF-8 size of one `strArrayCapped` item.
pub const MAX_ITEM_BYTES: usize = DEFAULT_FIELD_BYTE_CAP;

/// Maximum cumulative UTF-8 size of a `strArrayCapped` field.
pub const MAX_ARRAY_TOTAL_BYTES: usize = 20_000;

const EMAIL_MIN_LEN: usize = 3;
const EMAIL_MAX_LEN: usize = 254;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email pattern"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+()\-. xX]{4,}$").expect("invalid phone pattern"));

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("invalid date pattern"));

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[01][0-9]|2[0-3]):[0-5][0-9]$").expect("invalid time pattern")
});

/// Error returned when a submission fails validation.
///
/// Displays as `<kind>: <subject>`, e.g. `missing: Email` or
/// `item too large: Services[3]`. The subject is a field name, index path or
/// type name, never the rejected value.
///
/// # Examples
///
/// ```
/// use form_intake::{ValidationError, ValidationErrorKind};
///
/// let error = ValidationError::new(ValidationErrorKind::UnexpectedField, "Password");
/// assert_eq!(error.kind(), ValidationErrorKind::UnexpectedField);
/// assert_eq!(error.to_string(), "unexpected field: Password");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    kind: ValidationErrorKind,
    subject: String,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(kind: ValidationErrorKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    /// Returns the field name, indexed path or type name the error refers to.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.subject)
    }
}

impl std::error::Error for ValidationError {}

/// Kind of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Requested form does not match the schema's form identity.
    FormMismatch,
    /// Submission carries a field the schema does not declare.
    UnexpectedField,
    /// Required field is missing or empty.
    Missing,
    /// Value is shorter than the declared minimum.
    TooShort,
    /// Value is longer than the declared maximum.
    TooLong,
    /// Value is not `local@domain.tld`.
    InvalidEmail,
    /// Value contains non-phone characters or is under 4 characters.
    InvalidPhone,
    /// Value is not a calendar date in `YYYY-MM-DD`.
    InvalidDate,
    /// Value is not a 24h `HH:MM` time.
    InvalidTime,
    /// Value is not one of the declared options.
    InvalidOption,
    /// Value has the wrong JSON type for its field.
    InvalidType,
    /// Array has more than [`MAX_ARRAY_ITEMS`] items.
    TooManyItems,
    /// Array item is not a string.
    InvalidItem,
    /// Array item exceeds [`MAX_ITEM_BYTES`].
    ItemTooLarge,
    /// Array exceeds [`MAX_ARRAY_TOTAL_BYTES`] in total.
    TotalTooLarge,
    /// Field declares a type with no validator.
    UnknownType,
    /// A string leaf exceeds the per-field byte cap.
    FieldTooLarge,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FormMismatch => "form mismatch",
            Self::UnexpectedField => "unexpected field",
            Self::Missing => "missing",
            Self::TooShort => "too short",
            Self::TooLong => "too long",
            Self::InvalidEmail => "invalid email",
            Self::InvalidPhone => "invalid phone",
            Self::InvalidDate => "invalid date",
            Self::InvalidTime => "invalid time",
            Self::InvalidOption => "invalid option",
            Self::InvalidType => "invalid type",
            Self::TooManyItems => "too many items",
            Self::InvalidItem => "invalid item",
            Self::ItemTooLarge => "item too large",
            Self::TotalTooLarge => "total too large",
            Self::UnknownType => "unknown type",
            Self::FieldTooLarge => "field too large",
        };
        f.write_str(label)
    }
}

/// Validates a sanitized submission against a schema.
///
/// The output map holds exactly the schema's field names: optional fields that
/// were missing or empty are filled with `""` (or `[]` for array types).
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered:
/// 1. `form_name` differs from [`FormSchema::form`]
/// 2. any submitted key is not declared
/// 3. per declared field, in schema order, the type-specific checks
///
/// # Examples
///
/// ```
/// use form_intake::{schema, validate, Tainted, ValidationErrorKind};
/// use serde_json::json;
///
/// let fields = json!({"Name": "Jo", "Email": "a@b.co", "What are you interested in?": "IT Support"});
/// let fields = fields.as_object().unwrap().clone();
///
/// let verified = validate("join", &schema::join(), Tainted::new(fields)).unwrap();
/// assert_eq!(verified.as_ref()["Services"], json!([]));
/// assert_eq!(verified.as_ref()["Comments"], json!(""));
///
/// let bad = json!({"Name": "Jo"}).as_object().unwrap().clone();
/// let err = validate("join", &schema::join(), Tainted::new(bad)).unwrap_err();
/// assert_eq!(err.kind(), ValidationErrorKind::Missing);
/// assert_eq!(err.to_string(), "missing: Email");
/// ```
pub fn validate(
    form_name: &str,
    schema: &FormSchema,
    fields: Tainted<FieldMap>,
) -> Result<Verified<FieldMap>, ValidationError> {
    if form_name != schema.form() {
        return Err(ValidationError::new(
            ValidationErrorKind::FormMismatch,
            form_name,
        ));
    }

    if let Some(name) = fields.peek().keys().find(|k| schema.field(k).is_none()) {
        return Err(ValidationError::new(
            ValidationErrorKind::UnexpectedField,
            name.as_str(),
        ));
    }

    let mut raw = fields.into_inner();
    let mut validated = FieldMap::new();

    for spec in schema.fields() {
        let value = raw.remove(&spec.name).unwrap_or(Value::Null);
        let checked = check_field(spec, value)?;
        validated.insert(spec.name.clone(), checked);
    }

    Ok(Verified::new_unchecked(validated))
}

/// Enforces a byte cap on every string leaf of a validated submission.
///
/// Runs after [`validate`] as a second, independent limit. Nested arrays and
/// objects are walked recursively; the error subject is the path to the
/// offending leaf (`Services[2]`, `Meta.note`).
///
/// # Errors
///
/// Returns [`ValidationErrorKind::FieldTooLarge`] for the first leaf whose
/// UTF-8 length exceeds `max_bytes`.
pub fn enforce_byte_limits(
    fields: &Verified<FieldMap>,
    max_bytes: usize,
) -> Result<(), ValidationError> {
    for (name, value) in fields.as_ref() {
        check_bytes(name, value, max_bytes)?;
    }
    Ok(())
}

fn check_bytes(path: &str, value: &Value, max_bytes: usize) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if s.len() > max_bytes => Err(ValidationError::new(
            ValidationErrorKind::FieldTooLarge,
            path,
        )),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_bytes(&format!("{path}[{i}]"), item, max_bytes)),
        Value::Object(map) => map
            .iter()
            .try_for_each(|(k, v)| check_bytes(&format!("{path}.{k}"), v, max_bytes)),
        _ => Ok(()),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_field(spec: &FieldSpec, value: Value) -> Result<Value, ValidationError> {
    if is_empty(&value) {
        if spec.required {
            return Err(fail(ValidationErrorKind::Missing, spec));
        }
        return Ok(if spec.field_type.is_array() {
            Value::Array(Vec::new())
        } else {
            Value::String(String::new())
        });
    }

    match &spec.field_type {
        FieldType::String => {
            let s = expect_string(spec, value)?;
            check_length(
                spec,
                &s,
                spec.min.unwrap_or(0),
                spec.max.unwrap_or(usize::MAX),
            )?;
            Ok(Value::String(s))
        }
        FieldType::Email => {
            let s = expect_string(spec, value)?;
            check_length(spec, &s, EMAIL_MIN_LEN, EMAIL_MAX_LEN)?;
            if !EMAIL.is_match(&s) {
                return Err(fail(ValidationErrorKind::InvalidEmail, spec));
            }
            Ok(Value::String(s))
        }
        FieldType::Phone => {
            let s = expect_string(spec, value)?;
            check_length(spec, &s, 0, spec.max.unwrap_or(usize::MAX))?;
            if !PHONE.is_match(&s) {
                return Err(fail(ValidationErrorKind::InvalidPhone, spec));
            }
            Ok(Value::String(s))
        }
        FieldType::Date => {
            let s = expect_string(spec, value)?;
            let calendar_valid = NaiveDate::parse_from_str(&s, "%Y-%m-%d").is_ok();
            if !DATE.is_match(&s) || !calendar_valid {
                return Err(fail(ValidationErrorKind::InvalidDate, spec));
            }
            Ok(Value::String(s))
        }
        FieldType::Time => {
            let s = expect_string(spec, value)?;
            if !TIME.is_match(&s) {
                return Err(fail(ValidationErrorKind::InvalidTime, spec));
            }
            Ok(Value::String(s))
        }
        FieldType::Enum => {
            let s = expect_string(spec, value)?;
            if !spec.options.iter().any(|o| *o == s) {
                return Err(fail(ValidationErrorKind::InvalidOption, spec));
            }
            Ok(Value::String(s))
        }
        FieldType::StrArrayCapped => check_capped_array(spec, value),
        FieldType::Unknown(name) => Err(ValidationError::new(
            ValidationErrorKind::UnknownType,
            name.as_str(),
        )),
    }
}

fn check_capped_array(spec: &FieldSpec, value: Value) -> Result<Value, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        // A single checkbox posts a bare string.
        Value::String(s) => vec![Value::String(s)],
        _ => return Err(fail(ValidationErrorKind::InvalidType, spec)),
    };

    if items.len() > MAX_ARRAY_ITEMS {
        return Err(fail(ValidationErrorKind::TooManyItems, spec));
    }

    let mut total = 0usize;
    for (i, item) in items.iter().enumerate() {
        let Value::String(s) = item else {
            return Err(fail_at(ValidationErrorKind::InvalidItem, spec, i));
        };
        if s.len() > MAX_ITEM_BYTES {
            return Err(fail_at(ValidationErrorKind::ItemTooLarge, spec, i));
        }
        total += s.len();
        if total > MAX_ARRAY_TOTAL_BYTES {
            return Err(fail(ValidationErrorKind::TotalTooLarge, spec));
        }
    }

    Ok(Value::Array(items))
}

fn expect_string(spec: &FieldSpec, value: Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(fail(ValidationErrorKind::InvalidType, spec)),
    }
}

fn check_length(spec: &FieldSpec, s: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = s.chars().count();
    if len < min {
        return Err(fail(ValidationErrorKind::TooShort, spec));
    }
    if len > max {
        return Err(fail(ValidationErrorKind::TooLong, spec));
    }
    Ok(())
}

fn fail(kind: ValidationErrorKind, spec: &FieldSpec) -> ValidationError {
    ValidationError::new(kind, spec.name.as_str())
}

fn fail_at(kind: ValidationErrorKind, spec: &FieldSpec, index: usize) -> ValidationError {
    ValidationError::new(kind, format!("{}[{}]", spec.name, index))
}
