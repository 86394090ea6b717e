use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::validator::FieldMap;
use crate::Verified;

/// Schema tag carried by every envelope.
pub const ENVELOPE_SCHEMA: &str = "ops.v1";

/// The normalized unit an intake handler relays downstream.
///
/// Built only from [`Verified`] fields, so an envelope always satisfies its
/// form's schema. Fields are private; the wire shape is
/// `{schema, submitted_at, asset_id, form, fields}`.
///
/// # Examples
///
/// ```
/// use form_intake::{schema, validate, Envelope, Tainted};
/// use serde_json::json;
///
/// let raw = json!({"Name": "Jo", "Email": "a@b.co", "Comments": "hi"});
/// let fields = validate("contact", &schema::contact(), Tainted::new(raw.as_object().unwrap().clone()))
///     .unwrap();
///
/// let envelope = Envelope::build("site-01", "contact", fields);
/// let wire = serde_json::to_value(&envelope).unwrap();
///
/// assert_eq!(wire["schema"], "ops.v1");
/// assert_eq!(wire["asset_id"], "site-01");
/// assert_eq!(wire["fields"]["Name"], "Jo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    schema: String,
    submitted_at: String,
    asset_id: String,
    form: String,
    fields: FieldMap,
}

impl Envelope {
    /// Builds an envelope stamped with the current UTC time.
    pub fn build(asset_id: &str, form: &str, fields: Verified<FieldMap>) -> Self {
        Self::build_at(Utc::now(), asset_id, form, fields)
    }

    /// Builds an envelope with an explicit submission time.
    pub fn build_at(
        submitted_at: DateTime<Utc>,
        asset_id: &str,
        form: &str,
        fields: Verified<FieldMap>,
    ) -> Self {
        Self {
            schema: ENVELOPE_SCHEMA.to_string(),
            submitted_at: submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            asset_id: asset_id.to_string(),
            form: form.to_string(),
            fields: fields.into_inner(),
        }
    }

    /// Schema tag (`ops.v1`).
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// ISO-8601 submission timestamp.
    pub fn submitted_at(&self) -> &str {
        &self.submitted_at
    }

    /// Identifier of the site that received the submission.
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Form identity.
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Validated fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}
