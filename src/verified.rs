/// Proof that a submission passed [`validate`](crate::validate).
///
/// Holds the schema-shaped field map: every declared field is present, every
/// undeclared one is gone, and each value has been type and length checked.
/// [`Envelope::build`](crate::Envelope::build) takes nothing else, so a
/// submission cannot be relayed without going through the validator.
///
/// Only the validator constructs it. There is no `Deref`, `Default` or
/// `Deserialize`; reading goes through [`AsRef`] or [`Verified::into_inner`].
///
/// ```compile_fail
/// use form_intake::Verified;
///
/// let forged = Verified::new(serde_json::Map::new());
/// ```
///
/// ```
/// use form_intake::{schema, validate, Tainted};
/// use serde_json::json;
///
/// let fields = json!({"Name": "Jo", "Email": "a@b.co", "Comments": "hello"});
/// let verified = validate(
///     "contact",
///     &schema::contact(),
///     Tainted::new(fields.as_object().unwrap().clone()),
/// )
/// .expect("valid submission");
///
/// assert_eq!(verified.as_ref()["Name"], "Jo");
/// assert_eq!(verified.as_ref()["Company"], "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Wraps a value the caller has already checked against a schema.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Returns the checked value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}
