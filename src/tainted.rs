use std::fmt;

/// A wrapper for untrusted data received over the wire.
///
/// `Tainted<T>` marks a submission (or any part of one) that has not yet been
/// validated against a form schema. The value cannot be read back out by code
/// outside this crate; the only way forward is [`validate`](crate::validate),
/// which produces a [`Verified`](crate::Verified) value.
///
/// Sanitization does not remove taint. A sanitized submission is still
/// untyped and unchecked, so [`Tainted::map`] keeps the wrapper in place.
///
/// # Examples
///
/// ```
/// use form_intake::Tainted;
/// use serde_json::json;
///
/// let body = Tainted::new(json!({"Name": "<b>Jo</b>"}));
/// assert!(format!("{body:?}").starts_with("Tainted"));
/// ```
///
/// ```compile_fail
/// use form_intake::Tainted;
/// use serde_json::json;
///
/// let body = Tainted::new(json!({"Name": "Jo"}));
/// let name = body.into_inner();
/// ```
#[derive(Clone, PartialEq)]
pub struct Tainted<T> {
    // Private: a public field would let unvalidated input reach an envelope.
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value in `Tainted`.
    ///
    /// Use this for anything parsed from a request body, header or path.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Transforms the wrapped value while keeping it tainted.
    ///
    /// ```
    /// use form_intake::{sanitize, Tainted};
    /// use serde_json::json;
    ///
    /// let raw = Tainted::new(json!(" <i>hi</i> "));
    /// let cleaned = raw.map(|v| sanitize(&v));
    /// assert_eq!(cleaned, Tainted::new(json!("hi")));
    /// ```
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Tainted<U> {
        Tainted::new(f(self.inner))
    }

    /// Borrows the inner value for inspection by validators in this crate.
    pub(crate) fn peek(&self) -> &T {
        &self.inner
    }

    /// Mutable access for in-place stripping of fields that never reach
    /// validation.
    pub(crate) fn peek_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Extracts the inner value for validation.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

// No Deref, AsRef, Borrow or From/Into: reading requires crate access.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn debug_marks_value_as_tainted() {
        let comment = Tainted::new("<script>x</script>".to_string());
        let debug_output = format!("{comment:?}");

        assert!(debug_output.starts_with("Tainted"));
        assert!(debug_output.contains("<script>"));
    }

    #[test]
    fn peek_mut_strips_in_place() {
        let mut fields = Tainted::new(json!({"Name": "Jo", "website": ""}));
        fields.peek_mut().as_object_mut().unwrap().remove("website");

        assert_eq!(fields.into_inner(), json!({"Name": "Jo"}));
    }

    #[test]
    fn map_keeps_taint() {
        let tainted = Tainted::new(json!({"a": 1}));
        let mapped = tainted.map(|v| v["a"].clone());

        assert_eq!(mapped.into_inner(), json!(1));
    }

    #[test]
    fn peek_does_not_consume() {
        let tainted = Tainted::new(vec![1, 2, 3]);

        assert_eq!(tainted.peek().len(), 3);
        assert_eq!(tainted.into_inner(), vec![1, 2, 3]);
    }

    mod proptests {
        use super::*;
        use crate::{sanitizer::sanitize, test_utils::arb_plain_text};
        use proptest::prelude::*;

        proptest! {
            /// Property: mapping plain text through sanitize only trims it
            #[test]
            fn proptest_map_sanitize_on_plain_text(input in arb_plain_text(256)) {
                let cleaned = Tainted::new(json!(input)).map(|v| sanitize(&v)).into_inner();

                prop_assert_eq!(cleaned, json!(input.trim()));
            }
        }
    }
}
