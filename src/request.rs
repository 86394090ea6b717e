/// Metadata about an incoming request.
///
/// Built once at the edge by [`crate::web::ExtractMetadata`] and threaded
/// through a handler explicitly; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// Unique identifier for this request, propagated downstream as
    /// `x-request-id`
    pub request_id: String,
    /// Value of the `Origin` header, if any
    pub origin: Option<String>,
}

impl RequestMeta {
    /// Creates metadata with no origin.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            origin: None,
        }
    }

    /// Sets the origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}
