use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form hints forwarded verbatim to the assistant backend.
///
/// The backend decides what to do with these; the client does not validate
/// keys or values. Convenience setters exist for the hints the locator UI
/// collects, and `insert` accepts anything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct QueryContext {
    entries: Map<String, Value>,
}

impl QueryContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an arbitrary key/value pair (builder pattern).
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Set the caller's location hint, e.g. a city or zip code.
    pub fn with_location(self, location: impl Into<String>) -> Self {
        self.insert("location", location.into())
    }

    /// Set a previously recorded diagnosis.
    pub fn with_diagnosis(self, diagnosis: impl Into<String>) -> Self {
        self.insert("diagnosis", diagnosis.into())
    }

    /// Set the therapy type the caller expressed interest in.
    pub fn with_therapy_interest(self, therapy: impl Into<String>) -> Self {
        self.insert("therapyInterest", therapy.into())
    }

    /// Whether any hints have been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Request body shared by the streaming and fallback ask endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskRequest {
    /// The natural-language question
    pub query: String,
    /// Optional opaque context hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<QueryContext>,
}

impl AskRequest {
    /// Create a request with no context.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
        }
    }

    /// Attach context hints (builder pattern).
    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Complete answer from the non-streaming fallback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    /// The full answer text
    pub answer: String,
    /// Provider names cited in the answer
    #[serde(default)]
    pub referenced_entities: Vec<String>,
    /// Regional center matched for the caller, when one was found
    #[serde(default)]
    pub matched_region: Option<String>,
}

/// Error body the backend returns alongside a failure status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}
