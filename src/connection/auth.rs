use serde_json::Value as JsonValue;
use std::fmt;

/// Ordered subject ids a source or target acts on behalf of, e.g. `integration:sensors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuthorizationContext {
    subjects: Vec<String>,
}

impl AuthorizationContext {
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: subjects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::from(self.subjects.clone())
    }
}

impl From<Vec<String>> for AuthorizationContext {
    fn from(subjects: Vec<String>) -> Self {
        Self { subjects }
    }
}

impl fmt::Display for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.subjects.join(", "))
    }
}
