use super::{FieldSelector, FieldSelectorError, Topic};
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const NAMESPACES_PARAM: &str = "namespaces";
const FILTER_PARAM: &str = "filter";
const EXTRA_FIELDS_PARAM: &str = "extraFields";

/// Characters that would otherwise change how the query string splits or decodes.
const RESERVED: &AsciiSet = &CONTROLS.add(b'%').add(b'&').add(b'+');

/// A [`Topic`] narrowed by namespaces, an RQL filter and extra fields to enrich with.
///
/// Instances only exist through [`FilteredTopicBuilder`], so components a topic does not
/// support are never present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilteredTopic {
    topic: Topic,
    namespaces: Vec<String>,
    filter: Option<String>,
    extra_fields: Option<FieldSelector>,
}

impl FilteredTopic {
    pub fn builder(topic: Topic) -> FilteredTopicBuilder {
        FilteredTopicBuilder {
            inner: FilteredTopic {
                topic,
                namespaces: Vec::new(),
                filter: None,
                extra_fields: None,
            },
        }
    }

    pub fn of(topic: Topic) -> Self {
        Self::builder(topic).build()
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn extra_fields(&self) -> Option<&FieldSelector> {
        self.extra_fields.as_ref()
    }

    pub fn to_builder(&self) -> FilteredTopicBuilder {
        FilteredTopicBuilder {
            inner: self.clone(),
        }
    }

    /// Unknown query keys and pairs without `=` are skipped.
    pub fn parse(raw: &str) -> Result<Self, TopicParseError> {
        let (topic_name, query) = match raw.split_once('?') {
            Some((topic_name, query)) => (topic_name, Some(query)),
            None => (raw, None),
        };

        let topic = Topic::from_name(topic_name.trim()).ok_or_else(|| {
            TopicParseError::UnknownTopic {
                input: raw.to_string(),
                hint: supported_topics_hint(),
            }
        })?;

        let mut builder = Self::builder(topic);
        for pair in query.into_iter().flat_map(|query| query.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = decode_component(value);
            match key {
                NAMESPACES_PARAM => {
                    builder = builder.with_namespaces([value]);
                }
                FILTER_PARAM => {
                    builder = builder.with_filter(value);
                }
                EXTRA_FIELDS_PARAM => {
                    if !value.trim().is_empty() {
                        let selector = FieldSelector::parse(&value).map_err(|source| {
                            TopicParseError::InvalidExtraFields {
                                input: raw.to_string(),
                                source,
                            }
                        })?;
                        builder = builder.with_extra_fields(selector);
                    }
                }
                unknown => {
                    debug!(
                        target = "topic.codec",
                        event = "unknown_query_key_ignored",
                        topic = topic.name(),
                        key = unknown,
                    );
                }
            }
        }

        Ok(builder.build())
    }
}

impl fmt::Display for FilteredTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(
            self.topic,
            &self.namespaces,
            self.filter.as_deref(),
            self.extra_fields.as_ref(),
        ))
    }
}

impl FromStr for FilteredTopic {
    type Err = TopicParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Renders `<topic>[?namespaces=..&filter=..&extraFields=..]`, skipping empty components.
pub fn encode<S: AsRef<str>>(
    topic: Topic,
    namespaces: &[S],
    filter: Option<&str>,
    extra_fields: Option<&FieldSelector>,
) -> String {
    let mut params = Vec::with_capacity(3);

    let namespaces = namespaces
        .iter()
        .map(AsRef::as_ref)
        .filter(|namespace| !namespace.is_empty())
        .map(encode_component)
        .collect::<Vec<_>>();
    if !namespaces.is_empty() {
        params.push(format!("{NAMESPACES_PARAM}={}", namespaces.join(",")));
    }
    if let Some(filter) = filter.filter(|filter| !filter.is_empty()) {
        params.push(format!("{FILTER_PARAM}={}", encode_component(filter)));
    }
    if let Some(selector) = extra_fields {
        params.push(format!(
            "{EXTRA_FIELDS_PARAM}={}",
            encode_component(&selector.to_string())
        ));
    }

    if params.is_empty() {
        topic.name().to_string()
    } else {
        format!("{}?{}", topic.name(), params.join("&"))
    }
}

/// Only reserved ASCII is escaped; other characters, non-ASCII included, stay literal.
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii() {
            encoded.extend(percent_encode(&[ch as u8], RESERVED));
        } else {
            encoded.push(ch);
        }
    }
    encoded
}

/// Form decoding: `+` is a space, then percent escapes are resolved.
fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn supported_topics_hint() -> String {
    let names = Topic::ALL
        .iter()
        .map(|topic| topic.name())
        .collect::<Vec<_>>()
        .join(", ");
    format!("supported topics are: {names}")
}

/// Accumulates refinements; calls a topic does not support leave the builder unchanged.
#[derive(Debug, Clone)]
pub struct FilteredTopicBuilder {
    inner: FilteredTopic,
}

impl FilteredTopicBuilder {
    /// Each value may hold several comma separated namespaces; entries are trimmed and
    /// empty ones dropped, matching how the rendered query is read back.
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.inner.topic.supports_namespaces() {
            self.inner.namespaces = namespaces
                .into_iter()
                .flat_map(|value| {
                    value
                        .as_ref()
                        .split(',')
                        .map(str::trim)
                        .filter(|namespace| !namespace.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        if self.inner.topic.supports_filter() {
            let filter = filter.into();
            self.inner.filter = (!filter.is_empty()).then_some(filter);
        }
        self
    }

    pub fn with_extra_fields(mut self, extra_fields: FieldSelector) -> Self {
        if self.inner.topic.supports_extra_fields() {
            self.inner.extra_fields = Some(extra_fields);
        }
        self
    }

    pub fn build(self) -> FilteredTopic {
        self.inner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicParseError {
    #[error("topic `{input}` is not valid: unknown topic name ({hint})")]
    UnknownTopic { input: String, hint: String },
    #[error("topic `{input}` has invalid extraFields: {source}")]
    InvalidExtraFields {
        input: String,
        #[source]
        source: FieldSelectorError,
    },
}

impl TopicParseError {
    pub fn error_code(&self) -> &'static str {
        "connectivity:topic.invalid"
    }

    pub fn input(&self) -> &str {
        match self {
            TopicParseError::UnknownTopic { input, .. }
            | TopicParseError::InvalidExtraFields { input, .. } => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_survive_encoding() {
        assert_eq!(encode_component("and(eq(a,1),gt(b,2))&x"), "and(eq(a,1),gt(b,2))%26x");
        assert_eq!(decode_component("a%2Bb+c%26d"), "a+b c&d");
    }

    #[test]
    fn non_ascii_is_kept_literal() {
        assert_eq!(encode_component("eq(city,\"Zürich\")\u{1}"), "eq(city,\"Zürich\")%01");
    }
}
