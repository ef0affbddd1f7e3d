use std::fmt;
use thiserror::Error;

/// Set of JSON pointers selecting fields of an entity, e.g. `attributes,features(a,b)`.
///
/// Parenthesised groups expand against their prefix, so `features(a,b/c)` selects
/// `features/a` and `features/b/c`. Pointers are kept without a leading `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    pointers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldSelectorError {
    #[error("field selector must select at least one field")]
    Empty,
    #[error("field selector `{0}` has unbalanced parentheses")]
    Unbalanced(String),
    #[error("field selector `{0}` continues after a closing parenthesis")]
    TrailingGroupSuffix(String),
}

impl FieldSelector {
    pub fn parse(raw: &str) -> Result<Self, FieldSelectorError> {
        let mut pointers = Vec::new();
        let mut cursor = Cursor {
            raw,
            chars: raw.char_indices().peekable(),
        };
        cursor.parse_list("", 0, &mut pointers)?;

        let mut unique = Vec::with_capacity(pointers.len());
        for pointer in pointers {
            if !unique.contains(&pointer) {
                unique.push(pointer);
            }
        }

        if unique.is_empty() {
            return Err(FieldSelectorError::Empty);
        }
        Ok(Self { pointers: unique })
    }

    pub fn pointers(&self) -> &[String] {
        &self.pointers
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pointers.join(","))
    }
}

struct Cursor<'a> {
    raw: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Cursor<'_> {
    /// Reads comma separated entries until the input ends (depth 0) or a matching `)`.
    fn parse_list(
        &mut self,
        prefix: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) -> Result<(), FieldSelectorError> {
        let mut current = String::new();

        while let Some((_, ch)) = self.chars.next() {
            match ch {
                ',' => push_pointer(prefix, &current, out),
                '(' => {
                    let group_prefix = join(prefix, &current);
                    self.parse_list(&group_prefix, depth + 1, out)?;
                    current.clear();
                    match self.chars.peek() {
                        None => return self.finish(depth),
                        Some((_, ',')) => {
                            self.chars.next();
                        }
                        Some((_, ')')) => {}
                        Some(_) => {
                            return Err(FieldSelectorError::TrailingGroupSuffix(
                                self.raw.to_string(),
                            ))
                        }
                    }
                    continue;
                }
                ')' => {
                    if depth == 0 {
                        return Err(FieldSelectorError::Unbalanced(self.raw.to_string()));
                    }
                    push_pointer(prefix, &current, out);
                    return Ok(());
                }
                other => {
                    current.push(other);
                    continue;
                }
            }
            current.clear();
        }

        push_pointer(prefix, &current, out);
        self.finish(depth)
    }

    fn finish(&self, depth: usize) -> Result<(), FieldSelectorError> {
        if depth == 0 {
            Ok(())
        } else {
            Err(FieldSelectorError::Unbalanced(self.raw.to_string()))
        }
    }
}

fn join(prefix: &str, segment: &str) -> String {
    let segment = segment.trim().trim_matches('/');
    match (prefix.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{segment}"),
    }
}

fn push_pointer(prefix: &str, segment: &str, out: &mut Vec<String>) {
    if segment.trim().trim_matches('/').is_empty() {
        return;
    }
    out.push(join(prefix, segment));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_list_strips_leading_slashes() {
        let selector = FieldSelector::parse("/attributes, features/location").expect("selector");
        assert_eq!(selector.pointers(), ["attributes", "features/location"]);
        assert_eq!(selector.to_string(), "attributes,features/location");
    }

    #[test]
    fn groups_expand_against_prefix() {
        let selector =
            FieldSelector::parse("thingId,features(temp(value,unit),humidity)").expect("selector");
        assert_eq!(
            selector.pointers(),
            [
                "thingId",
                "features/temp/value",
                "features/temp/unit",
                "features/humidity"
            ]
        );
    }

    #[test]
    fn rejects_unbalanced_and_empty_input() {
        assert!(matches!(
            FieldSelector::parse("features(a"),
            Err(FieldSelectorError::Unbalanced(_))
        ));
        assert!(matches!(
            FieldSelector::parse("a)"),
            Err(FieldSelectorError::Unbalanced(_))
        ));
        assert_eq!(FieldSelector::parse(" , "), Err(FieldSelectorError::Empty));
        assert!(matches!(
            FieldSelector::parse("features(a)b"),
            Err(FieldSelectorError::TrailingGroupSuffix(_))
        ));
    }
}
