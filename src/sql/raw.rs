use crate::core::Value;
use serde::{Deserialize, Serialize};

/// How a raw predicate joins the field-map predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Extra predicate written against field names.
///
/// `.field` refers to a record field and `?` to the next argument:
/// `".age > ? OR .name = ?"` with `[30, "Ann"]`. Text inside single quotes
/// is copied as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilter {
    pub predicate: String,
    pub args: Vec<Value>,
    #[serde(default)]
    pub conjunction: Conjunction,
}

/// Token of a raw predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPart<'a> {
    Text(&'a str),
    Field(&'a str),
    Param,
}

impl RawFilter {
    pub fn new(predicate: &str, args: Vec<Value>) -> Self {
        Self {
            predicate: predicate.to_string(),
            args,
            conjunction: Conjunction::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.conjunction = Conjunction::Or;
        self
    }

    pub fn parts(&self) -> Vec<RawPart<'_>> {
        let src = self.predicate.as_str();
        let bytes = src.as_bytes();
        let mut parts = Vec::new();
        let mut text_start = 0;
        let mut in_quote = false;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\'' {
                in_quote = !in_quote;
                i += 1;
                continue;
            }
            if in_quote {
                i += 1;
                continue;
            }

            if b == b'?' {
                if text_start < i {
                    parts.push(RawPart::Text(&src[text_start..i]));
                }
                parts.push(RawPart::Param);
                i += 1;
                text_start = i;
                continue;
            }

            let starts_ident = bytes
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == b'_');
            let after_word = i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
            if b == b'.' && starts_ident && !after_word {
                if text_start < i {
                    parts.push(RawPart::Text(&src[text_start..i]));
                }
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                parts.push(RawPart::Field(&src[start..end]));
                i = end;
                text_start = i;
                continue;
            }

            i += 1;
        }

        if text_start < bytes.len() {
            parts.push(RawPart::Text(&src[text_start..]));
        }
        parts
    }

    pub fn fields(&self) -> Vec<&str> {
        self.parts()
            .into_iter()
            .filter_map(|p| match p {
                RawPart::Field(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn placeholder_count(&self) -> usize {
        self.parts()
            .iter()
            .filter(|p| matches!(p, RawPart::Param))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_split_fields_and_params() {
        let raw = RawFilter::new(".age > ? OR .name = ?", vec![]);
        assert_eq!(
            raw.parts(),
            vec![
                RawPart::Field("age"),
                RawPart::Text(" > "),
                RawPart::Param,
                RawPart::Text(" OR "),
                RawPart::Field("name"),
                RawPart::Text(" = "),
                RawPart::Param,
            ]
        );
        assert_eq!(raw.fields(), vec!["age", "name"]);
        assert_eq!(raw.placeholder_count(), 2);
    }

    #[test]
    fn test_quoted_text_and_decimals_untouched() {
        let raw = RawFilter::new(".name <> 'a.b?' AND 1.5 < .score", vec![]);
        assert_eq!(raw.fields(), vec!["name", "score"]);
        assert_eq!(raw.placeholder_count(), 0);
    }
}
