//! Keyword-substitution templates produced by the pattern compiler.
//! Placeholders are `{name}` or `{name:0W}`; anything else between braces
//! (for example a regex quantifier copied from a literal code body) is kept as text.

use std::collections::HashMap;
use std::fmt;

use crate::error::{AsicError, AsicResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, width: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Int(i64),
    Str(String),
}

impl From<i32> for TemplateValue { fn from(v: i32) -> Self { TemplateValue::Int(v as i64) } }
impl From<u32> for TemplateValue { fn from(v: u32) -> Self { TemplateValue::Int(v as i64) } }
impl From<&str> for TemplateValue { fn from(v: &str) -> Self { TemplateValue::Str(v.to_string()) } }
impl From<String> for TemplateValue { fn from(v: String) -> Self { TemplateValue::Str(v) } }

pub type TemplateValues = HashMap<String, TemplateValue>;

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| parse_placeholder(&after[..close]).map(|p| (close, p))) {
                Some((close, placeholder)) => {
                    if !literal.is_empty() { segments.push(Segment::Literal(std::mem::take(&mut literal))); }
                    segments.push(placeholder);
                    rest = &after[close + 1..];
                }
                None => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() { segments.push(Segment::Literal(literal)); }
        Self { source: source.to_string(), segments }
    }

    pub fn as_str(&self) -> &str { &self.source }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder. A placeholder without a value is an error naming it.
    pub fn render(&self, values: &TemplateValues) -> AsicResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder { name, width } => {
                    let value = values.get(name).ok_or_else(|| AsicError::Template { template: self.source.clone(), placeholder: name.clone() })?;
                    match (value, width) {
                        (TemplateValue::Int(n), Some(w)) => out.push_str(&format!("{:0w$}", n, w = *w)),
                        (TemplateValue::Int(n), None) => out.push_str(&n.to_string()),
                        (TemplateValue::Str(s), _) => out.push_str(s),
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.source) }
}

fn parse_placeholder(inner: &str) -> Option<Segment> {
    let (name, spec) = match inner.split_once(':') {
        Some((n, s)) => (n, Some(s)),
        None => (inner, None),
    };
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let width = match spec {
        None => None,
        // `02` parses as width 2; the leading zero is the fill flag
        Some(s) => Some(s.parse::<usize>().ok()?),
    };
    Some(Segment::Placeholder { name: name.to_string(), width })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, TemplateValue)]) -> TemplateValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn renders_padded_ints() {
        let t = Template::parse("/PUBLICOK/SIC/COMERCIA/{location_year:04}-{location_month:02}/");
        let v = values(&[("location_year", 2023.into()), ("location_month", 3u32.into())]);
        assert_eq!(t.render(&v).unwrap(), "/PUBLICOK/SIC/COMERCIA/2023-03/");
        assert_eq!(t.placeholders().collect::<Vec<_>>(), vec!["location_year", "location_month"]);
    }

    #[test]
    fn missing_value_names_placeholder() {
        let t = Template::parse("/USUARIOSK/{location_agent}/SIC/");
        match t.render(&TemplateValues::new()) {
            Err(AsicError::Template { placeholder, .. }) => assert_eq!(placeholder, "location_agent"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_identifier_braces_are_literal() {
        let t = Template::parse("x[0-9]{2}{name}");
        assert_eq!(t.placeholders().count(), 1);
        let v = values(&[("name", "abc".into())]);
        assert_eq!(t.render(&v).unwrap(), "x[0-9]{2}abc");
        assert_eq!(Template::parse("{unterminated").render(&TemplateValues::new()).unwrap(), "{unterminated");
    }

    #[test]
    fn strings_ignore_width() {
        let t = Template::parse("{a:04}");
        assert_eq!(t.render(&values(&[("a", "x".into())])).unwrap(), "x");
    }
}
