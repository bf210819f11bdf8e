//! Pattern compiler
//! ----------------
//! Turns a regex with named groups (`(?P<name>body)`) into a display/expansion template.
//! The token emitted for each group is decided by a table keyed on the group name, so
//! new kinds can introduce new group names without touching the scanner.

use std::collections::HashMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRole {
    /// Year/month/day, rendered zero-padded to the body's exact quantifier.
    DateComponent,
    /// Either extension alternative; both collapse to `{extension}`.
    ExtensionAlias,
    /// Fixed file-name prefix; the body is emitted verbatim.
    LiteralCode,
    Generic,
}

static GROUP_ROLES: Lazy<HashMap<&'static str, GroupRole>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for name in ["location_year", "location_month", "location_day", "name_year", "name_month", "name_day"] {
        m.insert(name, GroupRole::DateComponent);
    }
    m.insert("ext_versioned", GroupRole::ExtensionAlias);
    m.insert("ext_excel", GroupRole::ExtensionAlias);
    m.insert("code", GroupRole::LiteralCode);
    m
});

static EXACT_QUANTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([0-9]+)\}").expect("quantifier regex"));

pub fn role_of(group: &str) -> GroupRole {
    GROUP_ROLES.get(group).copied().unwrap_or(GroupRole::Generic)
}

/// One `(?P<name>body)` occurrence; `span` covers the whole construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedGroup<'a> {
    pub name: &'a str,
    pub body: &'a str,
    pub span: Range<usize>,
}

/// First `{N}` quantifier inside a group body.
pub fn exact_width(body: &str) -> Option<usize> {
    EXACT_QUANTIFIER.captures(body).and_then(|c| c[1].parse().ok())
}

/// Outermost named groups in source order. Escapes and character classes are skipped so a
/// `\(` or `[()]` never opens or closes a group. An unterminated group ends the scan.
pub fn named_groups(pattern: &str) -> Vec<NamedGroup<'_>> {
    let bytes = pattern.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => i = skip_class(bytes, i),
            b'(' => {
                let Some(name_start) = named_group_prefix(bytes, i) else { i += 1; continue };
                let Some(name_len) = pattern[name_start..].find('>') else { break };
                let body_start = name_start + name_len + 1;
                let Some(end) = closing_paren(bytes, body_start) else { break };
                out.push(NamedGroup { name: &pattern[name_start..name_start + name_len], body: &pattern[body_start..end], span: i..end + 1 });
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    out
}

/// Replace every named group with its template token; everything else passes through.
pub fn pattern_to_template(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut last = 0;
    for g in named_groups(pattern) {
        out.push_str(&pattern[last..g.span.start]);
        match role_of(g.name) {
            GroupRole::DateComponent => match exact_width(g.body) {
                Some(w) => out.push_str(&format!("{{{}:0{}}}", g.name, w)),
                None => out.push_str(&format!("{{{}}}", g.name)),
            },
            GroupRole::ExtensionAlias => out.push_str("{extension}"),
            GroupRole::LiteralCode => out.push_str(g.body),
            GroupRole::Generic => out.push_str(&format!("{{{}}}", g.name)),
        }
        last = g.span.end;
    }
    out.push_str(&pattern[last..]);
    out
}

// `(?P<name>` or `(?<name>`; returns the index where the name starts.
fn named_group_prefix(bytes: &[u8], open: usize) -> Option<usize> {
    let rest = &bytes[open..];
    if rest.starts_with(b"(?P<") {
        return Some(open + 4);
    }
    if rest.starts_with(b"(?<") && rest.get(3).is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_') {
        return Some(open + 3);
    }
    None
}

fn skip_class(bytes: &[u8], open: usize) -> usize {
    let mut i = open + 1;
    if bytes.get(i) == Some(&b'^') { i += 1; }
    if bytes.get(i) == Some(&b']') { i += 1; }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' if bytes.get(i + 1) == Some(&b':') => {
                // POSIX class like [:alpha:]
                i = match bytes[i + 2..].windows(2).position(|w| w == b":]") {
                    Some(p) => i + 2 + p + 2,
                    None => i + 1,
                };
            }
            b'[' => i = skip_class(bytes, i),
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn closing_paren(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => { i += 2; continue; }
            b'[' => { i = skip_class(bytes, i); continue; }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 { return Some(i); }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_components_carry_width() {
        assert_eq!(pattern_to_template("(?P<location_month>[0-9]{2})"), "{location_month:02}");
        assert_eq!(pattern_to_template("(?P<name_year>[0-9]{4})"), "{name_year:04}");
        assert_eq!(pattern_to_template("(?P<name_day>[0-9]+)"), "{name_day}");
    }

    #[test]
    fn extension_aliases_collapse() {
        assert_eq!(pattern_to_template("(?P<ext_excel>xlsx)"), "{extension}");
        assert_eq!(pattern_to_template("(?P<ext_versioned>xlsx)"), "{extension}");
    }

    #[test]
    fn full_name_pattern() {
        let p = "(?P<code>adem)(?P<name_month>[0-9]{2})(?P<name_day>[0-9]{2}).(?P<ext_versioned>[a-zA-Z0-9]+)";
        assert_eq!(pattern_to_template(p), "adem{name_month:02}{name_day:02}.{extension}");
    }

    #[test]
    fn generic_and_literal_groups() {
        let p = "(?P<name_agent>[a-zA-Z]{4})_(?P<code>fronterascomerciales)_(?P<name_day>[0-9]{2})-(?P<name_month>[0-9]{2})-(?P<name_year>[0-9]{4}).(?P<ext_excel>xlsx)";
        assert_eq!(pattern_to_template(p), "{name_agent}_fronterascomerciales_{name_day:02}-{name_month:02}-{name_year:04}.{extension}");
        assert_eq!(pattern_to_template("(?P<code>[a-zA-Z0-9-_]*)x"), "[a-zA-Z0-9-_]*x");
    }

    #[test]
    fn location_pattern() {
        let p = "/USUARIOSK/(?P<location_agent>[a-zA-Z0-9]{3,4})/SIC/COMERCIA/(?P<location_year>[0-9]{4})-(?P<location_month>[0-9]{2})/";
        assert_eq!(pattern_to_template(p), "/USUARIOSK/{location_agent}/SIC/COMERCIA/{location_year:04}-{location_month:02}/");
    }

    #[test]
    fn no_groups_is_identity() {
        assert_eq!(pattern_to_template("/PUBLICOK/SIC/"), "/PUBLICOK/SIC/");
        assert_eq!(pattern_to_template(r"a\(b\)[(]"), r"a\(b\)[(]");
    }

    #[test]
    fn nested_parens_and_classes_inside_body() {
        let groups = named_groups(r"(?P<code>(?:adem|aenc))(?P<name_month>[)0-9]{2})x");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].body, "(?:adem|aenc)");
        assert_eq!(groups[1].body, "[)0-9]{2}");
        assert_eq!(exact_width(groups[1].body), Some(2));
    }

    #[test]
    fn roles_are_table_driven() {
        assert_eq!(role_of("name_month"), GroupRole::DateComponent);
        assert_eq!(role_of("ext_excel"), GroupRole::ExtensionAlias);
        assert_eq!(role_of("code"), GroupRole::LiteralCode);
        assert_eq!(role_of("location_agent"), GroupRole::Generic);
    }
}
