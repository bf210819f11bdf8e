//! Extension registry: maps a published extension (`.tx2`, `.txf`, ...) to the normalized
//! revision code used to rank successive settlements of the same file.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{read_jsonl, ValidationRules};
use crate::error::{AsicError, AsicResult};

static EXTENSION_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.[a-zA-Z0-9]*$").expect("extension shape regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    #[serde(rename = "asic_extension")]
    pub extension: String,
    pub normalized_version: String,
    pub order: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    by_extension: HashMap<String, ExtensionEntry>,
}

impl ExtensionRegistry {
    /// Parse line-delimited `{asic_extension, normalized_version, order}` records.
    pub fn from_jsonl(source_name: &str, text: &str, rules: &ValidationRules) -> AsicResult<Self> {
        let records: Vec<(usize, ExtensionEntry)> = read_jsonl(source_name, text)?;
        Self::from_records(source_name, records, rules)
    }

    pub fn from_records(source_name: &str, records: Vec<(usize, ExtensionEntry)>, rules: &ValidationRules) -> AsicResult<Self> {
        let fail = |line: usize, message: String| AsicError::Config { source_name: source_name.to_string(), line, message };
        let mut by_extension = HashMap::with_capacity(records.len());
        for (line, mut entry) in records {
            if !EXTENSION_SHAPE.is_match(&entry.extension) {
                return Err(fail(line, format!("extension '{}' must look like '.xxx'", entry.extension)));
            }
            if !rules.normalized_version.is_match(&entry.normalized_version) {
                return Err(fail(line, format!("normalized_version '{}' does not match {}", entry.normalized_version, rules.normalized_version.as_str())));
            }
            entry.extension = entry.extension.to_ascii_lowercase();
            if by_extension.contains_key(&entry.extension) {
                return Err(fail(line, format!("duplicate extension '{}'", entry.extension)));
            }
            by_extension.insert(entry.extension.clone(), entry);
        }
        Ok(Self { by_extension })
    }

    /// Case-insensitive lookup of a dotted extension.
    pub fn lookup(&self, extension: &str) -> AsicResult<&ExtensionEntry> {
        let key = extension.to_ascii_lowercase();
        self.by_extension.get(&key).ok_or(AsicError::UnsupportedExtension { extension: key })
    }

    /// Turn user input such as `TX2`, `.Tx2` into the registered key.
    pub fn normalize(&self, input: &str) -> AsicResult<String> {
        let trimmed = input.trim().to_ascii_lowercase();
        let dotted = if trimmed.starts_with('.') { trimmed } else { format!(".{trimmed}") };
        match self.by_extension.get(&dotted) {
            Some(e) => Ok(e.extension.clone()),
            None => Err(AsicError::invalid("extension", input, "not a published settlement extension")),
        }
    }

    pub fn order_of(&self, extension: &str) -> Option<i64> {
        self.by_extension.get(&extension.to_ascii_lowercase()).map(|e| e.order)
    }

    /// Entries sorted by revision order.
    pub fn entries(&self) -> Vec<&ExtensionEntry> {
        let mut v: Vec<&ExtensionEntry> = self.by_extension.values().collect();
        v.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.extension.cmp(&b.extension)));
        v
    }

    pub fn len(&self) -> usize { self.by_extension.len() }
    pub fn is_empty(&self) -> bool { self.by_extension.is_empty() }
}
