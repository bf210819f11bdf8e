//! File-kind descriptors and the ordered registry that classification walks.
//! ------------------------------------------------------------------------
//! A descriptor pairs a location (directory) pattern with a file-name pattern. The combined
//! regex and both templates are compiled once here and reused for every path.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::read_jsonl;
use crate::error::{AsicError, AsicResult};
use crate::extensions::ExtensionRegistry;
use crate::metadata::{extract_metadata, FileMetadata};
use crate::pattern::pattern_to_template;
use crate::template::Template;

/// Kind identifier, always lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(String);

impl KindId {
    pub fn new(code: &str) -> Self { Self(code.trim().to_ascii_lowercase()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Agent,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Visibility::Public => "public", Visibility::Agent => "agent" })
    }
}

/// One line of the kind catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDefinition {
    pub code: String,
    pub visibility: Visibility,
    pub name_pattern: String,
    pub location_pattern: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileKindDescriptor {
    kind: KindId,
    visibility: Visibility,
    name_pattern: String,
    location_pattern: String,
    description: Option<String>,
    name_template: Template,
    location_template: Template,
    matcher: Regex,
}

impl FileKindDescriptor {
    pub fn new(def: KindDefinition) -> AsicResult<Self> {
        let kind = KindId::new(&def.code);
        let malformed = |reason: String| AsicError::MalformedPattern { kind: kind.to_string(), reason };

        let name_only = Regex::new(&def.name_pattern).map_err(|e| malformed(format!("name pattern: {e}")))?;
        let name_groups: Vec<&str> = name_only.capture_names().flatten().collect();
        let ext_groups = name_groups.iter().filter(|g| **g == "ext_versioned" || **g == "ext_excel").count();
        if ext_groups != 1 {
            return Err(malformed(format!("name pattern '{}' needs exactly one of ext_versioned/ext_excel, found {}", def.name_pattern, ext_groups)));
        }

        let combined = format!("^(?:{}{})", def.location_pattern, def.name_pattern);
        let matcher = RegexBuilder::new(&combined)
            .case_insensitive(true)
            .build()
            .map_err(|e| malformed(format!("combined pattern: {e}")))?;
        let groups: Vec<&str> = matcher.capture_names().flatten().collect();
        let has = |g: &str| groups.contains(&g);
        if !(has("location_year") || has("name_year")) || !(has("location_month") || has("name_month")) {
            return Err(malformed("pattern must capture a year and a month".into()));
        }
        if def.visibility == Visibility::Agent && !(has("location_agent") || has("name_agent")) {
            return Err(malformed("agent kinds must capture location_agent or name_agent".into()));
        }

        Ok(Self {
            name_template: Template::parse(&pattern_to_template(&def.name_pattern)),
            location_template: Template::parse(&pattern_to_template(&def.location_pattern)),
            kind,
            visibility: def.visibility,
            name_pattern: def.name_pattern,
            location_pattern: def.location_pattern,
            description: def.description,
            matcher,
        })
    }

    pub fn kind(&self) -> &KindId { &self.kind }
    pub fn visibility(&self) -> Visibility { self.visibility }
    pub fn name_pattern(&self) -> &str { &self.name_pattern }
    pub fn location_pattern(&self) -> &str { &self.location_pattern }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn name_template(&self) -> &Template { &self.name_template }
    pub fn location_template(&self) -> &Template { &self.location_template }
    /// `^(?:location+name)`, case-insensitive, anchored at the start only.
    pub fn matcher(&self) -> &Regex { &self.matcher }
}

/// Extraction strategy for a kind. Every built-in kind uses [`extract_metadata`].
pub type ExtractFn = fn(&FileKindDescriptor, &ExtensionRegistry, &str) -> AsicResult<FileMetadata>;

#[derive(Debug, Clone)]
pub struct KindEntry {
    pub descriptor: FileKindDescriptor,
    pub extract: ExtractFn,
}

impl KindEntry {
    pub fn kind(&self) -> &KindId { self.descriptor.kind() }
}

/// Kinds in catalogue order. Classification tries them in exactly this order.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    entries: Vec<KindEntry>,
}

impl KindRegistry {
    pub fn from_jsonl(source_name: &str, text: &str) -> AsicResult<Self> {
        let defs: Vec<(usize, KindDefinition)> = read_jsonl(source_name, text)?;
        Self::from_definitions(source_name, defs)
    }

    pub fn from_definitions(source_name: &str, defs: Vec<(usize, KindDefinition)>) -> AsicResult<Self> {
        let mut reg = Self::default();
        for (line, def) in defs {
            let kind = KindId::new(&def.code);
            if reg.entry_for(kind.as_str()).is_some() {
                return Err(AsicError::Config { source_name: source_name.to_string(), line, message: format!("duplicate kind '{kind}'") });
            }
            reg.entries.push(KindEntry { descriptor: FileKindDescriptor::new(def)?, extract: extract_metadata });
        }
        Ok(reg)
    }

    /// Swap the extraction strategy of one kind.
    pub fn with_extractor(mut self, kind: &str, extract: ExtractFn) -> AsicResult<Self> {
        let id = KindId::new(kind);
        let entry = self.entries.iter_mut().find(|e| e.kind() == &id).ok_or(AsicError::UnknownKind { kind: id.to_string() })?;
        entry.extract = extract;
        Ok(self)
    }

    pub fn all_kinds(&self) -> Vec<&KindId> { self.entries.iter().map(|e| e.kind()).collect() }

    pub fn entries(&self) -> &[KindEntry] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entry_for(&self, kind: &str) -> Option<&KindEntry> {
        let id = KindId::new(kind);
        self.entries.iter().find(|e| e.kind() == &id)
    }

    pub fn descriptor_for(&self, kind: &str) -> AsicResult<&FileKindDescriptor> {
        self.entry_for(kind).map(|e| &e.descriptor).ok_or_else(|| AsicError::UnknownKind { kind: KindId::new(kind).to_string() })
    }

    /// Validate user-supplied kind names, keeping their order and dropping repeats.
    pub fn resolve(&self, names: &[String]) -> AsicResult<Vec<KindId>> {
        let mut out: Vec<KindId> = Vec::with_capacity(names.len());
        for n in names {
            let id = self.descriptor_for(n)?.kind().clone();
            if !out.contains(&id) { out.push(id); }
        }
        Ok(out)
    }

    /// Entries for the requested kinds in registry order; an empty request means every kind.
    pub fn candidates(&self, requested: &[KindId]) -> AsicResult<Vec<&KindEntry>> {
        if let Some(missing) = requested.iter().find(|k| self.entry_for(k.as_str()).is_none()) {
            return Err(AsicError::UnknownKind { kind: missing.to_string() });
        }
        Ok(self.entries.iter().filter(|e| requested.is_empty() || requested.contains(e.kind())).collect())
    }
}
