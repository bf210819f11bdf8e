//! Metadata extraction: recover year/month/day/extension/version/agent from a remote path.

use chrono::NaiveDate;
use regex::Captures;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AsicError, AsicResult};
use crate::extensions::ExtensionRegistry;
use crate::kinds::{FileKindDescriptor, KindEntry, KindId, Visibility};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMetadata {
    pub year: i32,
    pub month: u32,
    pub day: Option<u32>,
    pub extension: String,
    pub version: Option<String>,
    pub agent: Option<String>,
}

/// A classified remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsicFile {
    pub kind: KindId,
    pub visibility: Visibility,
    pub remote_path: String,
    pub metadata: FileMetadata,
}

impl AsicFile {
    /// Day-less (monthly) files anchor to the first of the month.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        let m = &self.metadata;
        NaiveDate::from_ymd_opt(m.year, m.month, m.day.unwrap_or(1))
    }

    pub fn remote_name(&self) -> &str {
        self.remote_path.rsplit('/').next().unwrap_or(&self.remote_path)
    }

    pub fn remote_parent(&self) -> &str {
        match self.remote_path.rfind('/') {
            Some(i) => &self.remote_path[..i],
            None => "",
        }
    }
}

pub fn normalize_remote_path(path: &str) -> String { path.replace('\\', "/") }

/// Match `path` against the kind's combined pattern and resolve its fields.
/// Location-captured values win over name-captured ones; when both are captured they must agree.
pub fn extract_metadata(desc: &FileKindDescriptor, exts: &ExtensionRegistry, path: &str) -> AsicResult<FileMetadata> {
    let norm = normalize_remote_path(path);
    let kind = desc.kind().as_str();
    let mismatch = |reason: &str| AsicError::PathPatternMismatch { kind: kind.to_string(), path: norm.clone(), reason: reason.to_string() };
    let caps = desc.matcher().captures(&norm).ok_or_else(|| mismatch("pattern did not match"))?;
    let fields = Fields { kind, path: &norm, caps: &caps };

    let year: i32 = match fields.number("year", "location_year", "name_year")? {
        Some(y) => i32::try_from(y).map_err(|_| mismatch("year out of range"))?,
        None => return Err(AsicError::MalformedPattern { kind: kind.to_string(), reason: "no year captured".into() }),
    };
    let month = match fields.number("month", "location_month", "name_month")? {
        Some(m) => u32::try_from(m).map_err(|_| mismatch("month out of range"))?,
        None => return Err(AsicError::MalformedPattern { kind: kind.to_string(), reason: "no month captured".into() }),
    };
    let day = match fields.number("day", "location_day", "name_day")? {
        Some(d) => Some(u32::try_from(d).map_err(|_| mismatch("day out of range"))?),
        None => None,
    };
    if NaiveDate::from_ymd_opt(year, month, day.unwrap_or(1)).is_none() {
        return Err(mismatch("captured date is not a calendar date"));
    }

    let (extension, version) = if let Some(v) = caps.name("ext_versioned") {
        let extension = format!(".{}", v.as_str().to_ascii_lowercase());
        let entry = exts.lookup(&extension)?;
        let version = entry.normalized_version.clone();
        (extension, Some(version))
    } else if let Some(x) = caps.name("ext_excel") {
        (format!(".{}", x.as_str().to_ascii_lowercase()), None)
    } else {
        return Err(AsicError::MalformedPattern { kind: kind.to_string(), reason: "no extension group captured".into() });
    };

    let agent = match desc.visibility() {
        Visibility::Public => None,
        Visibility::Agent => match fields.text("agent", "location_agent", "name_agent")? {
            Some(a) => Some(a),
            None => return Err(AsicError::MalformedPattern { kind: kind.to_string(), reason: "agent kind matched without an agent".into() }),
        },
    };

    Ok(FileMetadata { year, month, day, extension, version, agent })
}

struct Fields<'a> {
    kind: &'a str,
    path: &'a str,
    caps: &'a Captures<'a>,
}

impl Fields<'_> {
    fn get(&self, group: &str) -> Option<&str> { self.caps.name(group).map(|m| m.as_str()) }

    fn conflict(&self, field: &'static str, location: &str, name: &str) -> AsicError {
        AsicError::ConflictingFields { kind: self.kind.to_string(), path: self.path.to_string(), field, location: location.to_string(), name: name.to_string() }
    }

    fn number(&self, field: &'static str, loc: &str, name: &str) -> AsicResult<Option<i64>> {
        let parse = |s: &str| {
            s.parse::<i64>().map_err(|_| AsicError::PathPatternMismatch {
                kind: self.kind.to_string(),
                path: self.path.to_string(),
                reason: format!("{field} '{s}' is not a number"),
            })
        };
        match (self.get(loc), self.get(name)) {
            (Some(l), Some(n)) => {
                let (lv, nv) = (parse(l)?, parse(n)?);
                if lv != nv { return Err(self.conflict(field, l, n)); }
                Ok(Some(lv))
            }
            (Some(l), None) => Ok(Some(parse(l)?)),
            (None, Some(n)) => Ok(Some(parse(n)?)),
            (None, None) => Ok(None),
        }
    }

    fn text(&self, field: &'static str, loc: &str, name: &str) -> AsicResult<Option<String>> {
        match (self.get(loc), self.get(name)) {
            (Some(l), Some(n)) if !l.eq_ignore_ascii_case(n) => Err(self.conflict(field, l, n)),
            (Some(v), _) | (None, Some(v)) => Ok(Some(v.to_ascii_lowercase())),
            (None, None) => Ok(None),
        }
    }
}

/// Try each candidate in order; the first kind whose extraction succeeds owns the path.
/// Mismatches are skipped; every other failure aborts classification.
pub fn classify(candidates: &[&KindEntry], exts: &ExtensionRegistry, path: &str) -> AsicResult<Option<AsicFile>> {
    for entry in candidates {
        match (entry.extract)(&entry.descriptor, exts, path) {
            Ok(metadata) => {
                return Ok(Some(AsicFile {
                    kind: entry.kind().clone(),
                    visibility: entry.descriptor.visibility(),
                    remote_path: normalize_remote_path(path),
                    metadata,
                }));
            }
            Err(AsicError::PathPatternMismatch { kind, reason, .. }) => {
                debug!(target: "asic", "{} is not {}: {}", path, kind, reason);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Classify a path against every registered kind.
pub fn probe(kinds: &crate::kinds::KindRegistry, exts: &ExtensionRegistry, path: &str) -> AsicResult<Option<AsicFile>> {
    let all: Vec<&KindEntry> = kinds.entries().iter().collect();
    classify(&all, exts, path)
}
