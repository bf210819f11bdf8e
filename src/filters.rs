//! Narrowing classified file lists by calendar range, extension and revision.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::calendar::YearMonth;
use crate::extensions::ExtensionRegistry;
use crate::kinds::KindId;
use crate::metadata::AsicFile;

/// Inclusive `[since, until]` on the effective date.
pub fn filter_by_date_range(files: Vec<AsicFile>, since: NaiveDate, until: NaiveDate) -> Vec<AsicFile> {
    files.into_iter().filter(|f| f.effective_date().is_some_and(|d| since <= d && d <= until)).collect()
}

pub fn filter_by_month(files: Vec<AsicFile>, month: YearMonth) -> Vec<AsicFile> {
    filter_by_date_range(files, month.first_day(), month.last_day())
}

/// Files without a normalized version always pass.
pub fn filter_by_extension(files: Vec<AsicFile>, extension: Option<&str>) -> Vec<AsicFile> {
    let Some(want) = extension else { return files };
    files
        .into_iter()
        .filter(|f| f.metadata.version.is_none() || f.metadata.extension.eq_ignore_ascii_case(want))
        .collect()
}

type Identity = (KindId, i32, u32, Option<u32>, Option<String>);

/// Keep the highest-ranked revision per (kind, year, month, day, agent).
/// Survivors keep the position of the first file seen for their identity.
pub fn keep_latest_versions(files: Vec<AsicFile>, exts: &ExtensionRegistry) -> Vec<AsicFile> {
    let mut slots: Vec<Option<AsicFile>> = Vec::with_capacity(files.len());
    let mut best: HashMap<Identity, usize> = HashMap::new();
    for f in files {
        if f.metadata.version.is_none() {
            slots.push(Some(f));
            continue;
        }
        let m = &f.metadata;
        let key: Identity = (f.kind.clone(), m.year, m.month, m.day, m.agent.clone());
        let rank = exts.order_of(&m.extension).unwrap_or(i64::MIN);
        match best.get(&key) {
            Some(&slot) => {
                let current = slots[slot].as_ref().and_then(|c| exts.order_of(&c.metadata.extension)).unwrap_or(i64::MIN);
                if rank > current { slots[slot] = Some(f); }
            }
            None => {
                best.insert(key, slots.len());
                slots.push(Some(f));
            }
        }
    }
    slots.into_iter().flatten().collect()
}
