use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::io::open_text;
use crate::qc::check_file_exists;
use crate::types::{MatchedRecord, VariantKey, VariantRecord};

pub const UNRESOLVED: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Known(&'a str),
    Unknown,
}

impl Resolution<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            Resolution::Known(id) => id,
            Resolution::Unknown => UNRESOLVED,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Resolution::Known(_))
    }
}

impl fmt::Display for Resolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub lines: usize,
    pub malformed: usize,
    pub overwritten: usize,
}

#[derive(Debug, Default)]
pub struct ReferenceSnpTable {
    entries: HashMap<VariantKey, String>,
    stats: BuildStats,
}

impl ReferenceSnpTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        check_file_exists(path, "reference")?;
        info!("Loading reference identifiers from {}", path.display());
        let reader = open_text(path)?;
        let table = Self::from_reader(reader)
            .with_context(|| format!("read reference {}", path.display()))?;
        info!(
            "Loaded {} reference positions from {} lines",
            table.len(),
            table.stats.lines
        );
        Ok(table)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut stats = BuildStats::default();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            stats.lines += 1;
            let mut parts = line.split_whitespace();
            let (Some(chr), Some(pos), Some(id)) = (parts.next(), parts.next(), parts.next())
            else {
                stats.malformed += 1;
                continue;
            };
            let Ok(pos) = pos.parse::<u64>() else {
                stats.malformed += 1;
                continue;
            };
            // Last line wins.
            if entries
                .insert(VariantKey::new(chr, pos), id.to_string())
                .is_some()
            {
                stats.overwritten += 1;
            }
        }
        if stats.malformed > 0 {
            warn!(
                "{} malformed reference line(s) were skipped",
                stats.malformed
            );
        }
        if stats.overwritten > 0 {
            warn!(
                "{} reference position(s) appeared more than once; the last identifier was kept",
                stats.overwritten
            );
        }
        Ok(Self { entries, stats })
    }

    pub fn resolve(&self, key: &VariantKey) -> Resolution<'_> {
        match self.entries.get(key) {
            Some(id) => Resolution::Known(id),
            None => Resolution::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    pub fn annotate(&self, records: Vec<VariantRecord>) -> (Vec<VariantRecord>, usize) {
        let before = records.len();
        let annotated: Vec<VariantRecord> = records
            .into_iter()
            .filter_map(|mut r| match self.resolve(&r.key) {
                Resolution::Known(id) => {
                    r.snp = Some(id.to_string());
                    Some(r)
                }
                Resolution::Unknown => None,
            })
            .collect();
        let dropped = before - annotated.len();
        (annotated, dropped)
    }

    pub fn label_matched(&self, records: &mut [MatchedRecord]) {
        for m in records.iter_mut() {
            if let Resolution::Known(id) = self.resolve(&m.key) {
                m.left.snp.get_or_insert_with(|| id.to_string());
                m.right.snp.get_or_insert_with(|| id.to_string());
            }
        }
    }
}
