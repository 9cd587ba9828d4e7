use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::df_utils::str_values;
use crate::error::HarmonizeError;
use crate::io::read_table;
use crate::qc::check_file_exists;
use crate::schema::{SNP, find_column};

pub const MIN_CLUMP_COLUMNS: usize = 3;

const SNP_SYNONYMS: &[&str] = &["SNP", "RSID", "ID", "SNPID", "MARKERNAME", "VARIANT_ID"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClumpedSet {
    ids: HashSet<String>,
}

impl ClumpedSet {
    pub fn from_path(path: &Path) -> Result<Self> {
        check_file_exists(path, "clump")?;
        let df = read_table(path)?;
        Self::from_frame(&df).with_context(|| format!("load clump file {}", path.display()))
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        if headers.len() < MIN_CLUMP_COLUMNS {
            return Err(HarmonizeError::Schema(format!(
                "clump output has {} column(s), expected at least {MIN_CLUMP_COLUMNS}",
                headers.len()
            ))
            .into());
        }
        let idx = find_column(&headers, SNP, SNP_SYNONYMS).ok_or_else(|| {
            HarmonizeError::Schema(format!(
                "clump output has no {SNP} column (found: {})",
                headers.join(", ")
            ))
        })?;
        let values = str_values(df, &headers[idx])?.unwrap_or_default();
        Ok(values.into_iter().flatten().collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<String> for ClumpedSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
