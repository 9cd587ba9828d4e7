use std::collections::{HashMap, HashSet};

use crate::error::{HarmonizeError, Result};
use crate::types::CohortSchema;

pub const CHR: &str = "CHR";
pub const POS: &str = "POS";
pub const EFFECT_ALLELE: &str = "EA";
pub const OTHER_ALLELE: &str = "OA";
pub const FREQ: &str = "FRQ";
pub const BETA: &str = "BETA";
pub const SE: &str = "SE";
pub const P: &str = "P";
pub const VARIANT: &str = "VARIANT";
pub const MINOR_ALLELE: &str = "MINOR_ALLELE";
pub const MINOR_AF: &str = "MINOR_AF";
pub const SNP: &str = "SNP";

#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub headers: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnMapConfig {
    pub userprovided: HashMap<String, String>,
    pub filename: Option<String>,
}

pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| h.trim().to_ascii_uppercase())
        .collect()
}

pub fn synonyms(schema: CohortSchema) -> Vec<(&'static str, Vec<&'static str>)> {
    let beta = (BETA, vec!["BETA", "B", "EFFECT", "EST", "LOG_ODDS"]);
    let se = (
        SE,
        vec!["SE", "STDERR", "SEBETA", "STANDARD_ERROR", "STANDARDERROR"],
    );
    let p = (
        P,
        vec![
            "P",
            "PVAL",
            "PVALUE",
            "P_VALUE",
            "P-VALUE",
            "P_BOLT",
            "P_BOLT_LMM",
            "P_BOLT_LMM_INF",
        ],
    );
    match schema {
        CohortSchema::Bbj => vec![
            (CHR, vec!["CHR", "CHROM", "#CHROM", "CHROMOSOME"]),
            (POS, vec!["POS", "BP", "POSITION", "BASE_PAIR_LOCATION"]),
            (
                EFFECT_ALLELE,
                vec!["ALT", "EA", "A1", "ALLELE1", "EFFECT_ALLELE"],
            ),
            (
                OTHER_ALLELE,
                vec![
                    "REF",
                    "OA",
                    "A2",
                    "ALLELE0",
                    "ALLELE2",
                    "OTHER_ALLELE",
                    "NEA",
                    "NON_EFFECT_ALLELE",
                ],
            ),
            (
                FREQ,
                vec![
                    "FRQ",
                    "ALT_FREQ",
                    "A1FREQ",
                    "EAF",
                    "FREQ",
                    "FREQ1",
                    "EFFECT_ALLELE_FREQ",
                ],
            ),
            beta,
            se,
            p,
        ],
        CohortSchema::Ukbb => vec![
            (VARIANT, vec!["VARIANT", "VARIANT_ID"]),
            (MINOR_ALLELE, vec!["MINOR_ALLELE"]),
            (MINOR_AF, vec!["MINOR_AF", "MAF"]),
            beta,
            se,
            p,
        ],
    }
}

pub fn required(schema: CohortSchema) -> &'static [&'static str] {
    match schema {
        CohortSchema::Bbj => &[CHR, POS, EFFECT_ALLELE, BETA, SE],
        CohortSchema::Ukbb => &[VARIANT, BETA, SE],
    }
}

pub fn warn_for_missing(schema: CohortSchema) -> &'static [&'static str] {
    match schema {
        CohortSchema::Bbj => &[FREQ, P],
        CohortSchema::Ukbb => &[MINOR_ALLELE, MINOR_AF, P],
    }
}

pub fn resolve_column_map(
    headers: &[String],
    schema: CohortSchema,
    config: &ColumnMapConfig,
) -> Result<ColumnMap> {
    let mut warnings = Vec::new();
    let mut info = Vec::new();

    let original = headers.to_vec();
    let mut headers = normalize_headers(headers);

    let filename = config
        .filename
        .clone()
        .unwrap_or_else(|| "<unknown>".to_string());

    let mut user_map: HashMap<String, String> = HashMap::new();
    for (k, v) in &config.userprovided {
        user_map.insert(k.to_ascii_uppercase(), v.to_ascii_uppercase());
    }

    let mut assigned: HashSet<usize> = HashSet::new();
    let mut resolved: HashSet<&'static str> = HashSet::new();

    for (canonical, syns) in synonyms(schema) {
        let candidates: Vec<String> = match user_map.get(canonical) {
            Some(user_col) => vec![user_col.clone()],
            None => std::iter::once(canonical.to_string())
                .chain(syns.iter().map(|s| s.to_string()))
                .collect(),
        };

        let mut chosen = None;
        for candidate in &candidates {
            if let Some((idx, _)) = headers
                .iter()
                .enumerate()
                .find(|(i, h)| *h == candidate && !assigned.contains(i))
            {
                chosen = Some(idx);
                break;
            }
        }

        match chosen {
            Some(idx) => {
                info.push(format!(
                    "Interpreting the {} column as the {canonical} column.",
                    original[idx].trim()
                ));
                headers[idx] = canonical.to_string();
                assigned.insert(idx);
                resolved.insert(canonical);

                let shadowed: Vec<&str> = headers
                    .iter()
                    .enumerate()
                    .filter(|(i, h)| !assigned.contains(i) && candidates.contains(*h))
                    .map(|(i, _)| original[i].trim())
                    .collect();
                if !shadowed.is_empty() {
                    warnings.push(format!(
                        "Multiple columns could be interpreted as {canonical} in {filename}; ignoring {}.",
                        shadowed.join(", ")
                    ));
                }
            }
            None => {
                if required(schema).contains(&canonical) {
                    return Err(HarmonizeError::MissingColumn(format!(
                        "{canonical} not found in {filename} ({} layout); try renaming it to {canonical}",
                        schema.label()
                    )));
                }
                if warn_for_missing(schema).contains(&canonical) {
                    warnings.push(format!(
                        "Cannot find {canonical} column; try renaming it to {canonical} in {filename}."
                    ));
                }
            }
        }
    }

    // Unclaimed headers that collide with a canonical name would shadow it after renaming.
    for (i, h) in headers.iter_mut().enumerate() {
        if !assigned.contains(&i) && resolved.contains(h.as_str()) {
            *h = format!("{h}_ORIG");
        }
    }

    Ok(ColumnMap {
        headers,
        warnings,
        info,
    })
}

pub fn find_column(headers: &[String], name: &str, syns: &[&str]) -> Option<usize> {
    let normalized = normalize_headers(headers);
    normalized
        .iter()
        .position(|h| h == name)
        .or_else(|| normalized.iter().position(|h| syns.contains(&h.as_str())))
}
