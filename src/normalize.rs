use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use statrs::function::erf::erfc;

use crate::df_utils::{cast_columns, f64_values, str_values, uppercase_columns};
use crate::error::HarmonizeError;
use crate::io::read_table;
use crate::schema::{
    BETA, CHR, ColumnMapConfig, EFFECT_ALLELE, FREQ, MINOR_AF, MINOR_ALLELE, OTHER_ALLELE, P, POS,
    SE, VARIANT, resolve_column_map,
};
use crate::types::{CohortSchema, InvalidStatistic, StatField, VariantKey, VariantRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingPosition,
    MalformedVariant,
    MissingAllele,
    InvalidFrequency,
    MissingBeta,
    InvalidSe,
    NonFiniteZ,
}

impl From<InvalidStatistic> for DropReason {
    fn from(value: InvalidStatistic) -> Self {
        match value {
            InvalidStatistic::MissingBeta => DropReason::MissingBeta,
            InvalidStatistic::InvalidSe => DropReason::InvalidSe,
            InvalidStatistic::NonFiniteZ => DropReason::NonFiniteZ,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub missing_position: usize,
    pub malformed_variant: usize,
    pub missing_allele: usize,
    pub invalid_frequency: usize,
    pub missing_beta: usize,
    pub invalid_se: usize,
    pub non_finite_z: usize,
}

impl DropCounts {
    pub fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingPosition => self.missing_position += 1,
            DropReason::MalformedVariant => self.malformed_variant += 1,
            DropReason::MissingAllele => self.missing_allele += 1,
            DropReason::InvalidFrequency => self.invalid_frequency += 1,
            DropReason::MissingBeta => self.missing_beta += 1,
            DropReason::InvalidSe => self.invalid_se += 1,
            DropReason::NonFiniteZ => self.non_finite_z += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_position
            + self.malformed_variant
            + self.missing_allele
            + self.invalid_frequency
            + self.missing_beta
            + self.invalid_se
            + self.non_finite_z
    }

    pub fn describe(&self) -> Vec<(&'static str, usize)> {
        [
            ("missing chromosome or position", self.missing_position),
            ("malformed variant identifier", self.malformed_variant),
            ("missing effect allele", self.missing_allele),
            ("frequency outside [0, 1]", self.invalid_frequency),
            ("missing effect size", self.missing_beta),
            ("zero, missing or non-numeric SE", self.invalid_se),
            ("non-finite Z", self.non_finite_z),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub input_rows: usize,
    pub dropped: DropCounts,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub records: Vec<VariantRecord>,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMoments {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
}

pub fn normalize_file(
    path: &Path,
    schema: CohortSchema,
    config: &ColumnMapConfig,
) -> Result<Normalized> {
    let df = read_table(path)?;
    let config = ColumnMapConfig {
        filename: Some(path.display().to_string()),
        ..config.clone()
    };
    normalize(df, schema, &config).with_context(|| format!("normalize {}", path.display()))
}

pub fn normalize(
    mut df: DataFrame,
    schema: CohortSchema,
    config: &ColumnMapConfig,
) -> Result<Normalized> {
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let map = resolve_column_map(&headers, schema, config)?;
    df.set_column_names(map.headers.iter().map(String::as_str))?;

    df = cast_columns(
        df,
        &[CHR, POS, EFFECT_ALLELE, OTHER_ALLELE, VARIANT, MINOR_ALLELE],
        &DataType::String,
    )?;
    df = cast_columns(df, &[BETA, SE, P, FREQ, MINOR_AF], &DataType::Float64)?;
    df = uppercase_columns(df, &[EFFECT_ALLELE, OTHER_ALLELE, VARIANT, MINOR_ALLELE])?;

    let height = df.height();
    let beta = f64_values(&df, BETA)?.context("BETA column")?;
    let se = f64_values(&df, SE)?.context("SE column")?;
    let p = f64_values(&df, P)?;

    let identities: Vec<std::result::Result<RowIdentity, DropReason>> = match schema {
        CohortSchema::Bbj => {
            let chr = str_values(&df, CHR)?.context("CHR column")?;
            let pos = str_values(&df, POS)?.context("POS column")?;
            let ea = str_values(&df, EFFECT_ALLELE)?.context("effect allele column")?;
            let oa = str_values(&df, OTHER_ALLELE)?;
            let frq = f64_values(&df, FREQ)?;
            (0..height)
                .map(|i| {
                    bbj_identity(
                        chr[i].as_deref(),
                        pos[i].as_deref(),
                        ea[i].as_deref(),
                        oa.as_ref().and_then(|v| v[i].as_deref()),
                        frq.as_ref().and_then(|v| v[i]),
                    )
                })
                .collect()
        }
        CohortSchema::Ukbb => {
            let variant = str_values(&df, VARIANT)?.context("variant column")?;
            let minor_allele = str_values(&df, MINOR_ALLELE)?;
            let minor_af = f64_values(&df, MINOR_AF)?;
            (0..height)
                .map(|i| {
                    ukbb_identity(
                        variant[i].as_deref(),
                        minor_allele.as_ref().and_then(|v| v[i].as_deref()),
                        minor_af.as_ref().and_then(|v| v[i]),
                    )
                })
                .collect()
        }
    };

    let mut report = NormalizeReport {
        input_rows: height,
        info: map.info,
        warnings: map.warnings,
        ..Default::default()
    };
    let mut records = Vec::with_capacity(height);
    for (i, identity) in identities.into_iter().enumerate() {
        let built = identity.and_then(|id| {
            let mut record = VariantRecord::new(id.key, &id.effect_allele, beta[i], se[i])
                .map_err(DropReason::from)?;
            record.other_allele = id.other_allele;
            record.frequency = id.frequency;
            record.p = p.as_ref().and_then(|v| v[i]);
            Ok(record)
        });
        match built {
            Ok(record) => records.push(record),
            Err(reason) => report.dropped.record(reason),
        }
    }

    report.warnings.extend(sanity_warnings(&records));
    Ok(Normalized { records, report })
}

struct RowIdentity {
    key: VariantKey,
    effect_allele: String,
    other_allele: Option<String>,
    frequency: Option<f64>,
}

fn bbj_identity(
    chr: Option<&str>,
    pos: Option<&str>,
    effect_allele: Option<&str>,
    other_allele: Option<&str>,
    frequency: Option<f64>,
) -> std::result::Result<RowIdentity, DropReason> {
    let (Some(chr), Some(pos)) = (chr, pos) else {
        return Err(DropReason::MissingPosition);
    };
    let pos = pos
        .trim()
        .parse::<u64>()
        .map_err(|_| DropReason::MissingPosition)?;
    let effect_allele = effect_allele
        .filter(|a| !a.is_empty())
        .ok_or(DropReason::MissingAllele)?;
    Ok(RowIdentity {
        key: VariantKey::new(chr, pos),
        effect_allele: effect_allele.to_string(),
        other_allele: other_allele.map(str::to_string),
        frequency: check_frequency(frequency)?,
    })
}

fn ukbb_identity(
    variant: Option<&str>,
    minor_allele: Option<&str>,
    minor_af: Option<f64>,
) -> std::result::Result<RowIdentity, DropReason> {
    let variant = variant.ok_or(DropReason::MalformedVariant)?;
    let (key, reference, alternate) = split_variant(variant).ok_or(DropReason::MalformedVariant)?;
    let minor_af = check_frequency(minor_af)?;
    Ok(RowIdentity {
        frequency: ukbb_frequency(&alternate, minor_allele, minor_af),
        key,
        effect_allele: alternate,
        other_allele: Some(reference),
    })
}

fn check_frequency(frequency: Option<f64>) -> std::result::Result<Option<f64>, DropReason> {
    match frequency {
        Some(f) if !(0.0..=1.0).contains(&f) => Err(DropReason::InvalidFrequency),
        other => Ok(other),
    }
}

pub fn split_variant(variant: &str) -> Option<(VariantKey, String, String)> {
    let parts: Vec<&str> = variant.trim().split(':').collect();
    let [chr, pos, reference, alternate] = parts.as_slice() else {
        return None;
    };
    if chr.is_empty() || reference.is_empty() || alternate.is_empty() {
        return None;
    }
    let pos = pos.parse::<u64>().ok()?;
    Some((
        VariantKey::new(chr, pos),
        reference.to_ascii_uppercase(),
        alternate.to_ascii_uppercase(),
    ))
}

pub fn ukbb_frequency(
    alternate: &str,
    minor_allele: Option<&str>,
    minor_af: Option<f64>,
) -> Option<f64> {
    let (minor_allele, maf) = (minor_allele?, minor_af?);
    if alternate.eq_ignore_ascii_case(minor_allele) {
        Some(maf)
    } else {
        Some(1.0 - maf)
    }
}

pub fn adjust_sample_size(
    records: &mut [VariantRecord],
    n: f64,
) -> crate::error::Result<()> {
    crate::qc::check_sample_size(n, "N")?;
    // An already N-scaled Z gets scaled twice here.
    let scale = n.sqrt();
    for r in records.iter_mut() {
        r.z_adjusted = Some(r.z * scale);
    }
    Ok(())
}

pub fn standardize(
    records: &mut [VariantRecord],
    field: StatField,
) -> crate::error::Result<BatchMoments> {
    let values = records
        .iter()
        .map(|r| r.stat(field))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            HarmonizeError::UndefinedStatistic(format!(
                "cannot standardize {field:?}: not every record carries it"
            ))
        })?;
    let moments = population_moments(&values).ok_or_else(|| {
        HarmonizeError::UndefinedStatistic(format!(
            "cannot standardize {field:?} over {} record(s) with zero variance",
            values.len()
        ))
    })?;
    for (r, v) in records.iter_mut().zip(values) {
        let scaled = Some((v - moments.mean) / moments.sd);
        match field {
            StatField::Z => r.z_norm = scaled,
            StatField::ZAdjusted => r.z_adjusted_norm = scaled,
        }
    }
    Ok(moments)
}

fn population_moments(values: &[f64]) -> Option<BatchMoments> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    if !sd.is_finite() || sd == 0.0 {
        return None;
    }
    Some(BatchMoments {
        n: values.len(),
        mean,
        sd,
    })
}

pub fn two_sided_p(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

pub fn assign_adjusted_p(records: &mut [VariantRecord]) {
    for r in records.iter_mut() {
        r.p_adjusted = r.z_adjusted_norm.or(r.z_adjusted).map(two_sided_p);
    }
}

fn sanity_warnings(records: &[VariantRecord]) -> Vec<String> {
    let mut warnings = Vec::new();
    if !records.is_empty() {
        let mean_abs_z = records.iter().map(|r| r.z.abs()).sum::<f64>() / records.len() as f64;
        if mean_abs_z > 5.0 {
            warnings.push(format!(
                "Mean |Z| is {mean_abs_z:.2}; check that the BETA and SE columns are labeled correctly."
            ));
        }
    }
    let bad_p = records
        .iter()
        .filter_map(|r| r.p)
        .filter(|p| !(0.0..=1.0).contains(p))
        .count();
    if bad_p > 100 {
        warnings.push(format!(
            "{bad_p} variants have P below 0 or above 1; the P column may be mislabeled."
        ));
    }
    warnings
}
