use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::clump::ClumpedSet;
use crate::error::HarmonizeError;
use crate::filter::{filter_by_pvalue, filter_matched, restrict_to_clump};
use crate::io::{write_matched, write_records};
use crate::logging::RunLog;
use crate::matching::{MatchSummary, match_cohorts};
use crate::normalize::{
    NormalizeReport, Normalized, adjust_sample_size, assign_adjusted_p, normalize_file,
    standardize,
};
use crate::parallel::map_traits;
use crate::qc::{check_equal_length, check_file_exists, check_sample_size, check_threshold};
use crate::reference::ReferenceSnpTable;
use crate::schema::ColumnMapConfig;
use crate::types::{CohortSchema, PValueField, StatField, VariantRecord};

#[derive(Debug, Clone)]
pub struct CohortInput {
    pub path: PathBuf,
    pub schema: CohortSchema,
    pub sample_size: f64,
    pub clump: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TraitInput {
    pub name: String,
    pub bbj: CohortInput,
    pub ukbb: CohortInput,
}

#[derive(Debug, Clone)]
pub struct HarmonizeConfig {
    pub traits: Vec<TraitInput>,
    pub reference: PathBuf,
    pub out_dir: PathBuf,
    pub threshold: f64,
    pub parallel: bool,
    pub cores: Option<usize>,
    pub overwrite: bool,
    pub column_names: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct QcConfig {
    pub file: PathBuf,
    pub schema: CohortSchema,
    pub output: PathBuf,
    pub reference: Option<PathBuf>,
    pub sample_size: Option<f64>,
    pub overwrite: bool,
    pub column_names: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub bbj: PathBuf,
    pub ukbb: PathBuf,
    pub output: PathBuf,
    pub reference: Option<PathBuf>,
    pub p_threshold: Option<f64>,
    pub overwrite: bool,
    pub column_names: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortOutcome {
    pub input_rows: usize,
    pub normalized: usize,
    pub annotated: usize,
    pub clumped: Option<usize>,
    pub significant: usize,
}

#[derive(Debug, Clone)]
pub struct TraitOutcome {
    pub name: String,
    pub bbj: CohortOutcome,
    pub ukbb: CohortOutcome,
    pub matches: MatchSummary,
    pub outputs: Vec<PathBuf>,
    pub log: PathBuf,
}

pub fn validate(config: &HarmonizeConfig) -> Result<()> {
    if config.traits.is_empty() {
        return Err(HarmonizeError::InvalidArgument("No traits provided".into()).into());
    }
    check_file_exists(&config.reference, "reference")?;
    check_threshold(config.threshold, "threshold")?;
    let mut seen = HashSet::new();
    for t in &config.traits {
        if t.name.trim().is_empty() {
            return Err(HarmonizeError::InvalidArgument("Empty trait name".into()).into());
        }
        // Output and log names are keyed on the trait name.
        if !seen.insert(t.name.as_str()) {
            return Err(HarmonizeError::InvalidArgument(format!(
                "Trait name {} is given more than once",
                t.name
            ))
            .into());
        }
        for cohort in [&t.bbj, &t.ukbb] {
            check_file_exists(&cohort.path, cohort.schema.label())?;
            check_sample_size(cohort.sample_size, cohort.schema.label())?;
            if let Some(clump) = &cohort.clump {
                check_file_exists(clump, "clump")?;
            }
        }
    }
    Ok(())
}

pub fn harmonize(config: &HarmonizeConfig) -> Result<Vec<TraitOutcome>> {
    validate(config)?;
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("create {}", config.out_dir.display()))?;
    let reference = ReferenceSnpTable::from_path(&config.reference)?;

    if config.parallel {
        map_traits(&config.traits, config.cores, |t| {
            harmonize_trait(t, &reference, config)
        })
    } else {
        config
            .traits
            .iter()
            .map(|t| harmonize_trait(t, &reference, config))
            .collect()
    }
}

pub fn harmonize_trait(
    input: &TraitInput,
    reference: &ReferenceSnpTable,
    config: &HarmonizeConfig,
) -> Result<TraitOutcome> {
    // A broken clump file fails the trait before anything is written.
    let bbj_clump = load_clump(&input.bbj)?;
    let ukbb_clump = load_clump(&input.ukbb)?;

    let mut log = RunLog::create(&config.out_dir, &input.name)?;
    log.info(format!("Harmonizing trait {}", input.name))?;
    let mut outputs = Vec::new();

    let (bbj_records, bbj) = process_cohort(
        &input.name,
        &input.bbj,
        bbj_clump.as_ref(),
        reference,
        config,
        &mut log,
        &mut outputs,
    )?;
    let (ukbb_records, ukbb) = process_cohort(
        &input.name,
        &input.ukbb,
        ukbb_clump.as_ref(),
        reference,
        config,
        &mut log,
        &mut outputs,
    )?;

    let matched = match_cohorts(&bbj_records, &ukbb_records);
    let matches = MatchSummary::from_matches(bbj_records.len(), ukbb_records.len(), &matched);
    log_match_summary(&mut log, &matches)?;

    let path = config.out_dir.join(format!("{}.matched.tsv", input.name));
    if guard_output(&path, config.overwrite, &mut log)? {
        write_matched(
            &matched,
            input.bbj.schema.label(),
            input.ukbb.schema.label(),
            &path,
        )?;
        outputs.push(path);
    }

    Ok(TraitOutcome {
        name: input.name.clone(),
        bbj,
        ukbb,
        matches,
        outputs,
        log: log.path().to_path_buf(),
    })
}

fn load_clump(input: &CohortInput) -> Result<Option<ClumpedSet>> {
    input
        .clump
        .as_deref()
        .map(|path| {
            ClumpedSet::from_path(path)
                .with_context(|| format!("load {} clump file", input.schema.label()))
        })
        .transpose()
}

fn process_cohort(
    trait_name: &str,
    input: &CohortInput,
    clump: Option<&ClumpedSet>,
    reference: &ReferenceSnpTable,
    config: &HarmonizeConfig,
    log: &mut RunLog,
    outputs: &mut Vec<PathBuf>,
) -> Result<(Vec<VariantRecord>, CohortOutcome)> {
    let label = input.schema.label();
    let n = input.sample_size;
    let stem = format!("{trait_name}.{label}");
    let mut outcome = CohortOutcome::default();

    let column_map = ColumnMapConfig {
        userprovided: config.column_names.clone(),
        filename: None,
    };
    let Normalized {
        mut records,
        report,
    } = normalize_file(&input.path, input.schema, &column_map)?;
    log_normalize_report(log, &input.path, &report)?;
    outcome.input_rows = report.input_rows;
    outcome.normalized = records.len();

    standardize_or_warn(&mut records, StatField::Z, &stem, log)?;
    write_stage(config, log, outputs, &format!("{stem}.QC.tsv"), &records)?;

    let (mut records, unresolved) = reference.annotate(records);
    log.info(format!("{unresolved} rows removed from {stem} without a reference identifier"))?;
    outcome.annotated = records.len();
    write_stage(config, log, outputs, &format!("{stem}.QC_with_SNP.tsv"), &records)?;

    adjust_sample_size(&mut records, n)?;
    standardize_or_warn(&mut records, StatField::ZAdjusted, &stem, log)?;
    assign_adjusted_p(&mut records);
    log.info(format!("Adjusted Z for {stem} with N = {n}"))?;
    write_stage(
        config,
        log,
        outputs,
        &format!("{stem}.QC_with_SNP_{n}.tsv"),
        &records,
    )?;

    if let Some(set) = clump {
        log.info(format!("{} clumped lead variants for {stem}", set.len()))?;
        let kept = restrict_to_clump(records.clone(), set);
        outcome.clumped = Some(kept.len());
        write_stage(
            config,
            log,
            outputs,
            &format!("{stem}.filtered_{n}.tsv"),
            &kept,
        )?;
    }

    let mut significant = filter_by_pvalue(records, config.threshold, PValueField::Adjusted);
    log.info(format!(
        "{} variants of {stem} have adjusted P below {}",
        significant.len(),
        config.threshold
    ))?;
    write_stage(
        config,
        log,
        outputs,
        &format!("{stem}.QC.{}_{n}.tsv", threshold_label(config.threshold)),
        &significant,
    )?;

    if let Some(set) = clump {
        significant = restrict_to_clump(significant, set);
        log.info(format!(
            "{} significant variants of {stem} are clumped lead variants",
            significant.len()
        ))?;
    }
    outcome.significant = significant.len();

    Ok((significant, outcome))
}

pub fn run_qc(config: &QcConfig) -> Result<Vec<VariantRecord>> {
    check_file_exists(&config.file, "file")?;
    let out_dir = parent_dir(&config.output);
    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let mut log = RunLog::create(&out_dir, &file_stem(&config.output))?;

    let column_map = ColumnMapConfig {
        userprovided: config.column_names.clone(),
        filename: None,
    };
    let Normalized {
        mut records,
        report,
    } = normalize_file(&config.file, config.schema, &column_map)?;
    log_normalize_report(&mut log, &config.file, &report)?;
    let stem = file_stem(&config.file);
    standardize_or_warn(&mut records, StatField::Z, &stem, &mut log)?;

    if let Some(reference) = &config.reference {
        let table = ReferenceSnpTable::from_path(reference)?;
        let (annotated, unresolved) = table.annotate(records);
        log.info(format!("{unresolved} rows removed without a reference identifier"))?;
        records = annotated;
    }

    if let Some(n) = config.sample_size {
        adjust_sample_size(&mut records, n)?;
        standardize_or_warn(&mut records, StatField::ZAdjusted, &stem, &mut log)?;
        assign_adjusted_p(&mut records);
        log.info(format!("Adjusted Z with N = {n}"))?;
    }

    if guard_output(&config.output, config.overwrite, &mut log)? {
        write_records(&records, &config.output)?;
    }
    Ok(records)
}

pub fn run_match(config: &MatchConfig) -> Result<MatchSummary> {
    check_file_exists(&config.bbj, "bbj")?;
    check_file_exists(&config.ukbb, "ukbb")?;
    if let Some(p) = config.p_threshold {
        check_threshold(p, "p_threshold")?;
    }
    let out_dir = parent_dir(&config.output);
    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let mut log = RunLog::create(&out_dir, &file_stem(&config.output))?;

    let column_map = ColumnMapConfig {
        userprovided: config.column_names.clone(),
        filename: None,
    };
    let mut sides = Vec::with_capacity(2);
    for (path, schema) in [
        (&config.bbj, CohortSchema::Bbj),
        (&config.ukbb, CohortSchema::Ukbb),
    ] {
        let Normalized {
            mut records,
            report,
        } = normalize_file(path, schema, &column_map)?;
        log_normalize_report(&mut log, path, &report)?;
        standardize_or_warn(&mut records, StatField::Z, &file_stem(path), &mut log)?;
        sides.push(records);
    }
    let (bbj, ukbb) = (&sides[0], &sides[1]);

    let mut matched = match_cohorts(bbj, ukbb);
    if let Some(p) = config.p_threshold {
        let before = matched.len();
        matched = filter_matched(matched, p, PValueField::Reported);
        log.info(format!(
            "{} matched rows removed with P not below {p} in both cohorts",
            before - matched.len()
        ))?;
    }
    if let Some(reference) = &config.reference {
        ReferenceSnpTable::from_path(reference)?.label_matched(&mut matched);
    }

    let summary = MatchSummary::from_matches(bbj.len(), ukbb.len(), &matched);
    log_match_summary(&mut log, &summary)?;
    if guard_output(&config.output, config.overwrite, &mut log)? {
        write_matched(
            &matched,
            CohortSchema::Bbj.label(),
            CohortSchema::Ukbb.label(),
            &config.output,
        )?;
    }
    Ok(summary)
}

pub fn check_trait_lists(names: usize, lists: &[(&str, usize)]) -> Result<()> {
    for (name, len) in lists {
        check_equal_length(names, *len, "traits", name)?;
    }
    Ok(())
}

pub fn parse_sample_sizes(input: &str, flag: &str) -> Result<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                anyhow::Error::from(HarmonizeError::InvalidArgument(format!(
                    "invalid sample size '{token}' in {flag}"
                )))
            })
        })
        .collect()
}

fn write_stage(
    config: &HarmonizeConfig,
    log: &mut RunLog,
    outputs: &mut Vec<PathBuf>,
    name: &str,
    records: &[VariantRecord],
) -> Result<()> {
    let path = config.out_dir.join(name);
    if guard_output(&path, config.overwrite, log)? {
        write_records(records, &path)?;
        log.note(format!("Wrote {} rows to {}", records.len(), path.display()))?;
        outputs.push(path);
    }
    Ok(())
}

fn standardize_or_warn(
    records: &mut [VariantRecord],
    field: StatField,
    stem: &str,
    log: &mut RunLog,
) -> Result<()> {
    if let Err(err) = standardize(records, field) {
        log.warn(format!("{stem}: {err}; normalized column left empty"))?;
    }
    Ok(())
}

fn guard_output(path: &Path, overwrite: bool, log: &mut RunLog) -> Result<bool> {
    if !overwrite && path.exists() {
        log.warn(format!("{} exists and overwrite=false; skipping", path.display()))?;
        return Ok(false);
    }
    Ok(true)
}

fn log_normalize_report(
    log: &mut RunLog,
    path: &Path,
    report: &NormalizeReport,
) -> Result<()> {
    log.info(format!("Normalizing file: {}", path.display()))?;
    for msg in &report.info {
        log.note(msg)?;
    }
    for msg in &report.warnings {
        log.warn(msg)?;
    }
    for (reason, count) in report.dropped.describe() {
        log.info(format!(
            "{count} rows were removed from {} due to {reason}",
            path.display()
        ))?;
    }
    log.info(format!(
        "{} of {} rows of {} kept after QC",
        report.input_rows - report.dropped.total(),
        report.input_rows,
        path.display()
    ))?;
    Ok(())
}

fn log_match_summary(log: &mut RunLog, summary: &MatchSummary) -> Result<()> {
    log.info(format!(
        "Matched {} variants ({} left, {} right); {} allele-flipped, {} strand-ambiguous",
        summary.matched,
        summary.left,
        summary.right,
        summary.flipped,
        summary.strand_ambiguous
    ))?;
    if summary.strand_ambiguous > 0 {
        log.warn(format!(
            "{} matched variants have A/T or C/G alleles; their orientation is not checked against strand",
            summary.strand_ambiguous
        ))?;
    }
    Ok(())
}

pub fn threshold_label(threshold: f64) -> String {
    format!("{threshold:e}").replace('-', "")
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("harmonize")
        .to_string()
}
