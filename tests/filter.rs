use std::fs;

use gwasharmonize::clump::ClumpedSet;
use gwasharmonize::filter::{
    GENOME_WIDE, PRE_CLUMP, filter_by_pvalue, filter_matched, restrict_to_clump,
};
use gwasharmonize::matching::match_cohorts;
use gwasharmonize::types::{PValueField, VariantKey, VariantRecord};
use tempfile::TempDir;

fn with_p(pos: u64, snp: Option<&str>, p: Option<f64>, p_adjusted: Option<f64>) -> VariantRecord {
    let mut r = VariantRecord::new(VariantKey::new("1", pos), "A", Some(1.0), Some(1.0))
        .expect("record");
    r.snp = snp.map(str::to_string);
    r.p = p;
    r.p_adjusted = p_adjusted;
    r
}

fn positions(records: &[VariantRecord]) -> Vec<u64> {
    records.iter().map(|r| r.key.position).collect()
}

#[test]
fn threshold_is_strict_and_missing_p_is_dropped() {
    let records = vec![
        with_p(1, None, None, Some(1e-9)),
        with_p(2, None, None, Some(5e-8)),
        with_p(3, None, None, Some(4.9e-8)),
        with_p(4, None, None, None),
        with_p(5, None, None, Some(0.2)),
    ];
    let kept = filter_by_pvalue(records, GENOME_WIDE, PValueField::Adjusted);
    assert_eq!(positions(&kept), vec![1, 3]);
}

#[test]
fn stricter_threshold_keeps_a_subset() {
    let records: Vec<VariantRecord> = [1e-12, 3e-8, 1e-5, 4e-3, 5e-3, 0.04, 0.9]
        .iter()
        .enumerate()
        .map(|(i, p)| with_p(i as u64, None, Some(*p), None))
        .collect();
    let loose = filter_by_pvalue(records.clone(), PRE_CLUMP, PValueField::Reported);
    let strict = filter_by_pvalue(records, GENOME_WIDE, PValueField::Reported);
    assert_eq!(positions(&loose), vec![0, 1, 2, 3]);
    assert_eq!(positions(&strict), vec![0, 1]);
    assert!(strict.iter().all(|r| loose.contains(r)));
}

#[test]
fn matched_pairs_need_both_sides_below_threshold() {
    let left = vec![
        with_p(1, None, Some(1e-4), None),
        with_p(2, None, Some(1e-4), None),
        with_p(3, None, None, None),
    ];
    let right = vec![
        with_p(1, None, Some(1e-3), None),
        with_p(2, None, Some(0.5), None),
        with_p(3, None, Some(1e-6), None),
    ];
    let kept = filter_matched(match_cohorts(&left, &right), PRE_CLUMP, PValueField::Reported);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].key.position, 1);
}

#[test]
fn clump_restriction_keeps_only_lead_variants() {
    let records = vec![
        with_p(1, Some("rs1"), None, None),
        with_p(2, Some("rs2"), None, None),
        with_p(3, None, None, None),
    ];
    let set: ClumpedSet = ["rs2".to_string(), "rs9".to_string()].into_iter().collect();
    let kept = restrict_to_clump(records.clone(), &set);
    assert_eq!(positions(&kept), vec![2]);

    let empty = ClumpedSet::default();
    assert!(restrict_to_clump(records, &empty).is_empty());
}

#[test]
fn plink_clump_output_is_loaded_by_snp_column() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("trait.clumped");
    fs::write(
        &path,
        " CHR    F        SNP         BP          P    TOTAL\n\
         \x20  1    1     rs123     752566   1.2e-10        4\n\
         \x20  2    1     rs456    1005806   3.4e-09        0\n\n",
    )
    .expect("write clump");
    let set = ClumpedSet::from_path(&path).expect("load clump");
    assert_eq!(set.len(), 2);
    assert!(set.contains("rs123"));
    assert!(set.contains("rs456"));
    assert!(!set.contains("752566"));
}

#[test]
fn narrow_clump_file_is_a_schema_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("narrow.clumped");
    fs::write(&path, "CHR SNP\n1 rs1\n").expect("write clump");
    let err = ClumpedSet::from_path(&path).expect_err("two columns");
    let msg = format!("{err:#}");
    assert!(msg.contains("at least 3"), "{msg}");
}

#[test]
fn clump_file_without_snp_column_is_a_schema_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("nosnp.clumped");
    fs::write(&path, "CHR\tF\tMARKER\tBP\n1\t1\trs1\t100\n").expect("write clump");
    let err = ClumpedSet::from_path(&path).expect_err("no SNP column");
    let msg = format!("{err:#}");
    assert!(msg.contains("no SNP column"), "{msg}");
}

#[test]
fn missing_clump_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    assert!(ClumpedSet::from_path(&dir.path().join("absent.clumped")).is_err());
}

#[test]
fn clump_file_with_repeated_header_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("dup.clumped");
    fs::write(&path, "CHR F SNP SNP\n1 1 rs1 rs1\n").expect("write");
    assert!(ClumpedSet::from_path(&path).is_err());
}
