use std::collections::BTreeSet;

use gwasharmonize::matching::{MatchSummary, match_by_identifier, match_cohorts};
use gwasharmonize::types::{VariantKey, VariantRecord};
use gwasharmonize::utils::{complement, is_strand_ambiguous};

fn record(chr: &str, pos: u64, allele: &str, beta: f64, se: f64) -> VariantRecord {
    VariantRecord::new(VariantKey::new(chr, pos), allele, Some(beta), Some(se)).expect("record")
}

fn with_frequency(mut r: VariantRecord, other: &str, frequency: f64) -> VariantRecord {
    r.other_allele = Some(other.to_string());
    r.frequency = Some(frequency);
    r
}

#[test]
fn right_side_is_flipped_onto_the_left_effect_allele() {
    let left = vec![with_frequency(record("chr1", 1000, "A", 2.0, 1.0), "G", 0.1)];
    let right = vec![with_frequency(record("1", 1000, "G", 3.0, 1.0), "A", 0.3)];

    let matched = match_cohorts(&left, &right);
    assert_eq!(matched.len(), 1);
    let m = &matched[0];
    assert_eq!(m.key, VariantKey::new("1", 1000));
    assert!(m.allele_flipped);

    assert_eq!(m.left.effect_allele, "A");
    assert_eq!(m.left.frequency, Some(0.1));
    assert_eq!(m.left.z, 2.0);

    assert_eq!(m.right.effect_allele, "A");
    assert_eq!(m.right.other_allele.as_deref(), Some("G"));
    assert!((m.right.frequency.expect("frequency") - 0.7).abs() < 1e-12);
    assert_eq!(m.right.z, -3.0);
    assert_eq!(m.right.beta, -3.0);
}

#[test]
fn flip_moves_every_signed_statistic_together() {
    let mut r = with_frequency(record("2", 50, "T", 0.5, 0.25), "C", 0.2);
    r.z_norm = Some(1.5);
    r.z_adjusted = Some(20.0);
    r.z_adjusted_norm = Some(2.5);
    r.p = Some(0.01);
    r.p_adjusted = Some(1e-3);
    let left = vec![with_frequency(record("2", 50, "C", 1.0, 1.0), "T", 0.8)];

    let matched = match_cohorts(&left, &[r.clone()]);
    let flipped = &matched[0].right;
    assert_eq!(flipped.effect_allele, "C");
    assert_eq!(flipped.z, -r.z);
    assert_eq!(flipped.beta, -r.beta);
    assert_eq!(flipped.z_norm, Some(-1.5));
    assert_eq!(flipped.z_adjusted, Some(-20.0));
    assert_eq!(flipped.z_adjusted_norm, Some(-2.5));
    assert!((flipped.frequency.expect("frequency") - 0.8).abs() < 1e-12);
    // P-values carry no sign.
    assert_eq!(flipped.p, r.p);
    assert_eq!(flipped.p_adjusted, r.p_adjusted);
    assert_eq!(flipped.se, r.se);
}

#[test]
fn same_effect_allele_is_left_alone() {
    let left = vec![record("3", 10, "g", 1.0, 1.0)];
    let right = vec![with_frequency(record("3", 10, "G", -4.0, 2.0), "T", 0.4)];
    let matched = match_cohorts(&left, &right);
    assert_eq!(matched.len(), 1);
    assert!(!matched[0].allele_flipped);
    assert_eq!(matched[0].right, right[0]);
}

#[test]
fn join_is_inner_and_symmetric_in_keys() {
    let left = vec![
        record("1", 100, "A", 1.0, 1.0),
        record("1", 200, "A", 1.0, 1.0),
        record("2", 100, "A", 1.0, 1.0),
        record("X", 5, "A", 1.0, 1.0),
    ];
    let right = vec![
        record("chrX", 5, "C", 1.0, 1.0),
        record("1", 100, "C", 1.0, 1.0),
        record("1", 300, "C", 1.0, 1.0),
    ];

    let forward: BTreeSet<VariantKey> =
        match_cohorts(&left, &right).into_iter().map(|m| m.key).collect();
    let backward: BTreeSet<VariantKey> =
        match_cohorts(&right, &left).into_iter().map(|m| m.key).collect();
    assert_eq!(forward, backward);
    assert_eq!(
        forward,
        [VariantKey::new("1", 100), VariantKey::new("X", 5)]
            .into_iter()
            .collect()
    );

    // Output follows the left side's order.
    let keys: Vec<VariantKey> = match_cohorts(&left, &right)
        .into_iter()
        .map(|m| m.key)
        .collect();
    assert_eq!(keys, vec![VariantKey::new("1", 100), VariantKey::new("X", 5)]);
}

#[test]
fn duplicate_keys_yield_every_pairing() {
    let left = vec![record("1", 100, "A", 1.0, 1.0), record("1", 100, "C", 2.0, 1.0)];
    let right = vec![
        record("1", 100, "A", 3.0, 1.0),
        record("1", 100, "A", 4.0, 1.0),
        record("1", 100, "A", 5.0, 1.0),
    ];
    let matched = match_cohorts(&left, &right);
    assert_eq!(matched.len(), 6);
    assert_eq!(matched.iter().filter(|m| m.allele_flipped).count(), 3);
    assert!(matched[..3].iter().all(|m| m.left.effect_allele == "A"));
}

#[test]
fn unresolved_identifiers_never_join() {
    let mut a = record("1", 100, "A", 1.0, 1.0);
    let mut b = record("1", 200, "A", 1.0, 1.0);
    let c = record("1", 300, "A", 1.0, 1.0);
    a.snp = Some("rs1".to_string());
    b.snp = None;

    let mut x = record("5", 1, "A", 1.0, 1.0);
    let y = record("5", 2, "A", 1.0, 1.0);
    x.snp = Some("rs1".to_string());

    let matched = match_by_identifier(&[a, b, c], &[x, y]);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].left.snp.as_deref(), Some("rs1"));
    assert_eq!(matched[0].right.key, VariantKey::new("5", 1));
}

#[test]
fn palindromic_pairs_are_flagged() {
    let left = vec![
        with_frequency(record("1", 1, "A", 1.0, 1.0), "T", 0.1),
        with_frequency(record("1", 2, "A", 1.0, 1.0), "G", 0.1),
    ];
    let right = vec![
        with_frequency(record("1", 1, "A", 1.0, 1.0), "T", 0.1),
        with_frequency(record("1", 2, "A", 1.0, 1.0), "G", 0.1),
    ];
    let matched = match_cohorts(&left, &right);
    assert!(matched[0].strand_ambiguous);
    assert!(!matched[1].strand_ambiguous);

    let summary = MatchSummary::from_matches(left.len(), right.len(), &matched);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.strand_ambiguous, 1);
    assert_eq!(summary.flipped, 0);
}

#[test]
fn empty_side_gives_empty_join() {
    let left = vec![record("1", 1, "A", 1.0, 1.0)];
    assert!(match_cohorts(&left, &[]).is_empty());
    assert!(match_cohorts(&[], &left).is_empty());
}

#[test]
fn complements_read_the_opposite_strand() {
    assert_eq!(complement("acg").as_deref(), Some("CGT"));
    assert_eq!(complement("N"), None);
    assert!(is_strand_ambiguous("A", "T"));
    assert!(is_strand_ambiguous("g", "C"));
    assert!(!is_strand_ambiguous("A", "G"));
    assert!(!is_strand_ambiguous("AT", "AT"));
}
