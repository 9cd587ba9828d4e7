use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{MatchedRecord, VariantRecord};
use crate::utils::is_strand_ambiguous;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub left: usize,
    pub right: usize,
    pub matched: usize,
    pub flipped: usize,
    pub strand_ambiguous: usize,
}

impl MatchSummary {
    pub fn from_matches(left: usize, right: usize, matches: &[MatchedRecord]) -> Self {
        Self {
            left,
            right,
            matched: matches.len(),
            flipped: matches.iter().filter(|m| m.allele_flipped).count(),
            strand_ambiguous: matches.iter().filter(|m| m.strand_ambiguous).count(),
        }
    }
}

pub fn match_cohorts(left: &[VariantRecord], right: &[VariantRecord]) -> Vec<MatchedRecord> {
    let pairs = join_indices(left, right, |r| Some(&r.key));
    pairs
        .into_iter()
        .map(|(li, ri)| harmonize_pair(&left[li], &right[ri]))
        .collect()
}

pub fn match_by_identifier(left: &[VariantRecord], right: &[VariantRecord]) -> Vec<MatchedRecord> {
    let pairs = join_indices(left, right, |r| r.snp.as_deref());
    pairs
        .into_iter()
        .map(|(li, ri)| harmonize_pair(&left[li], &right[ri]))
        .collect()
}

fn join_indices<'a, K, F>(
    left: &'a [VariantRecord],
    right: &'a [VariantRecord],
    key: F,
) -> Vec<(usize, usize)>
where
    K: Eq + Hash + ?Sized + 'a,
    F: Fn(&'a VariantRecord) -> Option<&'a K>,
{
    let left_is_build = left.len() <= right.len();
    let (build, scan) = if left_is_build {
        (left, right)
    } else {
        (right, left)
    };

    let mut index: HashMap<&K, Vec<usize>> = HashMap::with_capacity(build.len());
    for (i, r) in build.iter().enumerate() {
        if let Some(k) = key(r) {
            index.entry(k).or_default().push(i);
        }
    }

    let mut pairs = Vec::new();
    for (si, r) in scan.iter().enumerate() {
        let Some(k) = key(r) else { continue };
        if let Some(hits) = index.get(k) {
            for &bi in hits {
                if left_is_build {
                    pairs.push((bi, si));
                } else {
                    pairs.push((si, bi));
                }
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

fn harmonize_pair(left: &VariantRecord, right: &VariantRecord) -> MatchedRecord {
    let strand_ambiguous = strand_ambiguous(left, right);
    let mut right = right.clone();
    let allele_flipped = left.effect_allele != right.effect_allele;
    if allele_flipped {
        right.flip_to(&left.effect_allele);
    }
    MatchedRecord {
        key: left.key.clone(),
        left: left.clone(),
        right,
        allele_flipped,
        strand_ambiguous,
    }
}

fn strand_ambiguous(left: &VariantRecord, right: &VariantRecord) -> bool {
    let palindromic = |r: &VariantRecord| {
        r.other_allele
            .as_deref()
            .is_some_and(|o| is_strand_ambiguous(&r.effect_allele, o))
    };
    palindromic(left)
        || palindromic(right)
        || is_strand_ambiguous(&left.effect_allele, &right.effect_allele)
}
