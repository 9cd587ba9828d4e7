use crate::clump::ClumpedSet;
use crate::types::{MatchedRecord, PValueField, VariantRecord};

pub const GENOME_WIDE: f64 = 5e-8;
pub const PRE_CLUMP: f64 = 5e-3;

fn passes(p: Option<f64>, threshold: f64) -> bool {
    p.is_some_and(|p| p < threshold)
}

pub fn filter_by_pvalue(
    records: Vec<VariantRecord>,
    threshold: f64,
    field: PValueField,
) -> Vec<VariantRecord> {
    records
        .into_iter()
        .filter(|r| passes(r.p_value(field), threshold))
        .collect()
}

pub fn filter_matched(
    records: Vec<MatchedRecord>,
    threshold: f64,
    field: PValueField,
) -> Vec<MatchedRecord> {
    records
        .into_iter()
        .filter(|m| {
            passes(m.left.p_value(field), threshold) && passes(m.right.p_value(field), threshold)
        })
        .collect()
}

pub fn restrict_to_clump(records: Vec<VariantRecord>, clumped: &ClumpedSet) -> Vec<VariantRecord> {
    if clumped.is_empty() {
        return Vec::new();
    }
    records
        .into_iter()
        .filter(|r| r.snp.as_deref().is_some_and(|id| clumped.contains(id)))
        .collect()
}
