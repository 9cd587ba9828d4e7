use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    pub chromosome: String,
    pub position: u64,
}

impl VariantKey {
    pub fn new(chromosome: &str, position: u64) -> Self {
        Self {
            chromosome: normalize_chromosome(chromosome),
            position,
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chromosome, self.position)
    }
}

// Annotation files say `chrN` and cohort files say `N`; both map to `N`.
pub fn normalize_chromosome(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = if trimmed.len() >= 3 && trimmed[..3].eq_ignore_ascii_case("chr") {
        &trimmed[3..]
    } else {
        trimmed
    };
    if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit()) {
        let digits = stripped.trim_start_matches('0');
        return if digits.is_empty() {
            "0".to_string()
        } else {
            digits.to_string()
        };
    }
    let upper = stripped.to_ascii_uppercase();
    if upper == "M" {
        "MT".to_string()
    } else {
        upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortSchema {
    Bbj,
    Ukbb,
}

impl CohortSchema {
    pub fn label(self) -> &'static str {
        match self {
            CohortSchema::Bbj => "BBJ",
            CohortSchema::Ukbb => "UKBB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    Z,
    ZAdjusted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PValueField {
    Reported,
    Adjusted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    pub key: VariantKey,
    pub snp: Option<String>,
    pub effect_allele: String,
    pub other_allele: Option<String>,
    pub frequency: Option<f64>,
    pub beta: f64,
    pub se: f64,
    pub z: f64,
    pub z_norm: Option<f64>,
    pub z_adjusted: Option<f64>,
    pub z_adjusted_norm: Option<f64>,
    pub p: Option<f64>,
    pub p_adjusted: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStatistic {
    MissingBeta,
    InvalidSe,
    NonFiniteZ,
}

impl VariantRecord {
    pub fn new(
        key: VariantKey,
        effect_allele: &str,
        beta: Option<f64>,
        se: Option<f64>,
    ) -> Result<Self, InvalidStatistic> {
        let beta = beta
            .filter(|b| b.is_finite())
            .ok_or(InvalidStatistic::MissingBeta)?;
        let se = se
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or(InvalidStatistic::InvalidSe)?;
        let z = beta / se;
        if !z.is_finite() {
            return Err(InvalidStatistic::NonFiniteZ);
        }
        Ok(Self {
            key,
            snp: None,
            effect_allele: effect_allele.trim().to_ascii_uppercase(),
            other_allele: None,
            frequency: None,
            beta,
            se,
            z,
            z_norm: None,
            z_adjusted: None,
            z_adjusted_norm: None,
            p: None,
            p_adjusted: None,
        })
    }

    pub fn stat(&self, field: StatField) -> Option<f64> {
        match field {
            StatField::Z => Some(self.z),
            StatField::ZAdjusted => self.z_adjusted,
        }
    }

    pub fn p_value(&self, field: PValueField) -> Option<f64> {
        match field {
            PValueField::Reported => self.p,
            PValueField::Adjusted => self.p_adjusted,
        }
    }

    // The only place a record's coding is flipped.
    pub fn flip_to(&mut self, allele: &str) {
        let previous = std::mem::replace(&mut self.effect_allele, allele.to_string());
        self.other_allele = Some(previous);
        self.frequency = self.frequency.map(|f| 1.0 - f);
        self.beta = -self.beta;
        self.z = -self.z;
        self.z_norm = self.z_norm.map(|v| -v);
        self.z_adjusted = self.z_adjusted.map(|v| -v);
        self.z_adjusted_norm = self.z_adjusted_norm.map(|v| -v);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub key: VariantKey,
    pub left: VariantRecord,
    pub right: VariantRecord,
    pub allele_flipped: bool,
    pub strand_ambiguous: bool,
}
