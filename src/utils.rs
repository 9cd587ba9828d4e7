pub fn complement_base(base: char) -> Option<char> {
    match base.to_ascii_uppercase() {
        'A' => Some('T'),
        'T' => Some('A'),
        'C' => Some('G'),
        'G' => Some('C'),
        _ => None,
    }
}

pub fn complement(allele: &str) -> Option<String> {
    allele.chars().rev().map(complement_base).collect()
}

pub fn is_strand_ambiguous(a1: &str, a2: &str) -> bool {
    a1.len() == 1 && complement(a1).is_some_and(|c| c.eq_ignore_ascii_case(a2))
}
