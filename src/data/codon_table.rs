//! Standard genetic code for the 61 sense codons.

/// Sense codons (RNA alphabet) and the amino acid each encodes.
///
/// Codons of one amino acid are contiguous, so the order of first appearance
/// of each amino acid is the column order used for aggregated features.
pub const CODON_TABLE: [(&str, char); 61] = [
    ("GCU", 'A'), ("GCC", 'A'), ("GCA", 'A'), ("GCG", 'A'),
    ("CGU", 'R'), ("CGC", 'R'), ("CGA", 'R'), ("CGG", 'R'), ("AGA", 'R'), ("AGG", 'R'),
    ("GGU", 'G'), ("GGC", 'G'), ("GGA", 'G'), ("GGG", 'G'),
    ("AAA", 'K'), ("AAG", 'K'),
    ("UUU", 'F'), ("UUC", 'F'),
    ("CCU", 'P'), ("CCC", 'P'), ("CCA", 'P'), ("CCG", 'P'),
    ("UCU", 'S'), ("UCC", 'S'), ("UCA", 'S'), ("UCG", 'S'), ("AGU", 'S'), ("AGC", 'S'),
    ("AUU", 'I'), ("AUC", 'I'), ("AUA", 'I'),
    ("AUG", 'M'),
    ("GUU", 'V'), ("GUC", 'V'), ("GUA", 'V'), ("GUG", 'V'),
    ("UUA", 'L'), ("UUG", 'L'), ("CUU", 'L'), ("CUC", 'L'), ("CUA", 'L'), ("CUG", 'L'),
    ("ACU", 'T'), ("ACC", 'T'), ("ACA", 'T'), ("ACG", 'T'),
    ("UAU", 'Y'), ("UAC", 'Y'),
    ("CAA", 'Q'), ("CAG", 'Q'),
    ("AAU", 'N'), ("AAC", 'N'),
    ("GAU", 'D'), ("GAC", 'D'),
    ("UGU", 'C'), ("UGC", 'C'),
    ("GAA", 'E'), ("GAG", 'E'),
    ("CAU", 'H'), ("CAC", 'H'),
    ("UGG", 'W'),
];

/// Canonical form of a column header: trimmed, upper-case, RNA alphabet.
pub fn canonical_codon(header: &str) -> String {
    header
        .trim()
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            'T' => 'U',
            other => other,
        })
        .collect()
}

/// Position of a codon in [`CODON_TABLE`], accepting DNA or RNA notation.
pub fn codon_index(header: &str) -> Option<usize> {
    let codon = canonical_codon(header);
    CODON_TABLE.iter().position(|(c, _)| *c == codon)
}

/// Amino acid encoded by a codon, if it is a known sense codon.
pub fn amino_acid_for(header: &str) -> Option<char> {
    codon_index(header).map(|i| CODON_TABLE[i].1)
}

/// The 20 amino acids in table order.
pub fn amino_acids() -> Vec<char> {
    let mut seen = Vec::with_capacity(20);
    for &(_, aa) in CODON_TABLE.iter() {
        if !seen.contains(&aa) {
            seen.push(aa);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_sense_codons() {
        assert_eq!(CODON_TABLE.len(), 61);
        let mut codons: Vec<&str> = CODON_TABLE.iter().map(|(c, _)| *c).collect();
        codons.sort_unstable();
        codons.dedup();
        assert_eq!(codons.len(), 61);
        // Stop codons are not part of the table
        for stop in ["UAA", "UAG", "UGA"] {
            assert!(amino_acid_for(stop).is_none());
        }
    }

    #[test]
    fn test_amino_acid_order() {
        let aas: String = amino_acids().into_iter().collect();
        assert_eq!(aas, "ARGKFPSIMVLTYQNDCEHW");
    }

    #[test]
    fn test_dna_and_case_normalization() {
        assert_eq!(amino_acid_for("GCU"), Some('A'));
        assert_eq!(amino_acid_for(" gct "), Some('A'));
        assert_eq!(amino_acid_for("ATG"), Some('M'));
        assert_eq!(amino_acid_for("Kingdom"), None);
    }
}
