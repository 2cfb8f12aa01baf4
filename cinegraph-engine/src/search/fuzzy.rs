//! Fuzzy term variants
//!
//! Single-character confusable substitution for every term and, for terms of
//! at least [`OMISSION_MIN_LEN`] characters, single-character omission.

use std::collections::BTreeSet;

/// Variants generated per term at most
pub const MAX_VARIANTS_PER_TERM: usize = 10;

/// Terms shorter than this get no omission variants
pub const OMISSION_MIN_LEN: usize = 5;

/// Commonly confused characters (typing and phonetic)
const CONFUSABLES: &[(char, &[char])] = &[
    ('a', &['e']),
    ('b', &['v']),
    ('c', &['k', 's']),
    ('d', &['t']),
    ('e', &['a', 'i']),
    ('g', &['j']),
    ('i', &['y', 'e']),
    ('j', &['g']),
    ('k', &['c']),
    ('m', &['n']),
    ('n', &['m']),
    ('o', &['u']),
    ('s', &['z', 'c']),
    ('t', &['d']),
    ('u', &['o']),
    ('v', &['b']),
    ('y', &['i']),
    ('z', &['s']),
];

fn confusables(ch: char) -> &'static [char] {
    CONFUSABLES
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, subs)| *subs)
        .unwrap_or(&[])
}

/// Misspelling variants of `term`, in generation order, never `term` itself
pub fn variants(term: &str) -> Vec<String> {
    let chars: Vec<char> = term.chars().collect();
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut push = |candidate: String, out: &mut Vec<String>| {
        if candidate != term && out.len() < MAX_VARIANTS_PER_TERM && seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    };

    for (i, ch) in chars.iter().enumerate() {
        for sub in confusables(*ch) {
            let mut candidate = chars.clone();
            candidate[i] = *sub;
            push(candidate.into_iter().collect(), &mut out);
        }
    }

    if chars.len() >= OMISSION_MIN_LEN {
        for i in 0..chars.len() {
            let candidate: String = chars
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, c)| *c)
                .collect();
            push(candidate, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batman_variants_bounded() {
        let variants = variants("batman");
        assert!(!variants.is_empty());
        assert!(variants.len() <= MAX_VARIANTS_PER_TERM);
        assert!(variants.contains(&"vatman".to_string()));
        assert!(variants.contains(&"batnan".to_string()));
        assert!(!variants.contains(&"batman".to_string()));
    }

    #[test]
    fn test_short_terms_skip_omission() {
        let variants = variants("odd");
        // o→u, d→t twice
        assert_eq!(variants, vec!["udd", "otd", "odt"]);
    }

    #[test]
    fn test_omission_for_long_terms() {
        let variants = variants("xxxxx");
        assert_eq!(variants, vec!["xxxx"]);
    }
}
