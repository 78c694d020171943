//! Character-level statistics over a whole URL string.

use std::collections::BTreeMap;

/// Counts of character classes over a string, by `char`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharStats {
    pub len: usize,
    pub digits: usize,
    pub letters: usize,
    pub uppercase: usize,
    pub vowels: usize,
    pub consonants: usize,
}

impl CharStats {
    pub fn of(s: &str) -> Self {
        let mut st = CharStats::default();
        for c in s.chars() {
            st.len += 1;
            if c.is_numeric() {
                st.digits += 1;
            }
            if c.is_alphabetic() {
                st.letters += 1;
            }
            if c.is_uppercase() {
                st.uppercase += 1;
            }
            if c.is_ascii_alphabetic() {
                if matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u') {
                    st.vowels += 1;
                } else {
                    st.consonants += 1;
                }
            }
        }
        st
    }
}

/// `num / den`, or 0 when the denominator is zero.
pub fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Shannon entropy (bits) of the character distribution; 0 for empty input.
pub fn shannon_entropy(s: &str) -> f64 {
    // ordered so the float sum is the same on every call
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let h = counts
        .values()
        .map(|&k| {
            let p = k as f64 / n;
            -p * p.log2()
        })
        .sum::<f64>();
    // a single repeated symbol yields -0.0
    h.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_repeated_char_is_zero() {
        for n in [1, 2, 17, 300] {
            assert_eq!(shannon_entropy(&"a".repeat(n)), 0.0);
        }
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn entropy_of_uniform_distinct_chars_is_log2() {
        let h = shannon_entropy("abcdefgh");
        assert!((h - 3.0).abs() < 1e-12);
        let h = shannon_entropy("abcdabcdabcd");
        assert!((h - 2.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_is_bit_identical_across_calls() {
        let url = "https://www.google.com/search?q=r%C3%BCst&hl=en#top";
        let first = shannon_entropy(url).to_bits();
        for _ in 0..200 {
            assert_eq!(shannon_entropy(url).to_bits(), first);
        }
    }

    #[test]
    fn char_stats_classes() {
        let st = CharStats::of("Ab1-É");
        assert_eq!(st.len, 5);
        assert_eq!(st.digits, 1);
        assert_eq!(st.letters, 3);
        assert_eq!(st.uppercase, 2);
        assert_eq!(st.vowels, 1);
        assert_eq!(st.consonants, 1);
    }

    #[test]
    fn ratio_with_zero_denominator() {
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }
}
