//! Fuzzy string similarity
//!
//! Scores follow the matching-blocks ratio: `round(100 * 2M / T)` where `M` is
//! the number of characters in the matching blocks of the two normalized
//! strings and `T` their combined length. Matching blocks are found by the
//! classic longest-common-block recursion, so the scores line up with the ones
//! the catalog team tuned the threshold against.

use std::collections::HashMap;

/// Minimum score for a fuzzy candidate to be accepted
pub const FUZZY_MATCH_THRESHOLD: u8 = 70;

/// Lowercase, replace anything that is not a letter, digit or underscore with a
/// space, and trim
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Similarity of two raw strings, 0-100. Either side empty after
/// normalization scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let matched = matching_characters(&a, &b);
    scaled_ratio(matched, a.len() + b.len())
}

/// Best-scoring choice for `query`. Ties keep the earliest choice.
pub fn extract_one<'a, S: AsRef<str>>(query: &str, choices: &'a [S]) -> Option<(&'a str, u8)> {
    let mut best: Option<(&'a str, u8)> = None;
    for choice in choices {
        let score = ratio(query, choice.as_ref());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((choice.as_ref(), score));
        }
    }
    best
}

/// `round(100 * 2M / T)` with halves rounded to even
fn scaled_ratio(matched: usize, total: usize) -> u8 {
    let numerator = 200 * matched;
    let quotient = numerator / total;
    let twice_remainder = 2 * (numerator % total);

    let rounded = match twice_remainder.cmp(&total) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 0 => quotient,
        std::cmp::Ordering::Equal => quotient + 1,
    };
    rounded.min(100) as u8
}

/// Total size of the matching blocks between `a` and `b`
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let index = BIndex::new(b);
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = index.longest_match(a, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Positions of each character of `b`, minus the "popular" characters that
/// are dropped for long sequences
struct BIndex<'b> {
    b: &'b [char],
    positions: HashMap<char, Vec<usize>>,
}

impl<'b> BIndex<'b> {
    fn new(b: &'b [char]) -> Self {
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            positions.entry(*c).or_default().push(j);
        }

        if b.len() >= 200 {
            let limit = b.len() / 100 + 1;
            positions.retain(|_, js| js.len() <= limit);
        }

        Self { b, positions }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given ranges,
    /// preferring the smallest `i`, then the smallest `j`
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
        let mut run_at: HashMap<usize, usize> = HashMap::new();

        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next_run_at = HashMap::new();
            if let Some(js) = self.positions.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run_at.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            run_at = next_run_at;
        }

        // Grow across characters dropped from the index
        while best_i > alo && best_j > blo && a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi
            && best_j + best_k < bhi
            && a[best_i + best_k] == self.b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Paracetamol-500mg! "), "paracetamol 500mg");
        assert_eq!(normalize("vit_d3"), "vit_d3");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_identical_and_empty() {
        assert_eq!(ratio("Aspirin", "aspirin"), 100);
        assert_eq!(ratio("", "aspirin"), 0);
        assert_eq!(ratio("...", "aspirin"), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        // 7 matching characters over 20: 70
        assert_eq!(ratio("abcdefgxyz", "abcdefgpqr"), 70);
        // 9 matching characters over 26: 69.2
        assert_eq!(ratio("abcdefghiwxyz", "abcdefghipqrs"), 69);
    }

    #[test]
    fn test_known_drug_scores() {
        assert_eq!(ratio("paracetamol", "Paracetamol 500mg"), 79);
        assert_eq!(ratio("paracetmol", "Paracetamol 500mg"), 74);
    }

    #[test]
    fn test_half_rounds_to_even() {
        // 200 * 1 / 8 = 25.0, exact
        assert_eq!(scaled_ratio(1, 8), 25);
        // 200 * 1 / 16 = 12.5 -> 12
        assert_eq!(scaled_ratio(1, 16), 12);
        // 200 * 3 / 16 = 37.5 -> 38
        assert_eq!(scaled_ratio(3, 16), 38);
    }

    #[test]
    fn test_blocks_recurse_on_both_sides() {
        // "ab" + "cd" around a mismatch on each side
        let a: Vec<char> = "abxcd".chars().collect();
        let b: Vec<char> = "abycd".chars().collect();
        assert_eq!(matching_characters(&a, &b), 4);
    }

    #[test]
    fn test_extract_one_keeps_first_of_ties() {
        let choices = ["Aspirin", "Aspirin", "Ibuprofen"];
        assert_eq!(extract_one("aspirin", &choices), Some(("Aspirin", 100)));

        let choices = vec!["Crocin".to_string(), "Crosin".to_string()];
        let (name, _) = extract_one("crocin", &choices).unwrap();
        assert_eq!(name, "Crocin");

        let empty: [&str; 0] = [];
        assert_eq!(extract_one("aspirin", &empty), None);
    }
}
