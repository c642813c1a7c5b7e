//! Normalized edit-distance similarity and LCS length.

use crate::util::normalize_text;

/// Similarity in [0, 1] between two strings, case- and whitespace-insensitive.
///
/// 1.0 on an exact (normalized) match, 0.0 when exactly one side is empty,
/// otherwise `1 - levenshtein / max_len` over characters.
pub fn compare(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    let d = levenshtein(&a, &b);
    (1.0 - d as f64 / max_len as f64).clamp(0.0, 1.0)
}

/// Levenshtein distance with a single rolling row.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    // keep the row over the shorter side
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }
    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, x) in long.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, y) in short.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(x != y);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diag + cost);
            diag = above;
        }
    }
    row[short.len()]
}

/// Length of the longest common subsequence.
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_classic() {
        let k: Vec<char> = "kitten".chars().collect();
        let s: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&k, &s), 3);
        assert_eq!(levenshtein(&s, &k), 3);
        assert_eq!(levenshtein::<char>(&[], &k), 6);
    }

    #[test]
    fn lcs_tags() {
        let a = ["PRON", "VERB", "DET", "NOUN"];
        let b = ["PRON", "AUX", "VERB", "NOUN"];
        assert_eq!(lcs_len(&a, &b), 3);
        assert_eq!(lcs_len::<&str>(&[], &b), 0);
    }

    #[test]
    fn compare_normalizes() {
        assert_eq!(compare("Hello  World", "hello world"), 1.0);
        assert_eq!(compare("", "x"), 0.0);
        assert_eq!(compare("", "   "), 1.0);
        let s = compare("kitten", "sitting");
        assert!((s - (1.0 - 3.0 / 7.0)).abs() < 1e-9, "got {s}");
    }
}
