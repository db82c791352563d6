//! Closest-match lookup for command suggestions

/// Edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `1 - distance / longest length`, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// The candidate most similar to `word` scoring at least `cutoff`.
/// Comparison ignores case; ties go to the earlier candidate.
pub fn close_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let word = word.to_lowercase();
    let mut best: Option<(&'a str, f64)> = None;

    for candidate in candidates {
        let score = similarity(&word, &candidate.to_lowercase());
        if score < cutoff {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("silence", "silence"), 0);
    }

    #[test]
    fn test_close_match_cutoff() {
        let names = ["help", "silence", "tags"];
        assert_eq!(close_match("slience", names, 0.6), Some("silence"));
        assert_eq!(close_match("hlep", names, 0.6), Some("help"));
        assert_eq!(close_match("xyzzy", names, 0.6), None);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        assert_eq!(close_match("tag", ["tab", "tap"], 0.6), Some("tab"));
    }
}
