//! Word-level metrics over lyrics text.

use std::collections::HashSet;

const SPLIT_CHARS: [char; 14] = [
    ' ', ',', '.', ';', ':', '/', '_', '\n', '(', ')', '[', ']', '?', '!',
];

/// Split lyrics into words on spaces and common punctuation.
///
/// Empty fragments are dropped, and words keep their case.
pub fn words(text: &str) -> Vec<&str> {
    text.split(SPLIT_CHARS.as_slice())
        .filter(|word| !word.is_empty())
        .collect()
}

pub fn num_words(text: &str) -> usize {
    words(text).len()
}

/// Number of distinct words (case-sensitive).
pub fn num_unique_words(text: &str) -> usize {
    words(text).into_iter().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_split_on_punctuation() {
        assert_eq!(
            words("I, I will be king\n(And you) you will be queen!"),
            vec!["I", "I", "will", "be", "king", "And", "you", "you", "will", "be", "queen"]
        );
    }

    #[test]
    fn test_counts() {
        let lyrics = "We can be heroes, just for one day\nWe can be heroes";
        assert_eq!(num_words(lyrics), 12);
        assert_eq!(num_unique_words(lyrics), 8);
    }

    #[test]
    fn test_adjacent_separators() {
        assert_eq!(
            words("[Chorus]?!why;not:now/then_again...(yes)"),
            vec!["Chorus", "why", "not", "now", "then", "again", "yes"]
        );
        assert_eq!(num_unique_words("Ooh ooh OOH!?"), 3);
    }

    #[test]
    fn test_empty_text() {
        assert!(words("").is_empty());
        assert_eq!(num_words(" ... "), 0);
    }
}
