use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

pub const DEFAULT_KEYWORD_COUNT: usize = 10;

// NLTK English stop-word list.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word pattern"));

/// Returns up to `k` of the most frequent non-stop-word tokens in `text`,
/// most frequent first. Ties keep the order in which tokens first appeared.
pub fn extract_keywords(text: &str, k: usize) -> Vec<String> {
    let lowered = text.to_lowercase();

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for token in WORD.find_iter(&lowered).map(|m| m.as_str()) {
        if token.chars().count() <= 2 || STOP_WORD_SET.contains(token) {
            continue;
        }
        match first_seen.get(token) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                first_seen.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(k)
        .map(|(token, _)| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_by_first_occurrence() {
        let keywords = extract_keywords("the cat sat on the mat the cat ran", 2);
        assert_eq!(keywords, vec!["cat", "sat"]);
    }

    #[test]
    fn stop_words_and_short_tokens_are_dropped() {
        let keywords = extract_keywords("It is an ox by the sea; we go to sea.", 10);
        assert_eq!(keywords, vec!["sea"]);
    }

    #[test]
    fn counting_is_case_insensitive() {
        let keywords = extract_keywords("Photosynthesis PHOTOSYNTHESIS chlorophyll", 10);
        assert_eq!(keywords, vec!["photosynthesis", "chlorophyll"]);
    }

    #[test]
    fn respects_requested_count() {
        let text = "alpha beta gamma delta epsilon alpha beta alpha";
        assert_eq!(extract_keywords(text, 3), vec!["alpha", "beta", "gamma"]);
        assert!(extract_keywords(text, 0).is_empty());
        assert_eq!(extract_keywords(text, DEFAULT_KEYWORD_COUNT).len(), 5);
    }

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract_keywords("", DEFAULT_KEYWORD_COUNT).is_empty());
    }
}
