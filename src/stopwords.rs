//! Stop words excluded from the rendered cloud.

use std::collections::HashSet;

/// The conventional English word-cloud stop list.
pub const BASE_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "com", "could", "couldn't", "did", "didn't",
    "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "else", "ever", "few",
    "for", "from", "further", "get", "had", "hadn't", "has", "hasn't", "have", "haven't",
    "having", "he", "he'd", "he'll", "he's", "hence", "her", "here", "here's", "hers", "herself",
    "him", "himself", "his", "how", "how's", "however", "http", "i", "i'd", "i'll", "i'm", "i've",
    "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "k", "let's", "like",
    "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of", "off", "on", "once",
    "only", "or", "other", "otherwise", "ought", "our", "ours", "ourselves", "out", "over", "own",
    "r", "same", "shall", "shan't", "she", "she'd", "she'll", "she's", "should", "shouldn't",
    "since", "so", "some", "such", "than", "that", "that's", "the", "their", "theirs", "them",
    "themselves", "then", "there", "there's", "therefore", "these", "they", "they'd", "they'll",
    "they're", "they've", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "wasn't", "we", "we'd", "we'll", "we're", "we've", "were", "weren't", "what", "what's",
    "when", "when's", "where", "where's", "which", "while", "who", "who's", "whom", "why", "why's",
    "with", "won't", "would", "wouldn't", "www", "you", "you'd", "you'll", "you're", "you've",
    "your", "yours", "yourself", "yourselves",
];

/// Korean filler words (conjunctions, light verbs, bound nouns).
pub const KOREAN_STOPWORDS: &[&str] = &["그리고", "하지만", "있다", "하는", "것", "수", "위한"];

/// Set of tokens excluded from rendering. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWordSet {
    words: HashSet<String>,
}

impl StopWordSet {
    /// Base set plus the Korean additions.
    pub fn new() -> Self {
        BASE_STOPWORDS
            .iter()
            .chain(KOREAN_STOPWORDS)
            .map(|w| w.to_string())
            .collect()
    }

    /// Default set extended with configured words.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        set.extend(extra);
        set
    }

    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words
            .extend(words.into_iter().map(Into::into).filter(|w: &String| !w.is_empty()));
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopWordSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<String> for StopWordSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_union() {
        let set = StopWordSet::new();

        assert!(set.contains("the"));
        assert!(set.contains("그리고"));
        assert!(set.contains("위한"));
        assert_eq!(set.len(), BASE_STOPWORDS.len() + KOREAN_STOPWORDS.len());
    }

    #[test]
    fn test_exact_case_sensitive_match() {
        let set = StopWordSet::new();

        assert!(set.contains("and"));
        assert!(!set.contains("And"));
        assert!(!set.contains("그리고는"));
    }

    #[test]
    fn test_extra_words_deduplicated() {
        let set = StopWordSet::with_extra(["그리고", "이것", ""]);

        assert!(set.contains("이것"));
        assert!(!set.contains(""));
        assert_eq!(set.len(), StopWordSet::new().len() + 1);
    }
}
