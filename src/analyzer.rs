use lindera::dictionary::load_dictionary;
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{CloudError, Result};

/// Sejong tags counted as nouns: general, proper, bound, counting-unit bound,
/// numerals and pronouns.
const NOUN_TAGS: &[&str] = &["NNG", "NNP", "NNB", "NNBC", "NR", "NP"];

/// Tags the dictionary assigns to out-of-vocabulary words
const UNKNOWN_TAGS: &[&str] = &["UNKNOWN", "UNK"];

/// Token information from morphological analysis
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// Surface form (표층형)
    pub surface: String,
    /// Part-of-speech tag (품사 태그), e.g. `NNG` or `NP+JKS`
    pub pos: String,
    /// Morpheme breakdown of multi-morpheme entries, e.g. `나/NP/*+가/JKS/*`.
    /// `None` for single-morpheme entries.
    pub expression: Option<String>,
}

impl TokenInfo {
    /// Noun morphemes carried by this token, in order.
    ///
    /// A single-morpheme token is a noun when its tag is a noun tag. Entries
    /// that fuse several morphemes (`내가` = `나` + `가`) yield only their noun
    /// parts, so particles never stay attached.
    pub fn nouns(&self) -> Vec<String> {
        if NOUN_TAGS.contains(&self.pos.as_str()) {
            return vec![self.surface.clone()];
        }

        if self.pos.contains('+') {
            return self
                .expression
                .as_deref()
                .map(noun_morphemes)
                .unwrap_or_default();
        }

        // Out-of-vocabulary Hangul words are overwhelmingly names and loanwords.
        if UNKNOWN_TAGS.contains(&self.pos.as_str())
            && !self.surface.is_empty()
            && self.surface.chars().all(is_hangul_syllable)
        {
            return vec![self.surface.clone()];
        }

        Vec::new()
    }
}

/// Noun surfaces out of a `surface/tag/class+surface/tag/class` expression.
fn noun_morphemes(expression: &str) -> Vec<String> {
    expression
        .split('+')
        .filter_map(|morpheme| {
            let mut parts = morpheme.split('/');
            let surface = parts.next()?;
            let tag = parts.next()?;
            (!surface.is_empty() && NOUN_TAGS.contains(&tag)).then(|| surface.to_string())
        })
        .collect()
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Produces noun tokens in order of appearance.
pub trait NounExtractor: Send + Sync {
    fn nouns(&self, text: &str) -> Result<Vec<String>>;
}

/// Nouns of at least two user-perceived characters, in order of appearance,
/// duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NounList(Vec<String>);

impl NounList {
    /// Keep only tokens longer than one character. Single syllables are mostly
    /// particles or fragments.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| t.graphemes(true).count() > 1)
                .collect(),
        )
    }

    /// Single-space-joined pseudo-document for the renderer
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run the extractor over `text` and apply the length filter.
pub fn extract_nouns(extractor: &dyn NounExtractor, text: &str) -> Result<NounList> {
    Ok(NounList::from_tokens(extractor.nouns(text)?))
}

/// Morphological analyzer using Lindera with the Korean ko-dic dictionary
pub struct MorphologicalAnalyzer {
    tokenizer: Tokenizer,
}

impl MorphologicalAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let dictionary = load_dictionary("embedded://ko-dic")?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        let tokenizer = Tokenizer::new(segmenter);
        Ok(Self { tokenizer })
    }

    /// Tokenize text and return token information
    pub fn tokenize(&self, text: &str) -> Result<Vec<TokenInfo>> {
        let mut tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| CloudError::Analysis(e.to_string()))?;

        let mut result = Vec::with_capacity(tokens.len());
        for token in tokens.iter_mut() {
            let surface = token.surface.as_ref().to_string();

            // ko-dic layout: tag, semantic class, final consonant, reading, type,
            // first tag, last tag, expression
            let details = token.details();
            let pos = details.first().map(|s| s.to_string()).unwrap_or_else(|| "*".to_string());
            let expression = details
                .get(7)
                .filter(|e| !e.is_empty() && **e != "*")
                .map(|e| e.to_string());

            result.push(TokenInfo {
                surface,
                pos,
                expression,
            });
        }

        Ok(result)
    }
}

impl NounExtractor for MorphologicalAnalyzer {
    fn nouns(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.tokenize(text)?.iter().flat_map(TokenInfo::nouns).collect())
    }
}
