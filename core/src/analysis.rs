use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

use crate::document::FieldName;
use crate::error::Result;
use crate::tokenizer::{Token, TokenStream, Tokenizer, WhitespaceTokenizer};

lazy_static! {
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

const FULL_TEXT: &[TokenFilter] = &[
    TokenFilter::Normalize,
    TokenFilter::StripPunctuation,
    TokenFilter::StopWords,
    TokenFilter::Stem,
];
const KEYWORD: &[TokenFilter] = &[TokenFilter::Normalize, TokenFilter::StripPunctuation];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFilter {
    /// NFKC normalization and lowercasing.
    Normalize,
    StripPunctuation,
    StopWords,
    Stem,
}

impl TokenFilter {
    /// Rewrites `token` in place; `false` means the token is dropped.
    fn apply(&self, token: &mut Token) -> bool {
        match self {
            TokenFilter::Normalize => {
                let normalized = token.text().nfkc().collect::<String>().to_lowercase();
                token.set_text(normalized);
            }
            TokenFilter::StripPunctuation => {
                let stripped = token.text().trim_matches(|c: char| !c.is_alphanumeric()).to_string();
                token.set_text(stripped);
            }
            TokenFilter::StopWords => {
                if STOPWORDS.contains(token.text()) {
                    return false;
                }
            }
            TokenFilter::Stem => {
                let stem = STEMMER.stem(token.text()).into_owned();
                token.set_text(stem);
            }
        }
        !token.text().is_empty()
    }
}

pub trait Analyzer {
    /// Process one more token. Returns `false` once the input is exhausted.
    fn increment(&mut self) -> bool;
    fn into_stream(self: Box<Self>) -> TokenStream;
}

/// Runs every token through a fixed list of filters.
pub struct FilterChain {
    input: std::vec::IntoIter<Token>,
    output: Vec<Token>,
    filters: Vec<TokenFilter>,
}

impl FilterChain {
    pub fn new(stream: TokenStream, filters: &[TokenFilter]) -> Self {
        Self { input: stream.into_tokens().into_iter(), output: Vec::new(), filters: filters.to_vec() }
    }
}

impl Analyzer for FilterChain {
    fn increment(&mut self) -> bool {
        let Some(mut token) = self.input.next() else { return false };
        if self.filters.iter().all(|f| f.apply(&mut token)) {
            self.output.push(token);
        }
        true
    }

    fn into_stream(self: Box<Self>) -> TokenStream { TokenStream::new(self.output) }
}

pub trait AnalyzerFactory {
    fn analyzer_for_field(&self, field: FieldName, stream: TokenStream) -> Box<dyn Analyzer>;
}

/// Stemmed, stopword-free text for TITLE and CONTENT; lowercased keywords elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyzers;

impl AnalyzerFactory for StandardAnalyzers {
    fn analyzer_for_field(&self, field: FieldName, stream: TokenStream) -> Box<dyn Analyzer> {
        let filters = match field {
            FieldName::Title | FieldName::Content => FULL_TEXT,
            FieldName::Author
            | FieldName::AuthorOrg
            | FieldName::Category
            | FieldName::NewsDate
            | FieldName::Place
            | FieldName::FileId => KEYWORD,
        };
        Box::new(FilterChain::new(stream, filters))
    }
}

/// A tokenizer paired with the analyzer factory used to normalize its output.
pub struct Pipeline {
    tokenizer: Box<dyn Tokenizer + Send + Sync>,
    analyzers: Box<dyn AnalyzerFactory + Send + Sync>,
}

impl Pipeline {
    pub fn new<T, F>(tokenizer: T, analyzers: F) -> Self
    where
        T: Tokenizer + Send + Sync + 'static,
        F: AnalyzerFactory + Send + Sync + 'static,
    {
        Self { tokenizer: Box::new(tokenizer), analyzers: Box::new(analyzers) }
    }

    pub fn standard() -> Self { Self::new(WhitespaceTokenizer, StandardAnalyzers) }

    /// Tokenize `text`, optionally tag every token as a title word, then run
    /// the analyzer selected for `field` to completion.
    pub fn analyze(&self, field: FieldName, text: &str, title: bool) -> Result<TokenStream> {
        let mut stream = self.tokenizer.consume(text)?;
        if title {
            while let Some(token) = stream.advance() {
                token.mark_as_title_word();
            }
            stream.reset();
        }
        let mut analyzer = self.analyzers.analyzer_for_field(field, stream);
        while analyzer.increment() {}
        let mut stream = analyzer.into_stream();
        stream.reset();
        Ok(stream)
    }

    /// Normalize lookup text the way `field` was normalized at index time.
    /// Text the tokenizer rejects yields no terms.
    pub fn normalize(&self, field: FieldName, text: &str) -> Vec<String> {
        match self.analyze(field, text, false) {
            Ok(stream) => stream.iter().map(|t| t.to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Free query text is matched against CONTENT terms.
    pub fn normalize_query(&self, text: &str) -> Vec<String> { self.normalize(FieldName::Content, text) }
}

impl Default for Pipeline {
    fn default() -> Self { Self::standard() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(stream: &TokenStream) -> Vec<String> {
        stream.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn content_is_stemmed_and_filtered() {
        let stream = Pipeline::standard().analyze(FieldName::Content, "The Runners were RUNNING, quickly!", false).unwrap();
        let w = words(&stream);
        assert!(w.contains(&"run".to_string()));
        assert!(w.contains(&"quick".to_string()));
        assert!(!w.contains(&"the".to_string()));
        assert!(!w.contains(&"were".to_string()));
    }

    #[test]
    fn keyword_fields_keep_whole_words() {
        let stream = Pipeline::standard().analyze(FieldName::Place, "São Paulo,", false).unwrap();
        assert_eq!(words(&stream), vec!["são", "paulo"]);
    }

    #[test]
    fn title_tokens_are_tagged() {
        let stream = Pipeline::standard().analyze(FieldName::Title, "Crude oil prices", true).unwrap();
        assert_eq!(stream.len(), 3);
        assert!(stream.iter().all(|t| t.is_title_word()));
    }

    #[test]
    fn punctuation_only_tokens_are_dropped() {
        let stream = Pipeline::standard().analyze(FieldName::Author, "-- Reuters --", false).unwrap();
        assert_eq!(words(&stream), vec!["reuters"]);
    }

    #[test]
    fn analyzer_reports_exhaustion() {
        let stream = WhitespaceTokenizer.consume("one two").unwrap();
        let mut analyzer = StandardAnalyzers.analyzer_for_field(FieldName::Category, stream);
        assert!(analyzer.increment());
        assert!(analyzer.increment());
        assert!(!analyzer.increment());
        assert_eq!(words(&analyzer.into_stream()), vec!["one", "two"]);
    }

    #[test]
    fn query_normalization_matches_content() {
        assert_eq!(Pipeline::standard().normalize_query("Running dogs"), vec!["run", "dog"]);
        assert!(Pipeline::standard().normalize_query("   ").is_empty());
    }

    #[test]
    fn keyword_lookups_use_the_field_analyzer() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.normalize_query("Paris"), vec!["pari"]);
        assert_eq!(pipeline.normalize(FieldName::Place, "Paris"), vec!["paris"]);
        assert_eq!(pipeline.normalize(FieldName::Content, "Paris"), pipeline.normalize_query("Paris"));
    }
}
