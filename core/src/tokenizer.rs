use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::error::{IndexError, Result};

lazy_static! {
    static ref RE: Regex = Regex::new(r"\S+").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    title_word: bool,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), title_word: false }
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn set_text(&mut self, text: impl Into<String>) { self.text = text.into(); }
    pub fn is_title_word(&self) -> bool { self.title_word }
    pub fn mark_as_title_word(&mut self) { self.title_word = true; }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.text) }
}

/// Ordered tokens with a read cursor that can be rewound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self { Self { tokens, cursor: 0 } }

    pub fn has_next(&self) -> bool { self.cursor < self.tokens.len() }

    /// Mutable access to the next token, moving the cursor past it.
    pub fn advance(&mut self) -> Option<&mut Token> {
        let token = self.tokens.get_mut(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    pub fn reset(&mut self) { self.cursor = 0; }
    pub fn len(&self) -> usize { self.tokens.len() }
    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Token> { self.tokens.iter() }
    pub fn into_tokens(self) -> Vec<Token> { self.tokens }
}

pub trait Tokenizer {
    fn consume(&self, text: &str) -> Result<TokenStream>;
}

/// Splits raw text on whitespace. Blank input is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn consume(&self, text: &str) -> Result<TokenStream> {
        if text.trim().is_empty() {
            return Err(IndexError::Tokenize("blank input".into()));
        }
        let tokens = RE.find_iter(text).map(|m| Token::new(m.as_str())).collect();
        Ok(TokenStream::new(tokens))
    }
}
