//! Fundamental types used by this crate: documents, tokens and the views annotating them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::ops::Range;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// Names of the views known to this crate.
pub mod view_names {
    pub const TOKENS: &str = "TOKENS";
    pub const POS: &str = "POS";
    pub const LEMMA: &str = "LEMMA";
    pub const SHALLOW_PARSE: &str = "SHALLOW_PARSE";
    pub const NER_CONLL: &str = "NER_CONLL";
    pub const SENSE_VERB: &str = "SENSE_VERB";
}

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error("view {0:?} does not exist.")]
    UnknownView(String),
    #[error("constituent {start}..{end} of view {view} is out of bounds for {n_tokens} tokens.")]
    OutOfBounds {
        view: String,
        start: usize,
        end: usize,
        n_tokens: usize,
    },
    #[error("view is stored as {key:?} but named {name:?}.")]
    NameMismatch { key: String, name: String },
    #[error("invalid sentence boundaries {0:?}.")]
    InvalidSentences(Vec<usize>),
}

/// Byte and char span of a token in the document text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub byte: Range<usize>,
    pub char: Range<usize>,
}

impl Span {
    pub fn new(byte: Range<usize>, char: Range<usize>) -> Self {
        Span { byte, char }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, span: Span) -> Self {
        Token {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// A labeled range of tokens `[start, end)` in a [View].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub label: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub score: f32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
}

impl Constituent {
    pub fn new<S: Into<String>>(label: S, start: usize, end: usize) -> Self {
        Constituent {
            label: label.into(),
            start,
            end,
            score: 0.,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|x| x.as_str())
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, token: usize) -> bool {
        self.start <= token && token < self.end
    }
}

/// One kind of annotation over the tokens of a [Document] e. g. part-of-speech tags or chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    name: String,
    generator: String,
    #[serde(default)]
    score: f32,
    constituents: Vec<Constituent>,
}

impl View {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, generator: S2) -> Self {
        View {
            name: name.into(),
            generator: generator.into(),
            score: 0.,
            constituents: Vec::new(),
        }
    }

    /// Builds a token-level view (e. g. POS, LEMMA) with exactly one constituent per token.
    pub fn token_labels<I, S>(name: &str, generator: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut view = View::new(name, generator);
        view.constituents = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| Constituent::new(label, i, i + 1))
            .collect();
        view
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn push(&mut self, constituent: Constituent) {
        self.constituents.push(constituent);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    /// All constituents covering the given token.
    pub fn covering(&self, token: usize) -> impl Iterator<Item = &Constituent> {
        self.constituents.iter().filter(move |x| x.contains(token))
    }

    /// The label of the first constituent covering the given token.
    pub fn label_at(&self, token: usize) -> Option<&str> {
        self.covering(token).next().map(|x| x.label.as_str())
    }

    fn check_bounds(&self, n_tokens: usize) -> Result<(), Error> {
        match self
            .constituents
            .iter()
            .find(|x| x.start >= x.end || x.end > n_tokens)
        {
            Some(x) => Err(Error::OutOfBounds {
                view: self.name.clone(),
                start: x.start,
                end: x.end,
                n_tokens,
            }),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct DocumentFields {
    id: String,
    text: String,
    tokens: Vec<Token>,
    sentence_ends: Vec<usize>,
    #[serde(default)]
    views: IndexMap<String, View>,
}

/// One unit of text: its tokens, sentence boundaries and a mapping from view names to views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentFields")]
pub struct Document {
    id: String,
    text: String,
    tokens: Vec<Token>,
    sentence_ends: Vec<usize>,
    views: IndexMap<String, View>,
}

impl TryFrom<DocumentFields> for Document {
    type Error = Error;

    fn try_from(fields: DocumentFields) -> Result<Self, Self::Error> {
        let n_tokens = fields.tokens.len();
        let ends = &fields.sentence_ends;

        let sorted = ends.windows(2).all(|x| x[0] < x[1]);
        let complete = match ends.last() {
            Some(last) => *last == n_tokens && ends[0] > 0,
            None => n_tokens == 0,
        };
        if !sorted || !complete {
            return Err(Error::InvalidSentences(fields.sentence_ends));
        }

        for (key, view) in fields.views.iter() {
            if key != view.name() {
                return Err(Error::NameMismatch {
                    key: key.clone(),
                    name: view.name.clone(),
                });
            }
            view.check_bounds(n_tokens)?;
        }

        Ok(Document {
            id: fields.id,
            text: fields.text,
            tokens: fields.tokens,
            sentence_ends: fields.sentence_ends,
            views: fields.views,
        })
    }
}

impl Document {
    /// Splits the text into sentences and tokens at unicode boundaries. Whitespace is dropped.
    pub fn from_text<S: Into<String>>(id: S, text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut sentence_ends = Vec::new();

        let mut prev_byte = 0;
        let mut prev_char = 0;

        for (sentence_start, sentence) in text.split_sentence_bound_indices() {
            for (offset, word) in sentence.split_word_bound_indices() {
                if word.trim().is_empty() {
                    continue;
                }

                let byte_start = sentence_start + offset;
                let char_start = prev_char + text[prev_byte..byte_start].chars().count();
                let char_end = char_start + word.chars().count();

                tokens.push(Token::new(
                    word,
                    Span::new(byte_start..byte_start + word.len(), char_start..char_end),
                ));

                prev_byte = byte_start + word.len();
                prev_char = char_end;
            }

            if tokens.len() > sentence_ends.last().copied().unwrap_or(0) {
                sentence_ends.push(tokens.len());
            }
        }

        Document {
            id: id.into(),
            text: text.to_string(),
            tokens,
            sentence_ends,
            views: IndexMap::new(),
        }
    }

    /// Creates a document from pretokenized sentences. Tokens are joined by single spaces.
    pub fn from_tokens<S: Into<String>, T: AsRef<str>>(id: S, sentences: &[Vec<T>]) -> Self {
        let mut text = String::new();
        let mut tokens = Vec::new();
        let mut sentence_ends = Vec::new();

        for sentence in sentences {
            for token in sentence {
                let token = token.as_ref();
                if !text.is_empty() {
                    text.push(' ');
                }

                let byte_start = text.len();
                let char_start = text.chars().count();
                text.push_str(token);

                tokens.push(Token::new(
                    token,
                    Span::new(
                        byte_start..text.len(),
                        char_start..char_start + token.chars().count(),
                    ),
                ));
            }

            if tokens.len() > sentence_ends.last().copied().unwrap_or(0) {
                sentence_ends.push(tokens.len());
            }
        }

        Document {
            id: id.into(),
            text,
            tokens,
            sentence_ends,
            views: IndexMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token ranges of the sentences in order. Sentences are never empty and have no gaps.
    pub fn sentences(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let starts = std::iter::once(0).chain(self.sentence_ends.iter().copied());
        starts.zip(self.sentence_ends.iter().copied()).map(|(start, end)| start..end)
    }

    pub fn sentence_of(&self, token: usize) -> Option<Range<usize>> {
        self.sentences().find(|range| range.contains(&token))
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn view(&self, name: &str) -> Result<&View, Error> {
        self.views
            .get(name)
            .ok_or_else(|| Error::UnknownView(name.to_string()))
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(|x| x.as_str())
    }

    /// Adds a view under its name. An existing view with the same name is replaced in place and returned.
    pub fn add_view(&mut self, view: View) -> Result<Option<View>, Error> {
        view.check_bounds(self.tokens.len())?;
        Ok(self.views.insert(view.name.clone(), view))
    }

    pub fn remove_view(&mut self, name: &str) -> Option<View> {
        self.views.shift_remove(name)
    }
}
