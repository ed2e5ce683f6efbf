//! Preparation of documents for the labeler.
//!
//! A [Preprocessor] reads the prerequisite views of a [Document] and produces one row of
//! [TokenFeatures] per token, grouped by sentence. It never modifies the document.

use crate::types::{view_names, Document, View};
use crate::utils;

/// Everything the labeler needs to know about one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenFeatures {
    /// Index of the token in the document.
    pub index: usize,
    pub form: String,
    pub lower: String,
    pub lemma: String,
    pub pos: String,
    /// BIO encoded shallow parse label e. g. `B-VP`.
    pub chunk: String,
    /// BIO encoded named entity label e. g. `I-ORG`.
    pub ner: String,
    pub is_title_case: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSentence {
    /// Index of the first token of the sentence in the document.
    pub offset: usize,
    pub tokens: Vec<TokenFeatures>,
}

pub trait Preprocessor: Send + Sync {
    fn prepare(&self, document: &Document) -> Result<Vec<PreparedSentence>, crate::Error>;
}

impl<'a, T> Preprocessor for &'a T
where
    T: Preprocessor + ?Sized,
{
    fn prepare(&self, document: &Document) -> Result<Vec<PreparedSentence>, crate::Error> {
        (*self).prepare(document)
    }
}

fn bio_label(view: &View, token: usize) -> String {
    match view.covering(token).next() {
        Some(constituent) if constituent.start == token => format!("B-{}", constituent.label),
        Some(constituent) => format!("I-{}", constituent.label),
        None => "O".into(),
    }
}

/// Reads POS, LEMMA, SHALLOW_PARSE and NER_CONLL views.
#[derive(Debug, Clone)]
pub struct TextPreprocessor {
    /// Collapse digit runs in the token form to `#`.
    pub normalize_digits: bool,
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        TextPreprocessor {
            normalize_digits: true,
        }
    }
}

impl Preprocessor for TextPreprocessor {
    fn prepare(&self, document: &Document) -> Result<Vec<PreparedSentence>, crate::Error> {
        let view = |name: &str| {
            document
                .view(name)
                .map_err(|_| crate::Error::MissingView {
                    annotator: "TextPreprocessor".to_string(),
                    view: name.to_string(),
                })
        };

        let pos = view(view_names::POS)?;
        let lemmas = view(view_names::LEMMA)?;
        let chunks = view(view_names::SHALLOW_PARSE)?;
        let entities = view(view_names::NER_CONLL)?;

        let sentences = document
            .sentences()
            .map(|range| {
                let offset = range.start;
                let tokens = range
                    .map(|i| {
                        let text = document.tokens()[i].as_str();
                        let form = if self.normalize_digits {
                            utils::normalize_digits(text)
                        } else {
                            text.to_string()
                        };
                        let lower = form.to_lowercase();

                        TokenFeatures {
                            index: i,
                            lemma: lemmas
                                .label_at(i)
                                .map(ToOwned::to_owned)
                                .unwrap_or_else(|| lower.clone()),
                            pos: pos.label_at(i).unwrap_or_default().to_string(),
                            chunk: bio_label(chunks, i),
                            ner: bio_label(entities, i),
                            is_title_case: utils::is_title_case(text),
                            form,
                            lower,
                        }
                    })
                    .collect();

                PreparedSentence { offset, tokens }
            })
            .collect();

        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Constituent;

    fn document() -> Document {
        let mut document =
            Document::from_tokens("doc", &[vec!["Apple", "sold", "3", "phones"], vec!["Go", "!"]]);

        let views = vec![
            View::token_labels(view_names::POS, "test", vec!["NNP", "VBD", "CD", "NNS", "VB", "."]),
            View::token_labels(
                view_names::LEMMA,
                "test",
                vec!["apple", "sell", "3", "phone", "go", "!"],
            ),
        ];
        for view in views {
            document.add_view(view).unwrap();
        }

        let mut chunks = View::new(view_names::SHALLOW_PARSE, "test");
        chunks.push(Constituent::new("NP", 0, 1));
        chunks.push(Constituent::new("VP", 1, 2));
        chunks.push(Constituent::new("NP", 2, 4));
        document.add_view(chunks).unwrap();

        let mut entities = View::new(view_names::NER_CONLL, "test");
        entities.push(Constituent::new("ORG", 0, 1));
        document.add_view(entities).unwrap();

        document
    }

    #[test]
    fn prepares_one_row_per_token() {
        let sentences = TextPreprocessor::default().prepare(&document()).unwrap();

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].offset, 4);
        assert_eq!(sentences[1].tokens[0].index, 4);

        let tokens = &sentences[0].tokens;
        assert_eq!(tokens[0].ner, "B-ORG");
        assert!(tokens[0].is_title_case);
        assert_eq!(tokens[1].lemma, "sell");
        assert_eq!(tokens[1].chunk, "B-VP");
        assert_eq!(tokens[2].form, "#");
        assert_eq!(tokens[3].chunk, "I-NP");
        assert_eq!(tokens[3].ner, "O");
        assert_eq!(sentences[1].tokens[1].chunk, "O");
    }

    #[test]
    fn keeps_digits_if_requested() {
        let preprocessor = TextPreprocessor {
            normalize_digits: false,
        };
        let sentences = preprocessor.prepare(&document()).unwrap();

        assert_eq!(sentences[0].tokens[2].form, "3");
    }

    #[test]
    fn fails_without_prerequisites() {
        let mut document = document();
        document.remove_view(view_names::NER_CONLL);

        assert!(matches!(
            TextPreprocessor::default().prepare(&document),
            Err(crate::Error::MissingView { view, .. }) if view == view_names::NER_CONLL
        ));
    }
}
