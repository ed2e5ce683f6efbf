//! Identification of verb predicates and classification of their senses.

use itertools::Itertools;
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::VerbSenseOptions;
use crate::model::{BinaryModel, SenseModel};
use crate::preprocess::{PreparedSentence, TokenFeatures};

/// The predicted sense of one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensePrediction {
    /// Index of the predicate token in the document.
    pub token: usize,
    pub lemma: String,
    pub sense: String,
    pub score: f32,
}

/// Computes sense predictions from prepared sentences.
pub trait Labeler: Send + Sync + Sized {
    /// Builds the labeler, loading whatever resources it needs.
    fn load(options: &VerbSenseOptions) -> Result<Self, crate::Error>;

    fn predict(&self, sentences: &[PreparedSentence])
        -> Result<Vec<SensePrediction>, crate::Error>;
}

lazy_static! {
    static ref AUXILIARIES: HashSet<&'static str> = [
        "be", "have", "do", "will", "shall", "may", "might", "can", "could", "would", "should",
        "must",
    ]
    .iter()
    .copied()
    .collect();
}

const SENTENCE_START: &str = "<s>";
const SENTENCE_END: &str = "</s>";

fn is_verb(token: &TokenFeatures) -> bool {
    token.pos.starts_with("VB")
}

fn strip_bio(label: &str) -> &str {
    label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label)
}

/// Classifies the senses of all verbs with a [SenseModel].
pub struct VerbSenseLabeler {
    model: SenseModel,
    options: VerbSenseOptions,
}

impl Labeler for VerbSenseLabeler {
    fn load(options: &VerbSenseOptions) -> Result<Self, crate::Error> {
        let model = SenseModel::new(&options.model_path)?;
        debug!(
            "loaded {} with {} lemmas from {}",
            SenseModel::name(),
            model.len(),
            options.model_path.display()
        );

        Ok(VerbSenseLabeler::from_model(model, options.clone()))
    }

    fn predict(
        &self,
        sentences: &[PreparedSentence],
    ) -> Result<Vec<SensePrediction>, crate::Error> {
        let mut predictions = Vec::new();

        for sentence in sentences {
            for i in self.predicates(sentence) {
                let token = &sentence.tokens[i];
                let features = self.features(sentence, i);

                let best = self
                    .model
                    .lemma(&token.lemma)
                    .and_then(|model| model.predict(&features).into_iter().next())
                    .filter(|(_, score)| *score >= self.options.min_score);

                let (sense, score) = match best {
                    Some((sense, score)) => (sense.to_string(), score),
                    None => (self.options.default_sense.clone(), 0.),
                };

                debug!(
                    "{} -> {} ({:.3}) [{}]",
                    token.lemma,
                    sense,
                    score,
                    features.iter().join(" ")
                );

                predictions.push(SensePrediction {
                    token: token.index,
                    lemma: token.lemma.clone(),
                    sense,
                    score,
                });
            }
        }

        Ok(predictions)
    }
}

impl VerbSenseLabeler {
    pub fn from_model(model: SenseModel, options: VerbSenseOptions) -> Self {
        VerbSenseLabeler { model, options }
    }

    pub fn model(&self) -> &SenseModel {
        &self.model
    }

    pub fn options(&self) -> &VerbSenseOptions {
        &self.options
    }

    /// Indices (relative to the sentence) of the tokens which are predicates.
    pub fn predicates(&self, sentence: &PreparedSentence) -> Vec<usize> {
        (0..sentence.tokens.len())
            .filter(|i| self.is_predicate(sentence, *i))
            .collect()
    }

    fn is_predicate(&self, sentence: &PreparedSentence, i: usize) -> bool {
        let token = &sentence.tokens[i];
        if !is_verb(token) {
            return false;
        }

        if self.options.skip_auxiliaries && AUXILIARIES.contains(token.lemma.as_str()) {
            // an auxiliary is followed by the main verb in the same verb phrase
            let has_main_verb = sentence.tokens[i + 1..]
                .iter()
                .take_while(|x| x.chunk == "I-VP")
                .any(is_verb);

            return !has_main_verb;
        }

        true
    }

    /// Features of the token at index `i` (relative to the sentence).
    pub fn features(&self, sentence: &PreparedSentence, i: usize) -> Vec<String> {
        let tokens = &sentence.tokens;
        let token = &tokens[i];

        let mut features = vec![
            format!("lemma={}", token.lemma),
            format!("form={}", token.lower),
            format!("pos={}", token.pos),
            format!("chunk={}", token.chunk),
        ];

        for k in 1..=self.options.context_window {
            let (word, pos) = match i.checked_sub(k) {
                Some(j) => (tokens[j].lower.as_str(), tokens[j].pos.as_str()),
                None => (SENTENCE_START, SENTENCE_START),
            };
            features.push(format!("w[-{}]={}", k, word));
            features.push(format!("p[-{}]={}", k, pos));

            let (word, pos) = match tokens.get(i + k) {
                Some(next) => (next.lower.as_str(), next.pos.as_str()),
                None => (SENTENCE_END, SENTENCE_END),
            };
            features.push(format!("w[+{}]={}", k, word));
            features.push(format!("p[+{}]={}", k, pos));
        }

        if let Some(entity) = tokens[i + 1..].iter().find(|x| x.ner != "O") {
            features.push(format!("ner_right={}", strip_bio(&entity.ner)));
        }

        // the object is the first noun before the next verb
        if let Some(object) = tokens[i + 1..]
            .iter()
            .take_while(|x| !is_verb(x))
            .find(|x| x.pos.starts_with("NN"))
        {
            features.push(format!("obj={}", object.lemma));
        }

        if token.is_title_case {
            features.push("title".into());
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SenseModelData;
    use std::convert::TryFrom;

    fn token(index: usize, form: &str, lemma: &str, pos: &str, chunk: &str) -> TokenFeatures {
        TokenFeatures {
            index,
            form: form.into(),
            lower: form.to_lowercase(),
            lemma: lemma.into(),
            pos: pos.into(),
            chunk: chunk.into(),
            ner: "O".into(),
            is_title_case: false,
        }
    }

    fn sentence() -> PreparedSentence {
        // "She has run the company"
        PreparedSentence {
            offset: 10,
            tokens: vec![
                token(10, "She", "she", "PRP", "B-NP"),
                token(11, "has", "have", "VBZ", "B-VP"),
                token(12, "run", "run", "VBN", "I-VP"),
                token(13, "the", "the", "DT", "B-NP"),
                token(14, "company", "company", "NN", "I-NP"),
            ],
        }
    }

    fn labeler(options: VerbSenseOptions) -> VerbSenseLabeler {
        let json = r#"{"lemmas": {"run": {"outcome_labels": ["01", "02"], "pmap": {"obj=company": {"parameters": [3.0], "outcomes": [1]}}}}}"#;
        let data: SenseModelData = serde_json::from_str(json).unwrap();
        VerbSenseLabeler::from_model(SenseModel::try_from(data).unwrap(), options)
    }

    #[test]
    fn skips_auxiliaries() {
        let labeler = labeler(VerbSenseOptions::default());
        assert_eq!(labeler.predicates(&sentence()), vec![2]);

        let labeler = labeler_without_skipping();
        assert_eq!(labeler.predicates(&sentence()), vec![1, 2]);
    }

    fn labeler_without_skipping() -> VerbSenseLabeler {
        labeler(VerbSenseOptions {
            skip_auxiliaries: false,
            ..VerbSenseOptions::default()
        })
    }

    #[test]
    fn extracts_context_features() {
        let labeler = labeler(VerbSenseOptions::default());
        let features = labeler.features(&sentence(), 2);

        for expected in &[
            "lemma=run",
            "w[-1]=has",
            "p[-2]=PRP",
            "w[+2]=company",
            "obj=company",
        ] {
            assert!(features.iter().any(|x| x == expected), "{}", expected);
        }

        let features = labeler.features(&sentence(), 0);
        assert!(features.iter().any(|x| x == "w[-1]=<s>"));
    }

    #[test]
    fn predicts_known_and_unknown_lemmas() {
        let labeler = labeler_without_skipping();
        let predictions = labeler.predict(&[sentence()]).unwrap();

        assert_eq!(predictions.len(), 2);
        // "have" is unknown to the model
        assert_eq!(predictions[0].token, 11);
        assert_eq!(predictions[0].sense, "01");
        assert_eq!(predictions[0].score, 0.);

        assert_eq!(predictions[1].token, 12);
        assert_eq!(predictions[1].lemma, "run");
        assert_eq!(predictions[1].sense, "02");
        assert!(predictions[1].score > 0.9);
    }

    #[test]
    fn low_scores_fall_back_to_default_sense() {
        let labeler = labeler(VerbSenseOptions {
            min_score: 0.99,
            default_sense: "00".into(),
            ..VerbSenseOptions::default()
        });
        let predictions = labeler.predict(&[sentence()]).unwrap();

        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].sense, "00");
    }

    #[test]
    fn load_fails_for_missing_model() {
        let options = VerbSenseOptions {
            model_path: "does/not/exist.bin".into(),
            ..VerbSenseOptions::default()
        };

        assert!(VerbSenseLabeler::load(&options).is_err());
    }
}
