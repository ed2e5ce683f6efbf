//! The statistical sense model: one maximum entropy classifier per verb lemma.
//!
//! Models are authored / exported as JSON ([SenseModelData]) and compiled into the compact binary
//! [SenseModel] which is what the labeler loads at initialization time.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::utils;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error("lemma {lemma:?}: feature {feature:?} has {n_parameters} parameters but {n_outcomes} outcomes.")]
    LengthMismatch {
        lemma: String,
        feature: String,
        n_parameters: usize,
        n_outcomes: usize,
    },
    #[error("lemma {lemma:?}: feature {feature:?} refers to unknown outcome {outcome}.")]
    UnknownOutcome {
        lemma: String,
        feature: String,
        outcome: usize,
    },
    #[error("lemma {0:?} has no outcomes.")]
    NoOutcomes(String),
    #[error("lemma {lemma:?}: feature {feature:?} points to {offset}+{length} outside of the parameters.")]
    OutOfRange {
        lemma: String,
        feature: String,
        offset: usize,
        length: usize,
    },
}

/// A model which is stored in the binary format of this crate.
pub trait BinaryModel: Serialize + DeserializeOwned {
    fn name() -> &'static str;

    /// Loads the model from a file. Files ending in `.gz` are decompressed first.
    fn new<P: AsRef<Path>>(p: P) -> Result<Self, crate::Error> {
        let reader = utils::open_maybe_gz(p)?;
        Self::from_reader(reader)
    }

    /// Checks a freshly deserialized model.
    fn validate(&self) -> Result<(), crate::Error> {
        Ok(())
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self, crate::Error> {
        let model: Self = bincode::deserialize_from(reader)?;
        model.validate()?;
        Ok(model)
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), crate::Error> {
        Ok(bincode::serialize_into(writer, self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextData {
    pub parameters: Vec<f32>,
    pub outcomes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmaModelData {
    pub outcome_labels: Vec<String>,
    pub pmap: IndexMap<String, ContextData>,
}

/// JSON representation of a [SenseModel]: maps each lemma to its outcome labels (senses)
/// and the parameters of each feature.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SenseModelData {
    pub lemmas: IndexMap<String, LemmaModelData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LemmaModel {
    outcome_labels: Vec<String>,
    outcomes: Vec<usize>,
    parameters: Vec<f32>,
    pmap: HashMap<String, (usize, usize)>,
}

impl LemmaModel {
    fn try_from_data(lemma: &str, data: LemmaModelData) -> Result<Self, Error> {
        let LemmaModelData {
            outcome_labels,
            pmap: context_map,
        } = data;

        if outcome_labels.is_empty() {
            return Err(Error::NoOutcomes(lemma.to_string()));
        }

        let mut outcomes: Vec<usize> = Vec::new();
        let mut parameters: Vec<f32> = Vec::new();
        let mut pmap = HashMap::new();

        for (feature, value) in context_map {
            if value.outcomes.len() != value.parameters.len() {
                return Err(Error::LengthMismatch {
                    lemma: lemma.to_string(),
                    feature,
                    n_parameters: value.parameters.len(),
                    n_outcomes: value.outcomes.len(),
                });
            }

            if let Some(outcome) = value
                .outcomes
                .iter()
                .find(|x| **x >= outcome_labels.len())
            {
                return Err(Error::UnknownOutcome {
                    lemma: lemma.to_string(),
                    feature,
                    outcome: *outcome,
                });
            }

            let offset = outcomes.len();
            let length = value.outcomes.len();

            outcomes.extend(value.outcomes);
            parameters.extend(value.parameters);

            pmap.insert(feature, (offset, length));
        }

        Ok(LemmaModel {
            outcome_labels,
            outcomes,
            parameters,
            pmap,
        })
    }

    /// Checks the invariants `eval` relies on. Binary models are not built by `try_from_data`
    /// so they have to be checked after loading.
    fn validate(&self, lemma: &str) -> Result<(), Error> {
        if self.outcome_labels.is_empty() {
            return Err(Error::NoOutcomes(lemma.to_string()));
        }

        if self.parameters.len() != self.outcomes.len() {
            return Err(Error::LengthMismatch {
                lemma: lemma.to_string(),
                feature: String::new(),
                n_parameters: self.parameters.len(),
                n_outcomes: self.outcomes.len(),
            });
        }

        if let Some(outcome) = self
            .outcomes
            .iter()
            .find(|x| **x >= self.outcome_labels.len())
        {
            return Err(Error::UnknownOutcome {
                lemma: lemma.to_string(),
                feature: String::new(),
                outcome: *outcome,
            });
        }

        for (feature, (offset, length)) in self.pmap.iter() {
            if offset
                .checked_add(*length)
                .map_or(true, |end| end > self.outcomes.len())
            {
                return Err(Error::OutOfRange {
                    lemma: lemma.to_string(),
                    feature: feature.clone(),
                    offset: *offset,
                    length: *length,
                });
            }
        }

        Ok(())
    }

    pub fn outcome_labels(&self) -> &[String] {
        &self.outcome_labels
    }

    fn eval<S: AsRef<str>>(&self, features: &[S]) -> Vec<f32> {
        let mut scores = vec![0f32; self.outcome_labels.len()];

        for feature in features {
            if let Some((offset, length)) = self.pmap.get(feature.as_ref()) {
                for i in *offset..*offset + *length {
                    scores[self.outcomes[i]] += self.parameters[i];
                }
            }
        }

        let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.;
        for score in scores.iter_mut() {
            *score = (*score - max).exp();
            sum += *score;
        }
        scores.iter_mut().for_each(|x| *x /= sum);

        scores
    }

    /// Returns all outcomes with their probability, the most probable first.
    /// Ties keep the order of the outcome labels.
    pub fn predict<S: AsRef<str>>(&self, features: &[S]) -> Vec<(&str, f32)> {
        let mut out: Vec<_> = self
            .outcome_labels
            .iter()
            .map(|x| x.as_str())
            .zip(self.eval(features))
            .collect();

        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

/// Sense classifiers for all known verb lemmas.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SenseModel {
    lemmas: HashMap<String, LemmaModel>,
}

impl TryFrom<SenseModelData> for SenseModel {
    type Error = Error;

    fn try_from(data: SenseModelData) -> Result<Self, Self::Error> {
        let lemmas = data
            .lemmas
            .into_iter()
            .map(|(lemma, data)| {
                let model = LemmaModel::try_from_data(&lemma, data)?;
                Ok((lemma, model))
            })
            .collect::<Result<HashMap<_, _>, Error>>()?;

        Ok(SenseModel { lemmas })
    }
}

impl BinaryModel for SenseModel {
    fn name() -> &'static str {
        "sense_model"
    }

    fn validate(&self) -> Result<(), crate::Error> {
        for (lemma, model) in self.lemmas.iter() {
            model.validate(lemma)?;
        }
        Ok(())
    }
}

impl SenseModel {
    /// Reads and validates a model in its JSON representation.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, crate::Error> {
        let data: SenseModelData = serde_json::from_reader(reader)?;
        Ok(SenseModel::try_from(data)?)
    }

    pub fn lemma(&self, lemma: &str) -> Option<&LemmaModel> {
        self.lemmas.get(lemma)
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;

    fn model_json() -> &'static str {
        r#"{
            "lemmas": {
                "run": {
                    "outcome_labels": ["01", "02"],
                    "pmap": {
                        "obj=company": {"parameters": [-1.0, 2.0], "outcomes": [0, 1]},
                        "obj=home": {"parameters": [1.5], "outcomes": [0]}
                    }
                }
            }
        }"#
    }

    #[test]
    fn predicts_most_probable_first() {
        let model = SenseModel::from_json_reader(model_json().as_bytes()).unwrap();
        let run = model.lemma("run").unwrap();

        let prediction = run.predict(&["lemma=run", "obj=company"]);
        assert_eq!(prediction[0].0, "02");
        assert!((prediction.iter().map(|x| x.1).sum::<f32>() - 1.).abs() < 1e-6);

        let prediction = run.predict(&["obj=home"]);
        assert_eq!(prediction[0].0, "01");
    }

    #[test]
    fn unknown_features_give_uniform_distribution() {
        let model = SenseModel::from_json_reader(model_json().as_bytes()).unwrap();
        let prediction = model.lemma("run").unwrap().predict(&["nothing"]);

        assert_eq!(prediction, vec![("01", 0.5), ("02", 0.5)]);
    }

    #[test]
    fn rejects_inconsistent_data() {
        let json = r#"{"lemmas": {"go": {"outcome_labels": ["01"], "pmap": {"f": {"parameters": [1.0], "outcomes": [3]}}}}}"#;
        assert!(matches!(
            SenseModel::from_json_reader(json.as_bytes()),
            Err(crate::Error::Model(Error::UnknownOutcome { outcome: 3, .. }))
        ));

        let json = r#"{"lemmas": {"go": {"outcome_labels": ["01"], "pmap": {"f": {"parameters": [], "outcomes": [0]}}}}}"#;
        assert!(matches!(
            SenseModel::from_json_reader(json.as_bytes()),
            Err(crate::Error::Model(Error::LengthMismatch { .. }))
        ));

        let json = r#"{"lemmas": {"go": {"outcome_labels": [], "pmap": {}}}}"#;
        assert!(matches!(
            SenseModel::from_json_reader(json.as_bytes()),
            Err(crate::Error::Model(Error::NoOutcomes(_)))
        ));
    }

    #[test]
    fn loads_gzipped_binaries() {
        use flate2::{write::GzEncoder, Compression};

        let model = SenseModel::from_json_reader(model_json().as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin.gz");

        {
            let file = std::fs::File::create(&path).unwrap();
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            model.to_writer(&mut encoder).unwrap();
            encoder.finish().unwrap();
        }

        let loaded = SenseModel::new(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.lemma("run").unwrap().predict(&["obj=company"])[0].0,
            "02"
        );
    }

    #[test]
    fn rejects_corrupt_binaries() {
        let mut lemmas = HashMap::new();
        lemmas.insert(
            "run".to_string(),
            LemmaModel {
                outcome_labels: vec!["01".into()],
                outcomes: vec![7],
                parameters: vec![1.],
                pmap: vec![("obj=company".to_string(), (0, 1))].into_iter().collect(),
            },
        );
        let mut bytes = Vec::new();
        SenseModel { lemmas }.to_writer(&mut bytes).unwrap();

        assert!(matches!(
            SenseModel::from_reader(bytes.as_slice()),
            Err(crate::Error::Model(Error::UnknownOutcome { outcome: 7, .. }))
        ));

        let mut lemmas = HashMap::new();
        lemmas.insert(
            "run".to_string(),
            LemmaModel {
                outcome_labels: vec!["01".into()],
                outcomes: vec![0],
                parameters: vec![1.],
                pmap: vec![("obj=company".to_string(), (1, 3))].into_iter().collect(),
            },
        );
        let mut bytes = Vec::new();
        SenseModel { lemmas }.to_writer(&mut bytes).unwrap();

        assert!(matches!(
            SenseModel::from_reader(bytes.as_slice()),
            Err(crate::Error::Model(Error::OutOfRange { offset: 1, .. }))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            SenseModel::new("does/not/exist.bin"),
            Err(crate::Error::Io(_))
        ));
    }
}
