//! An ordered sequence of annotators.
//!
//! A [Pipeline] is validated on construction: every view an annotator reads must either be provided
//! with the input documents or be written by an earlier annotator.

use itertools::Itertools;
use log::warn;
use std::collections::HashSet;

use crate::annotator::Annotator;
use crate::types::Document;
use crate::Error;

pub struct Pipeline {
    provided: Vec<String>,
    annotators: Vec<Box<dyn Annotator>>,
}

impl Pipeline {
    /// Creates a pipeline. `provided` are the names of the views input documents are expected to carry.
    pub fn new<S: AsRef<str>>(
        provided: &[S],
        annotators: Vec<Box<dyn Annotator>>,
    ) -> Result<Self, Error> {
        let provided: Vec<String> = provided.iter().map(|x| x.as_ref().to_string()).collect();
        let mut written: HashSet<&str> = provided.iter().map(|x| x.as_str()).collect();
        let mut missing = Vec::new();

        for annotator in annotators.iter() {
            for view in annotator.required_views() {
                if !written.contains(view.as_str()) {
                    missing.push(view.clone());
                }
            }
            written.insert(annotator.view_name());
        }

        if !missing.is_empty() {
            return Err(Error::InvalidPipeline(missing.into_iter().unique().collect()));
        }

        Ok(Pipeline {
            provided,
            annotators,
        })
    }

    pub fn provided(&self) -> &[String] {
        &self.provided
    }

    pub fn annotators(&self) -> &[Box<dyn Annotator>] {
        &self.annotators
    }

    /// Names of the views the pipeline adds, in order.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.annotators.iter().map(|x| x.view_name())
    }

    /// Initializes all annotators which are not lazy and not yet initialized.
    pub fn initialize(&self) -> Result<(), Error> {
        for annotator in self.annotators.iter() {
            if !annotator.is_lazy() && !annotator.is_initialized() {
                annotator.initialize()?;
            }
        }

        Ok(())
    }

    /// Runs all annotators in order. Stops at the first error; views added by earlier annotators are kept.
    pub fn annotate(&self, document: &mut Document) -> Result<(), Error> {
        for annotator in self.annotators.iter() {
            annotator.annotate(document)?;
        }

        Ok(())
    }

    /// Annotates each document, continuing after failed documents.
    pub fn annotate_all(&self, documents: &mut [Document]) -> Vec<Result<(), Error>> {
        documents
            .iter_mut()
            .map(|document| {
                let result = self.annotate(document);
                if let Err(error) = &result {
                    warn!("skipping document {:?}: {}", document.id(), error);
                }
                result
            })
            .collect()
    }
}
