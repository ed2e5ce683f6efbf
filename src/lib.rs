//! Verb sense annotation for documents carrying multiple annotation views.
//! # Overview
//!
//! verbsense has the following core abstractions:
//! - A [Document][types::Document]: tokenized text plus named [View][types::View]s (part-of-speech tags,
//! lemmas, shallow parse chunks, named entities, ...).
//! - An [Annotator][annotator::Annotator]: a pipeline stage which reads prerequisite views and writes exactly one
//! output view. [VerbSenseAnnotator][annotator::VerbSenseAnnotator] writes the `SENSE_VERB` view.
//! - A [Labeler][labeler::Labeler] computing the actual sense predictions and a
//! [Preprocessor][preprocess::Preprocessor] turning views into features for it. Both are explicit dependencies
//! of the annotator.
//!
//! # Examples
//!
//! Annotate a document:
//!
//! ```no_run
//! use std::sync::Arc;
//! use verbsense::annotator::{Annotator, VerbSenseAnnotator};
//! use verbsense::preprocess::TextPreprocessor;
//! use verbsense::types::{view_names, Document};
//!
//! let annotator = VerbSenseAnnotator::new(Arc::new(TextPreprocessor::default()))?;
//!
//! let mut document: Document = serde_json::from_str(&std::fs::read_to_string("document.json")?)?;
//! annotator.annotate(&mut document)?;
//!
//! for constituent in document.view(view_names::SENSE_VERB)?.constituents() {
//!     println!("{:?} -> {}", constituent.attribute("predicate"), constituent.label);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;

use thiserror::Error;

pub mod annotator;
pub mod config;
pub mod labeler;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod types;
pub(crate) mod utils;

pub use annotator::{Annotator, VerbSenseAnnotator};
pub use types::{Document, View};

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// (De)serialization error. Can have occured during deserialization or during serialization.
    #[error(transparent)]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Document(#[from] types::Error),
    #[error(transparent)]
    Model(#[from] model::Error),
    /// The annotator could not build its resources. It is not ready and must not be used.
    #[error("failed to initialize annotator for view {view}: {source}")]
    Initialization {
        view: String,
        #[source]
        source: Box<Error>,
    },
    /// Prediction failed for one document. The document was left unmodified.
    #[error("failed to predict view {view} for document {document:?}: {source}")]
    Prediction {
        view: String,
        document: String,
        #[source]
        source: Box<Error>,
    },
    /// Failure reported by a custom [Labeler][labeler::Labeler] or [Preprocessor][preprocess::Preprocessor].
    #[error("{0}")]
    Component(Box<dyn std::error::Error + Send + Sync>),
    #[error("{annotator} requires view {view} which is not present.")]
    MissingView { annotator: String, view: String },
    #[error("invalid pipeline: views {0:?} are read without being written.")]
    InvalidPipeline(Vec<String>),
}
