//! Pipeline stages adding one view to a document.
//!
//! An [Annotator] declares the view it produces and the views it requires. [VerbSenseAnnotator] produces the
//! `SENSE_VERB` view from part-of-speech tags, lemmas, shallow parse chunks and named entities.

use log::{info, warn};
use once_cell::sync::OnceCell;
use std::convert::TryFrom;
use std::sync::Arc;

use crate::config::{keys, Configuration, VerbSenseConfigurator, VerbSenseOptions};
use crate::labeler::{Labeler, SensePrediction, VerbSenseLabeler};
use crate::preprocess::Preprocessor;
use crate::types::{view_names, Constituent, Document, View};
use crate::Error;

/// Name of the generator set on views written by [VerbSenseAnnotator].
pub const GENERATOR: &str = "verbsense";

/// Views which must be present before [VerbSenseAnnotator] can run.
pub const REQUIRED_VIEWS: &[&str] = &[
    view_names::POS,
    view_names::LEMMA,
    view_names::SHALLOW_PARSE,
    view_names::NER_CONLL,
];

pub trait Annotator: Send + Sync {
    /// The name of the view this annotator writes.
    fn view_name(&self) -> &str;

    /// The names of the views this annotator reads.
    fn required_views(&self) -> &[String];

    fn is_lazy(&self) -> bool;

    fn is_initialized(&self) -> bool;

    /// Builds the resources of the annotator. Must be idempotent.
    fn initialize(&self) -> Result<(), Error>;

    /// Computes the view and adds it to the document. The document is not modified if an error is returned.
    fn add_view(&self, document: &mut Document) -> Result<(), Error>;

    fn check_prerequisites(&self, document: &Document) -> Result<(), Error> {
        match self
            .required_views()
            .iter()
            .find(|view| !document.has_view(view))
        {
            Some(view) => Err(Error::MissingView {
                annotator: self.view_name().to_string(),
                view: view.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Checks the prerequisites, initializes the annotator if it is not yet initialized and adds the view.
    /// An existing view of the same name is replaced.
    fn annotate(&self, document: &mut Document) -> Result<(), Error> {
        self.check_prerequisites(document)?;

        if !self.is_initialized() {
            self.initialize()?;
        }

        self.add_view(document)
    }

    /// Returns the view of this annotator, annotating the document only if the view is not yet present.
    fn get_view<'d>(&self, document: &'d mut Document) -> Result<&'d View, Error> {
        if !document.has_view(self.view_name()) {
            self.annotate(document)?;
        }

        Ok(document.view(self.view_name())?)
    }
}

impl<'a, T> Annotator for &'a T
where
    T: Annotator + ?Sized,
{
    fn view_name(&self) -> &str {
        (*self).view_name()
    }

    fn required_views(&self) -> &[String] {
        (*self).required_views()
    }

    fn is_lazy(&self) -> bool {
        (*self).is_lazy()
    }

    fn is_initialized(&self) -> bool {
        (*self).is_initialized()
    }

    fn initialize(&self) -> Result<(), Error> {
        (*self).initialize()
    }

    fn add_view(&self, document: &mut Document) -> Result<(), Error> {
        (*self).add_view(document)
    }
}

/// Adds the `SENSE_VERB` view: one constituent per verb predicate, labeled with its sense.
///
/// The labeler is built exactly once, either at construction or, if the annotator is lazy, on first use.
/// If building it fails the annotator stays uninitialized and every use reports an [Error::Initialization].
pub struct VerbSenseAnnotator<L: Labeler = VerbSenseLabeler> {
    view_name: String,
    required_views: Vec<String>,
    config: Configuration,
    options: VerbSenseOptions,
    preprocessor: Arc<dyn Preprocessor>,
    labeler: OnceCell<L>,
}

impl VerbSenseAnnotator<VerbSenseLabeler> {
    /// Creates and initializes an annotator with the default configuration.
    pub fn new(preprocessor: Arc<dyn Preprocessor>) -> Result<Self, Error> {
        Self::with_config(false, &Configuration::default(), preprocessor)
    }

    /// Creates an annotator with the default configuration which initializes on first use.
    pub fn lazy(preprocessor: Arc<dyn Preprocessor>) -> Result<Self, Error> {
        Self::with_config(true, &Configuration::default(), preprocessor)
    }
}

impl<L: Labeler> VerbSenseAnnotator<L> {
    /// Creates an annotator reading `lazilyInitialize` from the configuration.
    /// Settings which are not given fall back to the default profile.
    pub fn from_config(
        config: &Configuration,
        preprocessor: Arc<dyn Preprocessor>,
    ) -> Result<Self, Error> {
        let config = VerbSenseConfigurator.get_config(config);
        Self::build(config, preprocessor)
    }

    /// Creates an annotator. Settings which are not given fall back to the default profile.
    /// If `lazily_initialize` is false, the labeler is built before this returns.
    pub fn with_config(
        lazily_initialize: bool,
        config: &Configuration,
        preprocessor: Arc<dyn Preprocessor>,
    ) -> Result<Self, Error> {
        let config = VerbSenseConfigurator
            .get_config(config)
            .with(keys::LAZILY_INITIALIZE, lazily_initialize.to_string());
        Self::build(config, preprocessor)
    }

    fn build(config: Configuration, preprocessor: Arc<dyn Preprocessor>) -> Result<Self, Error> {
        let options = VerbSenseOptions::try_from(&config).map_err(|error| Error::Initialization {
            view: view_names::SENSE_VERB.to_string(),
            source: Box::new(error.into()),
        })?;

        let annotator = VerbSenseAnnotator {
            view_name: view_names::SENSE_VERB.to_string(),
            required_views: REQUIRED_VIEWS.iter().map(|x| x.to_string()).collect(),
            config,
            options,
            preprocessor,
            labeler: OnceCell::new(),
        };

        if !annotator.options.lazily_initialize {
            annotator.initialize()?;
        }

        Ok(annotator)
    }

    /// The merged configuration of this annotator.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn options(&self) -> &VerbSenseOptions {
        &self.options
    }

    pub fn preprocessor(&self) -> &Arc<dyn Preprocessor> {
        &self.preprocessor
    }

    /// Gets the labeler, building it if needed.
    pub fn labeler(&self) -> Result<&L, Error> {
        self.labeler.get_or_try_init(|| {
            L::load(&self.options)
                .map(|labeler| {
                    info!("initialized annotator for view {}", self.view_name);
                    labeler
                })
                .map_err(|error| {
                    warn!(
                        "failed to initialize annotator for view {}: {}",
                        self.view_name, error
                    );
                    Error::Initialization {
                        view: self.view_name.clone(),
                        source: Box::new(error),
                    }
                })
        })
    }

    fn predict(&self, document: &Document) -> Result<View, Error> {
        let labeler = self.labeler()?;
        let sentences = self.preprocessor.prepare(document)?;
        let predictions = labeler.predict(&sentences)?;

        let mut view = View::new(self.view_name.as_str(), GENERATOR);
        for SensePrediction {
            token,
            lemma,
            sense,
            score,
        } in predictions
        {
            view.push(
                Constituent::new(sense, token, token + 1)
                    .with_score(score)
                    .with_attribute("predicate", lemma),
            );
        }

        Ok(view)
    }
}

impl<L: Labeler> Annotator for VerbSenseAnnotator<L> {
    fn view_name(&self) -> &str {
        &self.view_name
    }

    fn required_views(&self) -> &[String] {
        &self.required_views
    }

    fn is_lazy(&self) -> bool {
        self.options.lazily_initialize
    }

    fn is_initialized(&self) -> bool {
        self.labeler.get().is_some()
    }

    fn initialize(&self) -> Result<(), Error> {
        self.labeler().map(|_| ())
    }

    fn add_view(&self, document: &mut Document) -> Result<(), Error> {
        // initialization errors are fatal and are not turned into prediction errors
        self.labeler()?;

        let result = self
            .predict(document)
            .and_then(|view| document.add_view(view).map_err(Error::from));

        result.map(|_| ()).map_err(|source| {
            warn!(
                "failed to add view {} to document {:?}: {}",
                self.view_name,
                document.id(),
                source
            );
            Error::Prediction {
                view: self.view_name.clone(),
                document: document.id().to_string(),
                source: Box::new(source),
            }
        })
    }
}
