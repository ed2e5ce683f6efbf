use clap::Parser;
use fs_err::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use verbsense::{
    config::{keys, Configuration},
    preprocess::TextPreprocessor,
    Annotator, Document, VerbSenseAnnotator,
};

/// Adds the SENSE_VERB view to a JSON document carrying POS, LEMMA, SHALLOW_PARSE and NER_CONLL views.
#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// Document to annotate.
    input: PathBuf,
    /// JSON object with configuration settings.
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Binary sense model. Overrides the model path of the configuration.
    #[clap(long, short)]
    model: Option<PathBuf>,
    /// Where to write the annotated document. Defaults to stdout.
    #[clap(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), verbsense::Error> {
    env_logger::init();
    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => Configuration::new(path)?,
        None => Configuration::default(),
    };
    if let Some(model) = &opts.model {
        config.set(keys::MODEL_PATH, model.to_string_lossy());
    }

    let annotator: VerbSenseAnnotator =
        VerbSenseAnnotator::from_config(&config, Arc::new(TextPreprocessor::default()))?;

    let mut document: Document = serde_json::from_reader(BufReader::new(File::open(&opts.input)?))?;
    annotator.annotate(&mut document)?;

    let writer: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;

    Ok(())
}
