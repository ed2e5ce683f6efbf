use clap::Parser;
use flate2::{write::GzEncoder, Compression};
use fs_err::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use verbsense::model::{BinaryModel, SenseModel};

/// Compiles a sense model from its JSON representation into the binary format.
#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON model to read.
    #[clap(long, short)]
    input: PathBuf,
    /// Where to write the binary model. Compressed with gzip if the path ends in `.gz`.
    #[clap(long, short)]
    output: PathBuf,
}

fn main() -> Result<(), verbsense::Error> {
    env_logger::init();
    let opts = Opts::parse();

    let model = SenseModel::from_json_reader(BufReader::new(File::open(&opts.input)?))?;
    log::info!("compiled model with {} lemmas", model.len());

    let writer = BufWriter::new(File::create(&opts.output)?);
    if opts.output.extension().map_or(false, |x| x == "gz") {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        model.to_writer(&mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        model.to_writer(&mut writer)?;
        writer.flush()?;
    }

    Ok(())
}
