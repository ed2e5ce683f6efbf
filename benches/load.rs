use criterion::{criterion_group, criterion_main, Criterion};
use std::{sync::Arc, time::Duration};
use verbsense::{
    config::{keys, Configuration},
    model::{BinaryModel, SenseModel},
    preprocess::TextPreprocessor,
    types::{view_names, Document, View},
    Annotator, VerbSenseAnnotator,
};

const MODEL_JSON: &str = r#"{"lemmas": {"run": {"outcome_labels": ["01", "02"], "pmap": {"obj=company": {"parameters": [-1.0, 2.0], "outcomes": [0, 1]}}}}}"#;

fn model_bytes() -> Vec<u8> {
    let model = SenseModel::from_json_reader(MODEL_JSON.as_bytes()).unwrap();

    let mut bytes = Vec::new();
    model.to_writer(&mut bytes).unwrap();
    bytes
}

fn load_model(c: &mut Criterion) {
    let bytes = model_bytes();
    c.bench_function("load model", |b| {
        b.iter(|| SenseModel::from_reader(bytes.as_slice()).unwrap())
    });
}

fn annotate(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verbsense.bin");
    std::fs::write(&path, model_bytes()).unwrap();

    let config = Configuration::default().with(keys::MODEL_PATH, path.to_string_lossy());
    let annotator: VerbSenseAnnotator =
        VerbSenseAnnotator::from_config(&config, Arc::new(TextPreprocessor::default())).unwrap();

    let mut document = Document::from_tokens("bench", &[vec!["They", "run", "the", "company"]]);
    let views = vec![
        View::token_labels(view_names::POS, "bench", vec!["PRP", "VBP", "DT", "NN"]),
        View::token_labels(view_names::LEMMA, "bench", vec!["they", "run", "the", "company"]),
        View::new(view_names::SHALLOW_PARSE, "bench"),
        View::new(view_names::NER_CONLL, "bench"),
    ];
    for view in views {
        document.add_view(view).unwrap();
    }

    c.bench_function("annotate", |b| {
        b.iter(|| annotator.annotate(&mut document).unwrap())
    });
}

fn no_warmup_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_nanos(1))
}

criterion_group!(
name = bench;
config = no_warmup_criterion();
targets =
    load_model,
    annotate,
);

criterion_main!(bench);
