mod common;

use clap::Parser;
use common::{french, ScriptedTranslator};
use csv_column_translator::translation::FailedRow;
use csv_column_translator::{execute, AppConfig, CancelSignal, Cli, CsvTranslatorError};
use std::path::Path;
use std::sync::Arc;

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.translation.base_delay_ms = 1;
    config.translation.max_delay_ms = 5;
    config
}

fn cli(input: &Path, output: &Path, extra: &[&str]) -> Cli {
    let mut argv = vec![
        "csv-column-translator".to_string(),
        input.display().to_string(),
        output.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn translates_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out").join("translated.csv");
    std::fs::write(&input, "id,text\n1,Hello\n2,Goodbye\n").unwrap();

    let cli = cli(&input, &output, &["-c", "text", "-t", "fr"]);
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.translated, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,text\n1,Bonjour\n2,Au revoir\n"
    );
}

#[tokio::test]
async fn failures_are_written_to_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let report = dir.path().join("failed.json");
    std::fs::write(&input, "id,text\n1,Hello\n2,Gibberish\n").unwrap();

    let report_arg = report.display().to_string();
    let cli = cli(
        &input,
        &output,
        &["-c", "text", "-t", "fr", "--failed-rows", &report_arg],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,text\n1,Bonjour\n2,Gibberish\n"
    );

    let failed: Vec<FailedRow> =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row_index, 1);
    assert_eq!(failed[0].original_content, "Gibberish");
}

#[tokio::test]
async fn clean_run_removes_stale_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let report = dir.path().join("failed.json");
    std::fs::write(&input, "text\nYes\n").unwrap();
    std::fs::write(&report, "[{\"row_index\":0}]").unwrap();

    let report_arg = report.display().to_string();
    let cli = cli(
        &input,
        &output,
        &["-c", "text", "-t", "fr", "--failed-rows", &report_arg],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert!(!report.exists());
}

#[tokio::test]
async fn tab_delimited_with_output_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.tsv");
    let output = dir.path().join("out.tsv");
    std::fs::write(&input, "id\ttext\n1\tThank you\n2\t\n").unwrap();

    let cli = cli(
        &input,
        &output,
        &[
            "-c",
            "text",
            "-t",
            "fr",
            "--output-column",
            "text_fr",
            "--delimiter",
            "\\t",
        ],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.unchanged, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id\ttext\ttext_fr\n1\tThank you\tMerci\n2\t\t\n"
    );
}

#[tokio::test]
async fn resume_reuses_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "id,text\n1,Hello\n2,Goodbye\n").unwrap();
    std::fs::write(&output, "id,text,text_fr\n1,Hello,Salut\n2,Goodbye,\n").unwrap();

    let cli = cli(
        &input,
        &output,
        &["-c", "text", "-t", "fr", "--output-column", "text_fr", "--resume"],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator.clone(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(translator.calls(), vec!["Goodbye".to_string()]);
    assert_eq!(summary.reused, 1);
    assert_eq!(summary.translated, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,text,text_fr\n1,Hello,Salut\n2,Goodbye,Au revoir\n"
    );
}

#[tokio::test]
async fn translated_formulas_are_neutralized() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "text\nFormula\n").unwrap();

    let mut dictionary = french();
    dictionary.insert("Formula".to_string(), "=1+1".to_string());
    let translator = Arc::new(ScriptedTranslator::new(dictionary));

    let cli = cli(&input, &output, &["-c", "text", "-t", "fr"]);
    execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "text\n'=1+1\n");
}

#[tokio::test]
async fn missing_input_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.csv");
    let output = dir.path().join("out.csv");

    let cli = cli(&input, &output, &["-c", "text", "-t", "fr"]);
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let err = execute(&cli, &fast_config(), translator.clone(), &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CsvTranslatorError::FileNotFound(_)));
    assert!(!output.exists());
    assert!(translator.calls().is_empty());
}

#[tokio::test]
async fn unknown_column_is_fatal_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "id,body\n1,Hello\n").unwrap();

    let cli = cli(&input, &output, &["-c", "text", "-t", "fr"]);
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let err = execute(&cli, &fast_config(), translator.clone(), &CancelSignal::never())
        .await
        .unwrap_err();

    match err {
        CsvTranslatorError::ColumnNotFound { column, available } => {
            assert_eq!(column, "text");
            assert!(available.contains("body"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(translator.calls().is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn untranslated_cells_keep_leading_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let report = dir.path().join("failed.json");
    std::fs::write(&input, "id,text\n1,-5 degrees\n2,Hello\n3,-3 apples\n").unwrap();

    let report_arg = report.display().to_string();
    let cli = cli(
        &input,
        &output,
        &["-c", "text", "-t", "fr", "--end", "2", "--failed-rows", &report_arg],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,text\n1,-5 degrees\n2,Bonjour\n3,-3 apples\n"
    );
}

#[tokio::test]
async fn resume_with_later_start_keeps_earlier_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "id,text\n1,Hello\n2,Goodbye\n").unwrap();
    std::fs::write(&output, "id,text,text_fr\n1,Hello,Bonjour\n").unwrap();

    let cli = cli(
        &input,
        &output,
        &[
            "-c",
            "text",
            "-t",
            "fr",
            "--output-column",
            "text_fr",
            "--resume",
            "--start",
            "1",
        ],
    );
    let translator = Arc::new(ScriptedTranslator::new(french()));

    let summary = execute(&cli, &fast_config(), translator.clone(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(translator.calls(), vec!["Goodbye".to_string()]);
    assert_eq!(summary.reused, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,text,text_fr\n1,Hello,Bonjour\n2,Goodbye,Au revoir\n"
    );
}
