use std::path::{Path, PathBuf};

use anyhow::Result;
use ndarray::array;
use patchperf_evaluator::{
    aggregator::{Aggregate, AggregateError},
    diagnostic::Diagnostic,
    expression::QuantityLookup,
    performances::{Extraction, PerformancesOpts},
    record::RecordSource,
    simulation::SimulationMetadata,
    source_file::{PerformancesFile, PERFORMANCES_FILE_NAME},
};

/// `Performances.json` with timesteps 10 and 20, compressed with
/// `zstd -19`.
const COMPRESSED_PERFORMANCES: &[u8] = &[
    0x28, 0xb5, 0x2f, 0xfd, 0x24, 0x7a, 0x35, 0x02, 0x00, 0x12, 0x04, 0x0e,
    0x12, 0x90, 0xcf, 0x01, 0xab, 0x07, 0x03, 0x83, 0x88, 0x89, 0xdc, 0x8f,
    0x61, 0x70, 0x49, 0x95, 0xe7, 0xbf, 0x72, 0xf9, 0xf9, 0xea, 0x1c, 0x8c,
    0x41, 0x40, 0xbe, 0x32, 0x07, 0x25, 0x1d, 0x75, 0x64, 0x96, 0xda, 0x55,
    0x9d, 0x84, 0xb6, 0x0f, 0x14, 0x39, 0x10, 0xe9, 0xa8, 0xaf, 0x6b, 0x13,
    0xbe, 0x3e, 0x3e, 0x6a, 0x31, 0x44, 0xe8, 0xe3, 0x04, 0x00, 0x20, 0x11,
    0x40, 0x6f, 0x7c, 0x15, 0xa1, 0x0b, 0xb4, 0x62, 0x55, 0xdb, 0x49
];

/// A fresh directory per test.
fn test_dir(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!(
        "patchperf-source-file-{}-{name}",
        std::process::id()
    ));
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn write(dir: &Path, file_name: &str, contents: &str) -> Result<()> {
    std::fs::write(dir.join(file_name), contents)?;
    Ok(())
}

#[test]
fn t_load_directory() -> Result<()> {
    let dir = test_dir("directory")?;
    write(
        &dir,
        PERFORMANCES_FILE_NAME,
        r#"{
            "/0000000200": { "hindex": [0, 2], "timer_total": [3, 7] },
            "/0000000100": { "hindex": [0, 1], "timer_total": [1, 2] }
        }"#,
    )?;
    let file = PerformancesFile::new(&dir);
    assert_eq!(file.resolve()?, dir.join(PERFORMANCES_FILE_NAME));
    let records = file.open()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timestep(), 100);
    assert_eq!(
        records[1].quantity("timer_total"),
        Some(array![3., 7.].view())
    );

    // Or the file itself
    let records = PerformancesFile::new(dir.join(PERFORMANCES_FILE_NAME)).open()?;
    assert_eq!(records.len(), 2);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn t_load_compressed() -> Result<()> {
    let dir = test_dir("compressed")?;
    let compressed_path = dir.join(format!("{PERFORMANCES_FILE_NAME}.zstd"));
    std::fs::write(&compressed_path, COMPRESSED_PERFORMANCES)?;
    let file = PerformancesFile::new(&dir);
    assert_eq!(file.resolve()?, compressed_path);
    let records = file.open()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timestep(), 10);
    assert_eq!(records[0].hindex(), [0, 2]);
    assert_eq!(
        records[1].quantity("timer_total"),
        Some(array![1., 9.].view())
    );

    // The uncompressed file is preferred when both exist
    write(
        &dir,
        PERFORMANCES_FILE_NAME,
        r#"{ "/30": { "hindex": [0], "timer_total": [5] } }"#,
    )?;
    assert_eq!(file.resolve()?, dir.join(PERFORMANCES_FILE_NAME));
    assert_eq!(file.open()?[0].timestep(), 30);

    // Or the compressed file itself
    let records = PerformancesFile::new(&compressed_path).open()?;
    assert_eq!(records[1].timestep(), 20);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn t_restarts_are_combined() -> Result<()> {
    let first = test_dir("restart-1")?;
    let second = test_dir("restart-2")?;
    write(
        &first,
        PERFORMANCES_FILE_NAME,
        r#"{ "/10": { "hindex": [0, 2], "timer_total": [3, 7], "timer_io": [1, 1] } }"#,
    )?;
    write(
        &second,
        PERFORMANCES_FILE_NAME,
        r#"{ "/20": { "hindex": [0, 1], "timer_total": [2, 2], "number_of_particles": [5, 5] } }"#,
    )?;
    let aggregate = Aggregate::load(&[
        PerformancesFile::new(&second),
        PerformancesFile::new(&first),
    ])?;
    assert_eq!(aggregate.timesteps(), [10, 20]);
    let names: Vec<&str> = aggregate
        .quantities()
        .names()
        .iter()
        .map(|n| n.as_str())
        .collect();
    assert_eq!(names, ["hindex", "timer_total"]);

    std::fs::remove_dir_all(&first)?;
    std::fs::remove_dir_all(&second)?;
    Ok(())
}

#[test]
fn t_missing_source() -> Result<()> {
    let dir = test_dir("missing")?;
    let err = Aggregate::load(&[PerformancesFile::new(&dir)])
        .err()
        .expect("no performances file");
    match err {
        AggregateError::SourceUnavailable {
            source_name,
            message,
        } => {
            assert_eq!(source_name, dir.to_string_lossy());
            assert!(message.contains("could not open any of"), "{message}");
        }
        e => panic!("unexpected error {e:?}"),
    }

    write(&dir, PERFORMANCES_FILE_NAME, "{ not json")?;
    assert!(matches!(
        Aggregate::load(&[PerformancesFile::new(&dir)]),
        Err(AggregateError::SourceUnavailable { .. })
    ));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn t_diagnostic_with_simulation_file() -> Result<()> {
    let dir = test_dir("diagnostic")?;
    write(
        &dir,
        PERFORMANCES_FILE_NAME,
        r#"{ "/0": { "hindex": [0, 2], "timer_total": [10, 20] } }"#,
    )?;
    write(
        &dir,
        "simulation.json5",
        "{ number_of_patches: [4], number_of_cells: [8], cell_length: [0.5] }",
    )?;
    let file = PerformancesFile::new(&dir);
    let metadata = SimulationMetadata::load(None, &[file.results_dir()])?;
    assert!(metadata.is_some());

    let diagnostic = Diagnostic::load(
        &[file],
        metadata.as_ref(),
        &PerformancesOpts::map("timer_total"),
    );
    assert!(diagnostic.is_valid());
    assert_eq!(
        diagnostic.extract(0),
        Some(Extraction::Map1D(array![10., 10., 20., 20.]))
    );

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
