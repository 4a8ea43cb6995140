//! Directory source and CSV sink tests

use claimflow::io::{read_directory, write_csv};
use claimflow::types::Value;
use claimflow::{col, lit, CsvSink, DirectorySource, FlowResult, Table};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_source_rows_decode_to_text() -> FlowResult<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("b.txt"), "Beta text")?;
    fs::write(dir.path().join("a.txt"), "Alpha text")?;

    let scan = read_directory(dir.path());
    assert!(scan.failures.is_empty());

    let texts = scan
        .table
        .select([("text", col("data").method("decode", vec![lit("utf-8")]))])?;
    assert_eq!(
        texts.column(&col("text"))?,
        vec![Value::varchar("Alpha text"), Value::varchar("Beta text")]
    );
    Ok(())
}

#[test]
fn test_invalid_utf8_fails_decode() -> FlowResult<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("bad.bin"), [0xff, 0xfe, 0x00])?;

    let scan = DirectorySource::new(dir.path()).scan();
    assert_eq!(scan.table.len(), 1);
    assert!(scan
        .table
        .select([("text", col("data").method("decode", vec![]))])
        .is_err());
    Ok(())
}

#[test]
fn test_source_to_sink_round_trip() -> FlowResult<()> {
    let dir = tempdir()?;
    let input = dir.path().join("in");
    fs::create_dir(&input)?;
    fs::write(input.join("one.txt"), "1")?;
    fs::write(input.join("two.txt"), "2")?;

    let table = read_directory(&input)
        .table
        .select([
            ("size", col("data").method("len", vec![])),
            ("body", col("data").method("decode", vec![])),
        ])?;

    let out = dir.path().join("nested").join("deeper").join("out.csv");
    assert_eq!(write_csv(&table, &out)?, 2);
    assert_eq!(fs::read_to_string(&out)?, "size,body\n1,1\n1,2\n");
    Ok(())
}

#[test]
fn test_sink_overwrites_existing_file() -> FlowResult<()> {
    let dir = tempdir()?;
    let out = dir.path().join("out.csv");
    fs::write(&out, "stale contents\nmore\n")?;

    let sink = CsvSink::new(&out);
    let table = Table::new(vec![claimflow::row! { "k" => "v" }]);
    sink.write(&table)?;
    assert_eq!(fs::read_to_string(&out)?, "k\nv\n");

    // an empty table leaves whatever is on disk alone
    sink.write(&Table::empty())?;
    assert_eq!(fs::read_to_string(&out)?, "k\nv\n");
    Ok(())
}
