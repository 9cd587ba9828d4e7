use std::fs::File;
use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use gwasharmonize::matching::match_cohorts;
use gwasharmonize::reference::{ReferenceSnpTable, Resolution, UNRESOLVED};
use gwasharmonize::types::{VariantKey, VariantRecord};
use tempfile::TempDir;

fn record(chr: &str, pos: u64) -> VariantRecord {
    VariantRecord::new(VariantKey::new(chr, pos), "A", Some(1.0), Some(1.0)).expect("record")
}

#[test]
fn annotation_keys_match_bare_chromosomes() {
    let table = ReferenceSnpTable::from_reader(Cursor::new(
        "chr1 1000 rs1\nchr1\t2000\trs2\nchrX 77 rs3\n",
    ))
    .expect("table");
    assert_eq!(table.len(), 3);
    assert_eq!(table.resolve(&VariantKey::new("1", 1000)), Resolution::Known("rs1"));
    assert_eq!(table.resolve(&VariantKey::new("chr1", 2000)).as_str(), "rs2");
    assert_eq!(table.resolve(&VariantKey::new("X", 77)).to_string(), "rs3");

    let missing = table.resolve(&VariantKey::new("1", 3000));
    assert!(!missing.is_known());
    assert_eq!(missing.as_str(), UNRESOLVED);
}

#[test]
fn last_duplicate_wins_and_malformed_lines_are_counted() {
    let table = ReferenceSnpTable::from_reader(Cursor::new(
        "chr1 1000 rs_old\n\
         chr1 1000 rs_new\n\
         chr2 notanumber rs9\n\
         chr3 10\n\
         \n\
         chr4 40 rs4\n",
    ))
    .expect("table");
    assert_eq!(table.len(), 2);
    assert_eq!(table.resolve(&VariantKey::new("1", 1000)).as_str(), "rs_new");

    let stats = table.stats();
    assert_eq!(stats.lines, 5);
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.overwritten, 1);
}

#[test]
fn annotate_drops_unresolved_records() {
    let table =
        ReferenceSnpTable::from_reader(Cursor::new("chr1 100 rs1\nchr2 200 rs2\n")).expect("table");
    let (kept, dropped) = table.annotate(vec![record("1", 100), record("1", 150), record("2", 200)]);
    assert_eq!(dropped, 1);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].snp.as_deref(), Some("rs1"));
    assert_eq!(kept[1].snp.as_deref(), Some("rs2"));
    assert!(kept.iter().all(|r| r.snp.as_deref() != Some(UNRESOLVED)));
}

#[test]
fn matched_pairs_are_labeled_in_place() {
    let table = ReferenceSnpTable::from_reader(Cursor::new("chr1 100 rs1\n")).expect("table");
    let left = vec![record("1", 100), record("1", 200)];
    let right = vec![record("1", 100), record("1", 200)];
    let mut matched = match_cohorts(&left, &right);
    table.label_matched(&mut matched);
    assert_eq!(matched[0].left.snp.as_deref(), Some("rs1"));
    assert_eq!(matched[0].right.snp.as_deref(), Some("rs1"));
    assert_eq!(matched[1].left.snp, None);
}

#[test]
fn gzipped_annotation_file_is_read() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("annotation.txt.gz");
    let mut encoder = GzEncoder::new(File::create(&path).expect("create"), Compression::default());
    encoder
        .write_all(b"chr22 16050075 rs587697622\nchr22 16050115 rs587755077\n")
        .expect("write");
    encoder.finish().expect("finish");

    let table = ReferenceSnpTable::from_path(&path).expect("table");
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.resolve(&VariantKey::new("22", 16050115)).as_str(),
        "rs587755077"
    );
}

#[test]
fn missing_annotation_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    assert!(ReferenceSnpTable::from_path(&dir.path().join("absent.txt")).is_err());
}
