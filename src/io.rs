use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use bzip2::read::BzDecoder;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::types::{MatchedRecord, VariantKey, VariantRecord};

pub const MISSING_TOKENS: &[&str] = &["", "NA", "NaN", "nan", "."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Plain,
    Gzip,
    Bzip2,
}

impl Codec {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("gz") | Some("bgz") => Codec::Gzip,
            Some("bz2") => Codec::Bzip2,
            _ => Codec::Plain,
        }
    }

    fn wrap(self, file: File) -> Box<dyn Read> {
        match self {
            Codec::Plain => Box::new(file),
            Codec::Gzip => Box::new(MultiGzDecoder::new(file)),
            Codec::Bzip2 => Box::new(BzDecoder::new(file)),
        }
    }
}

pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(Box::new(BufReader::new(Codec::from_path(path).wrap(file))))
}

pub fn read_table(path: &Path) -> Result<DataFrame> {
    let mut reader = open_text(path)?;
    let mut header = String::new();
    reader.read_line(&mut header)?;
    if header.trim().is_empty() {
        bail!("{} has no header line", path.display());
    }

    let df = match separator(&header) {
        Some(sep) if Codec::from_path(path) == Codec::Plain => read_delimited(path, sep),
        Some(sep) => {
            // The CSV reader wants a plain file on disk.
            let plain = spill(&header, reader)?;
            read_delimited(plain.path(), sep)
        }
        None => read_whitespace(&header, reader),
    };
    df.with_context(|| format!("read {}", path.display()))
}

fn separator(header: &str) -> Option<u8> {
    if header.contains('\t') {
        Some(b'\t')
    } else if header.contains(',') {
        Some(b',')
    } else {
        None
    }
}

fn spill(header: &str, mut rest: Box<dyn BufRead>) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new()?;
    tmp.write_all(header.as_bytes())?;
    std::io::copy(&mut rest, &mut tmp).context("decompress")?;
    tmp.flush()?;
    Ok(tmp)
}

fn read_delimited(path: &Path, sep: u8) -> Result<DataFrame> {
    let nulls: Vec<PlSmallStr> = MISSING_TOKENS.iter().map(|t| PlSmallStr::from(*t)).collect();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_ignore_errors(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(sep)
                .with_null_values(Some(NullValues::AllColumns(nulls)))
                .with_missing_is_null(true),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    trim_strings(df)
}

fn trim_strings(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();
    for name in names {
        let Ok(values) = df.column(&name)?.as_materialized_series().str() else {
            continue;
        };
        let trimmed: StringChunked = values
            .into_iter()
            .map(|v| v.and_then(cell))
            .collect();
        df.with_column(trimmed.with_name(name).into_column())?;
    }
    Ok(df)
}

fn read_whitespace(header: &str, reader: Box<dyn BufRead>) -> Result<DataFrame> {
    let names = tokens(header);
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = tokens(&line).into_iter();
        for column in columns.iter_mut() {
            column.push(fields.next().and_then(|f| cell(&f).map(str::to_string)));
        }
    }
    let cols: Vec<Column> = names
        .iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name.as_str().into(), values))
        .collect();
    Ok(DataFrame::new(cols)?)
}

fn tokens(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !field.is_empty() {
                    out.push(std::mem::take(&mut field));
                }
            }
            c => field.push(c),
        }
    }
    if !field.is_empty() {
        out.push(field);
    }
    out
}

fn cell(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if MISSING_TOKENS
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
    {
        None
    } else {
        Some(value)
    }
}

pub fn format_pvalue(p: f64) -> String {
    if !p.is_finite() {
        return "NA".to_string();
    }
    let raw = format!("{p:.1e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}


fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, Default)]
struct Layout {
    z_norm: bool,
    z_adjusted: bool,
    z_adjusted_norm: bool,
    p_adjusted: bool,
    snp: bool,
}

impl Layout {
    fn from_records(records: &[&VariantRecord]) -> Self {
        let mut layout = Layout::default();
        for r in records {
            layout.z_norm |= r.z_norm.is_some();
            layout.z_adjusted |= r.z_adjusted.is_some();
            layout.z_adjusted_norm |= r.z_adjusted_norm.is_some();
            layout.p_adjusted |= r.p_adjusted.is_some();
            layout.snp |= r.snp.is_some();
        }
        layout
    }

    fn columns(&self, records: &[&VariantRecord], suffix: &str) -> Vec<Column> {
        let name = |base: &str| PlSmallStr::from(format!("{base}{suffix}"));
        let floats = |field: fn(&VariantRecord) -> Option<f64>| -> Vec<Option<f64>> {
            records.iter().map(|r| finite(field(r))).collect()
        };

        let alleles: Vec<&str> = records.iter().map(|r| r.effect_allele.as_str()).collect();
        let mut cols = vec![
            Column::new(name("ALT"), alleles),
            Column::new(name("Frq"), floats(|r| r.frequency)),
            Column::new(name("Z"), floats(|r| Some(r.z))),
        ];
        if self.z_norm {
            cols.push(Column::new(name("Z_norm"), floats(|r| r.z_norm)));
        }
        if self.z_adjusted {
            cols.push(Column::new(name("Z_adj"), floats(|r| r.z_adjusted)));
        }
        if self.z_adjusted_norm {
            cols.push(Column::new(name("Z_adj_norm"), floats(|r| r.z_adjusted_norm)));
        }
        cols.push(Column::new(name("P"), floats(|r| r.p)));
        if self.p_adjusted {
            let formatted: Vec<Option<String>> = records
                .iter()
                .map(|r| finite(r.p_adjusted).map(format_pvalue))
                .collect();
            cols.push(Column::new(name("P_adj"), formatted));
        }
        if self.snp {
            let ids: Vec<Option<&str>> = records.iter().map(|r| r.snp.as_deref()).collect();
            cols.push(Column::new(name("SNP"), ids));
        }
        cols
    }
}

fn key_columns<'a>(keys: impl Iterator<Item = &'a VariantKey>) -> Vec<Column> {
    let (chromosomes, positions): (Vec<&str>, Vec<u64>) = keys
        .map(|k| (k.chromosome.as_str(), k.position))
        .unzip();
    vec![
        Column::new("CHR".into(), chromosomes),
        Column::new("POS".into(), positions),
    ]
}

fn write_frame(mut df: DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let is_gz = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));
    if is_gz {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_tsv(&mut encoder, &mut df)?;
        encoder.finish()?.flush()?;
    } else {
        let mut out = BufWriter::new(file);
        write_tsv(&mut out, &mut df)?;
        out.flush()?;
    }
    Ok(())
}

fn write_tsv<W: Write>(out: W, df: &mut DataFrame) -> Result<()> {
    CsvWriter::new(out)
        .include_header(true)
        .with_separator(b'\t')
        .with_null_value("NA".to_string())
        .finish(df)?;
    Ok(())
}

pub fn write_records(records: &[VariantRecord], path: &Path) -> Result<()> {
    let rows: Vec<&VariantRecord> = records.iter().collect();
    let mut cols = key_columns(records.iter().map(|r| &r.key));
    cols.extend(Layout::from_records(&rows).columns(&rows, ""));
    write_frame(DataFrame::new(cols)?, path)
}

pub fn write_matched(
    records: &[MatchedRecord],
    left_label: &str,
    right_label: &str,
    path: &Path,
) -> Result<()> {
    let left: Vec<&VariantRecord> = records.iter().map(|m| &m.left).collect();
    let right: Vec<&VariantRecord> = records.iter().map(|m| &m.right).collect();
    let flipped: Vec<i32> = records.iter().map(|m| i32::from(m.allele_flipped)).collect();
    let ambiguous: Vec<i32> = records
        .iter()
        .map(|m| i32::from(m.strand_ambiguous))
        .collect();

    let mut cols = key_columns(records.iter().map(|m| &m.key));
    cols.extend(Layout::from_records(&left).columns(&left, &format!("_{left_label}")));
    cols.extend(Layout::from_records(&right).columns(&right, &format!("_{right_label}")));
    cols.push(Column::new("FLIPPED".into(), flipped));
    cols.push(Column::new("STRAND_AMBIGUOUS".into(), ambiguous));
    write_frame(DataFrame::new(cols)?, path)
}
