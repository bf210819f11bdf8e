//! Reshaping downloaded settlement tables
//! -------------------------------------
//! Raw files are `;`-separated text, usually cp1252. Every column is read as text and
//! only the declared numeric columns are cast, so codes with leading zeros survive.
//! Hourly files carry `HORA 01 .. HORA 24` columns which are turned into long rows.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;

use crate::error::{AsicError, AsicResult};
use crate::metadata::AsicFile;

pub mod recipes;

pub use recipes::{recipe_for, ReshapeRecipe};

pub const HOUR_LABEL: &str = "NOMBRE HORA";
pub const HOUR_TIMESTAMP: &str = "FECHA_HORA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Windows1252,
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFormat {
    pub separator: u8,
    pub encoding: SourceEncoding,
    pub float_columns: Vec<String>,
}

impl TableFormat {
    /// `;`-separated cp1252, the layout every published text file uses.
    pub fn settlement(float_columns: &[&str]) -> Self {
        Self { separator: b';', encoding: SourceEncoding::Windows1252, float_columns: float_columns.iter().map(|c| c.to_string()).collect() }
    }

    /// Settlement layout whose numeric columns are the 24 hours.
    pub fn hourly() -> Self {
        let mut f = Self::settlement(&[]);
        f.float_columns = hour_columns();
        f
    }
}

pub fn hour_columns() -> Vec<String> { (1..=24).map(|h| format!("HORA {h:02}")).collect() }

pub fn decode(bytes: &[u8], encoding: SourceEncoding) -> String {
    match encoding {
        SourceEncoding::Windows1252 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        SourceEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub fn read_table(bytes: &[u8], format: &TableFormat) -> PolarsResult<DataFrame> {
    let text = decode(bytes, format.encoding);
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(format.separator).with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;
    // headers are published padded
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.trim().to_string()).collect();
    df.set_column_names(names)?;
    for name in &format.float_columns {
        let c = df.column(name)?.cast(&DataType::Float64)?;
        df.with_column(c)?;
    }
    Ok(df)
}

fn midnight_millis(date: NaiveDate) -> i64 { date.and_time(NaiveTime::MIN).and_utc().timestamp_millis() }

/// Wide hourly layout to long rows: one row per (id columns, hour) with the hour's
/// timestamp (`date` + hour - 1), its label and its value.
pub fn unpivot_hours(df: &DataFrame, id_columns: &[&str], date: NaiveDate, value_name: &str) -> PolarsResult<DataFrame> {
    let ids = df.select(id_columns.iter().copied())?;
    let n = df.height();
    let base = midnight_millis(date);
    let mut out: Option<DataFrame> = None;
    for (idx, label) in hour_columns().iter().enumerate() {
        let Ok(col) = df.column(label) else { continue };
        let mut value = col.cast(&DataType::Float64)?.as_materialized_series().clone();
        value.rename(value_name.into());
        let ts = Series::new(HOUR_TIMESTAMP.into(), vec![base + idx as i64 * 3_600_000; n])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let names = Series::new(HOUR_LABEL.into(), vec![label.as_str(); n]);
        let mut part = ids.clone();
        part.hstack_mut(&[ts.into(), names.into(), value.into()])?;
        match out.as_mut() {
            Some(acc) => { acc.vstack_mut(&part)?; }
            None => out = Some(part),
        }
    }
    out.ok_or_else(|| PolarsError::ColumnNotFound("no HORA columns to unpivot".into()))
}

/// Constant text column.
pub fn with_text(df: &mut DataFrame, name: &str, value: &str) -> PolarsResult<()> {
    let n = df.height();
    df.with_column(Series::new(name.into(), vec![value; n]))?;
    Ok(())
}

/// Constant date column.
pub fn with_date(df: &mut DataFrame, name: &str, date: NaiveDate) -> PolarsResult<()> {
    let n = df.height();
    // Date columns count days from 1970-01-01, which is NaiveDate's default
    let days = (date - NaiveDate::default()).num_days() as i32;
    df.with_column(Series::new(name.into(), vec![days; n]).cast(&DataType::Date)?)?;
    Ok(())
}

/// Keep rows whose `column` (trimmed) is one of `allowed`.
pub fn keep_codes(df: &DataFrame, column: &str, allowed: &[&str]) -> PolarsResult<DataFrame> {
    let values = df.column(column)?.as_materialized_series().str()?;
    let mask: Vec<bool> = values.into_iter().map(|v| v.is_some_and(|c| allowed.contains(&c.trim()))).collect();
    df.filter(&BooleanChunked::from_slice("mask".into(), &mask))
}

/// Parse a raw downloaded file and run its kind's recipe.
pub fn preprocess(bytes: &[u8], file: &AsicFile) -> AsicResult<DataFrame> {
    let kind = file.kind.to_string();
    let recipe = recipe_for(&file.kind).ok_or_else(|| AsicError::Reshape { kind: kind.clone(), message: "no reshaping recipe for this kind".into() })?;
    let reshape = |e: PolarsError| AsicError::Reshape { kind: kind.clone(), message: e.to_string() };
    let df = read_table(bytes, &(recipe.format)()).map_err(reshape)?;
    (recipe.run)(df, file).map_err(reshape)
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> AsicResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AsicError::io(parent.display().to_string(), e))?;
    }
    let mut f = File::create(path).map_err(|e| AsicError::io(path.display().to_string(), e))?;
    CsvWriter::new(&mut f)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|e| AsicError::Reshape { kind: "csv".into(), message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOURLY: &str = "CODIGO;CONTENIDO;HORA 01;HORA 02\nPBNA;Precio bolsa;100.5;101\nPBNA2; Otro ;1;\n";

    #[test]
    fn reads_everything_as_text_then_casts() {
        let mut fmt = TableFormat::settlement(&["HORA 01"]);
        fmt.encoding = SourceEncoding::Utf8;
        let df = read_table(HOURLY.as_bytes(), &fmt).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("HORA 01").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("HORA 02").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn decodes_cp1252() {
        let raw = b"AGENTE;TIPO DE AGRUPACI\xd3N\nENBC;X\n";
        let df = read_table(raw, &TableFormat::settlement(&[])).unwrap();
        assert!(df.get_column_names().iter().any(|n| n.as_str() == "TIPO DE AGRUPACIÓN"));
    }

    #[test]
    fn missing_float_column_fails() {
        assert!(read_table(b"A;B\n1;2\n", &TableFormat::settlement(&["C"])).is_err());
    }

    #[test]
    fn unpivots_hours_into_long_rows() {
        let mut fmt = TableFormat::settlement(&[]);
        fmt.encoding = SourceEncoding::Utf8;
        let df = read_table(HOURLY.as_bytes(), &fmt).unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let long = unpivot_hours(&df, &["CODIGO"], date, "PRECIO").unwrap();
        assert_eq!(long.shape(), (4, 4));
        let labels: Vec<Option<&str>> = long.column(HOUR_LABEL).unwrap().as_materialized_series().str().unwrap().into_iter().collect();
        assert_eq!(labels, vec![Some("HORA 01"), Some("HORA 01"), Some("HORA 02"), Some("HORA 02")]);
        let prices: Vec<Option<f64>> = long.column("PRECIO").unwrap().as_materialized_series().f64().unwrap().into_iter().collect();
        assert_eq!(prices, vec![Some(100.5), Some(1.0), Some(101.0), None]);
        let ts = long.column(HOUR_TIMESTAMP).unwrap().cast(&DataType::Int64).unwrap();
        let ts: Vec<Option<i64>> = ts.as_materialized_series().i64().unwrap().into_iter().collect();
        assert_eq!(ts[2].unwrap() - ts[0].unwrap(), 3_600_000);
        assert_eq!(ts[0], Some(midnight_millis(date)));
    }

    #[test]
    fn code_mask() {
        let mut fmt = TableFormat::settlement(&[]);
        fmt.encoding = SourceEncoding::Utf8;
        let df = read_table(HOURLY.as_bytes(), &fmt).unwrap();
        assert_eq!(keep_codes(&df, "CODIGO", &["PBNA"]).unwrap().height(), 1);
    }
}
