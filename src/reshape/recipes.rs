//! Per-kind recipes: the table layout to parse and the reshaping applied to it.

use chrono::NaiveDate;
use polars::prelude::*;

use super::{keep_codes, unpivot_hours, with_date, with_text, TableFormat, HOUR_LABEL, HOUR_TIMESTAMP};
use crate::kinds::KindId;
use crate::metadata::AsicFile;

pub struct ReshapeRecipe {
    pub kind: &'static str,
    pub format: fn() -> TableFormat,
    pub run: fn(DataFrame, &AsicFile) -> PolarsResult<DataFrame>,
}

static RECIPES: &[ReshapeRecipe] = &[
    ReshapeRecipe { kind: "adem", format: TableFormat::hourly, run: adem },
    ReshapeRecipe { kind: "aenc", format: TableFormat::hourly, run: aenc },
    ReshapeRecipe { kind: "trsd", format: TableFormat::hourly, run: trsd },
    ReshapeRecipe { kind: "tgrl", format: TableFormat::hourly, run: tgrl },
    ReshapeRecipe { kind: "pep", format: pep_format, run: pep },
    ReshapeRecipe { kind: "pme", format: pme_format, run: pme },
    ReshapeRecipe { kind: "trsm", format: text_only, run: passthrough },
    ReshapeRecipe { kind: "tserv", format: text_only, run: passthrough },
    ReshapeRecipe { kind: "tfroc", format: text_only, run: passthrough },
];

pub fn recipe_for(kind: &KindId) -> Option<&'static ReshapeRecipe> {
    RECIPES.iter().find(|r| r.kind == kind.as_str())
}

fn pep_format() -> TableFormat { TableFormat::settlement(&["VALOR PE"]) }
fn pme_format() -> TableFormat { TableFormat::settlement(&["VALOR"]) }
fn text_only() -> TableFormat { TableFormat::settlement(&[]) }

fn file_date(file: &AsicFile) -> PolarsResult<NaiveDate> {
    file.effective_date().ok_or_else(|| PolarsError::ComputeError(format!("{} has no calendar date", file.remote_path).into()))
}

fn ordered(df: DataFrame, columns: &[&str]) -> PolarsResult<DataFrame> {
    df.lazy().select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>()).collect()
}

/// Demand and losses, regulated and non-regulated.
fn adem(df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    let df = keep_codes(&df, "CODIGO", &["DMRE", "PRRE", "DMNR", "PRNR"])?;
    let long = unpivot_hours(&df, &["AGENTE", "CODIGO", "CONTENIDO"], file_date(file)?, "VALOR")?;
    ordered(long, &[HOUR_TIMESTAMP, HOUR_LABEL, "AGENTE", "CODIGO", "VALOR"])
}

/// Energy per commercial border; the agent comes from the directory the file was published in.
fn aenc(mut df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    let agent = file.metadata.agent.as_deref().ok_or_else(|| PolarsError::ComputeError("aenc file without agent".into()))?;
    with_text(&mut df, "AGENTE", &agent.to_ascii_uppercase())?;
    let ids = ["AGENTE", "CODIGO SIC", "CODIGO PROPIO", "TIPO DE AGRUPACIÓN", "IMPO - EXPO"];
    let long = unpivot_hours(&df, &ids, file_date(file)?, "VALOR")?;
    let mut cols = vec![HOUR_TIMESTAMP, HOUR_LABEL];
    cols.extend(ids);
    cols.push("VALOR");
    ordered(long, &cols)
}

fn trsd(df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    let long = unpivot_hours(&df, &["CODIGO", "CONTENIDO"], file_date(file)?, "PRECIO")?;
    ordered(long, &[HOUR_TIMESTAMP, "CODIGO", "CONTENIDO", "PRECIO"])
}

fn tgrl(df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    let long = unpivot_hours(&df, &["AGENTE", "CODIGO", "CONTENIDO"], file_date(file)?, "VALOR")?;
    ordered(long, &[HOUR_TIMESTAMP, "AGENTE", "CODIGO", "CONTENIDO", "VALOR"])
}

/// Weighted scarcity price, one row per agent per day.
fn pep(mut df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    with_date(&mut df, "FECHA", file_date(file)?)?;
    ordered(df, &["FECHA", "AGENTE", "VALOR PE"])
}

fn pme(mut df: DataFrame, file: &AsicFile) -> PolarsResult<DataFrame> {
    let m = &file.metadata;
    with_text(&mut df, "MES", &format!("{:04}-{:02}", m.year, m.month))?;
    ordered(df, &["MES", "CONCEPTO", "DESCRIPCION", "VALOR"])
}

fn passthrough(df: DataFrame, _file: &AsicFile) -> PolarsResult<DataFrame> { Ok(df) }
