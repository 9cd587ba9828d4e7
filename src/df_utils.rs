use anyhow::{Context, Result};
use polars::prelude::*;

// Single-row frames hold scalar columns, so every read goes through
// `as_materialized_series`.

pub fn cast_columns(mut df: DataFrame, cols: &[&str], dtype: &DataType) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && column.dtype() != dtype
        {
            let casted = column
                .as_materialized_series()
                .cast(dtype)
                .with_context(|| format!("cast {col} to {dtype}"))?;
            df.with_column(casted.with_name((*col).into()).into_column())?;
        }
    }
    Ok(df)
}

pub fn uppercase_columns(mut df: DataFrame, cols: &[&str]) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && let Ok(values) = column.as_materialized_series().str()
        {
            let upper: StringChunked = values
                .into_iter()
                .map(|v| v.map(str::to_ascii_uppercase))
                .collect();
            df.with_column(upper.with_name((*col).into()).into_column())?;
        }
    }
    Ok(df)
}

pub fn str_values(df: &DataFrame, col: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(col) else {
        return Ok(None);
    };
    let values = column
        .as_materialized_series()
        .str()
        .with_context(|| col.to_string())?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

pub fn f64_values(df: &DataFrame, col: &str) -> Result<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(col) else {
        return Ok(None);
    };
    let values = column
        .as_materialized_series()
        .f64()
        .with_context(|| col.to_string())?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(Some(values))
}
