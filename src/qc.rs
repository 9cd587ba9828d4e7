use std::path::Path;

use crate::error::{HarmonizeError, Result};

pub fn check_equal_length(
    left_len: usize,
    right_len: usize,
    left_name: &str,
    right_name: &str,
) -> Result<()> {
    if left_len != right_len {
        return Err(HarmonizeError::InvalidArgument(format!(
            "Length of {left_name} ({left_len}) and {right_name} ({right_len}) should be equal"
        )));
    }
    Ok(())
}

pub fn check_sample_size(n: f64, name: &str) -> Result<()> {
    if !n.is_finite() || n <= 0.0 {
        return Err(HarmonizeError::InvalidArgument(format!(
            "Sample size {name} should be a positive finite number, got {n}"
        )));
    }
    Ok(())
}

pub fn check_threshold(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(HarmonizeError::InvalidArgument(format!(
            "Threshold {name} should be in (0, 1], got {value}"
        )));
    }
    Ok(())
}

pub fn check_file_exists(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(HarmonizeError::InvalidArgument(format!(
            "File {path:?} passed to {name} does not exist"
        )));
    }
    Ok(())
}
