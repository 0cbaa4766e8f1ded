use crate::utils::error::{LoadError, Result};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(LoadError::invalid_value(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(LoadError::invalid_value(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(LoadError::invalid_value(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LoadError::invalid_value(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN fails both comparisons, so test for containment instead of exclusion
    if !(value >= min && value <= max) {
        return Err(LoadError::invalid_value(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_non_zero_duration(field_name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(LoadError::invalid_value(
            field_name,
            humantime::format_duration(value),
            "Duration must be greater than zero",
        ));
    }
    Ok(())
}

/// Needs two different values, otherwise a distinct pair can never be drawn.
pub fn validate_distinct_values(field_name: &str, values: &[String]) -> Result<()> {
    let distinct: HashSet<&str> = values.iter().map(String::as_str).collect();
    if distinct.len() < 2 {
        return Err(LoadError::invalid_value(
            field_name,
            values.join(","),
            "At least two distinct values are required",
        ));
    }
    Ok(())
}
