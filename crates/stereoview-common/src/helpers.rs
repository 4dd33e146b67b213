//! Common helper functions for Stereoview.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// A `width x height` pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns a copy with both sides checked against `[min, max]`.
    pub fn validated(self, name: &str, min: u32, max: u32) -> Result<Self> {
        Ok(Self {
            width: validate_dimension(&format!("{name} width"), self.width, min, max)?,
            height: validate_dimension(&format!("{name} height"), self.height, min, max)?,
        })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_dimensions(s)
    }
}

/// Parses `"<width>x<height>"` (case-insensitive separator, surrounding whitespace ignored).
pub fn parse_dimensions(value: &str) -> Result<Dimensions> {
    let trimmed = value.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::config(format!("expected <width>x<height>, got `{trimmed}`")))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::config(format!("invalid width `{}`", w.trim())))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::config(format!("invalid height `{}`", h.trim())))?;
    Ok(Dimensions { width, height })
}

/// Checks that `value` lies within `[min, max]`.
pub fn validate_dimension(name: &str, value: u32, min: u32, max: u32) -> Result<u32> {
    if value < min || value > max {
        return Err(Error::config(format!(
            "{name} must be within {min}..={max}, got {value}"
        )));
    }
    Ok(value)
}

/// Reads and deserializes a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::not_found(path.display()),
        _ => Error::Io(e),
    })?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1000x500").unwrap(), Dimensions::new(1000, 500));
        assert_eq!(parse_dimensions(" 64X64 ").unwrap(), Dimensions::new(64, 64));
        assert_eq!(parse_dimensions("2048 x 1024").unwrap(), Dimensions::new(2048, 1024));
    }

    #[test]
    fn test_parse_dimensions_rejects_garbage() {
        assert!(parse_dimensions("").is_err());
        assert!(parse_dimensions("1000").is_err());
        assert!(parse_dimensions("ax500").is_err());
        assert!(parse_dimensions("1000x-5").is_err());
    }

    #[test]
    fn test_validate_dimension_bounds() {
        assert_eq!(validate_dimension("w", 64, 64, 8192).unwrap(), 64);
        assert_eq!(validate_dimension("w", 8192, 64, 8192).unwrap(), 8192);
        assert!(matches!(
            validate_dimension("w", 63, 64, 8192),
            Err(Error::Config(_))
        ));
        assert!(validate_dimension("w", 8193, 64, 8192).is_err());
    }

    #[test]
    fn test_dimensions_validated_names_side() {
        let err = Dimensions::new(100, 10)
            .validated("window", 64, 8192)
            .unwrap_err();
        assert!(err.to_string().contains("window height"));
    }

    #[test]
    fn test_load_json_missing_file() {
        let result: Result<serde_json::Value> =
            load_json("/nonexistent/stereoview/settings.json");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
