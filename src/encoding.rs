//! Input character encoding resolution.
//!
//! The encoding is resolved once at start-up: the label declared in the
//! specification, else the charset of the process locale, else UTF-8.

use encoding_rs::{Encoding, UTF_8};
use std::env;
use std::fmt;

use crate::error::ConvertError;

/// Locale variables consulted, highest precedence first.
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG"];

/// Where the resolved encoding came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingSource {
    Declared,
    Locale(String),
    Default,
}

impl fmt::Display for EncodingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingSource::Declared => write!(f, "specification"),
            EncodingSource::Locale(var) => write!(f, "{}", var),
            EncodingSource::Default => write!(f, "default"),
        }
    }
}

/// Resolve the input encoding.
///
/// # Arguments
/// * `declared` - Encoding label from the specification, if any
///
/// # Errors
/// Returns [`ConvertError::UnknownEncoding`] if `declared` is not a known label
pub fn resolve_encoding(
    declared: Option<&str>,
) -> Result<(&'static Encoding, EncodingSource), ConvertError> {
    if let Some(label) = declared {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ConvertError::UnknownEncoding(label.to_string()))?;
        return Ok((encoding, EncodingSource::Declared));
    }

    Ok(encoding_from_locale(|var| env::var(var).ok()).unwrap_or((UTF_8, EncodingSource::Default)))
}

/// Encoding named by the first set locale variable, if it names a known charset.
pub fn encoding_from_locale<F>(lookup: F) -> Option<(&'static Encoding, EncodingSource)>
where
    F: Fn(&str) -> Option<String>,
{
    let (var, value) = LOCALE_VARS
        .iter()
        .find_map(|var| lookup(var).filter(|v| !v.is_empty()).map(|v| (*var, v)))?;

    let charset = locale_charset(&value)?;
    match Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => Some((encoding, EncodingSource::Locale(var.to_string()))),
        None => {
            tracing::debug!("Ignoring unknown locale charset '{}' from {}", charset, var);
            None
        }
    }
}

/// Charset part of a locale name: `en_NZ.UTF-8@euro` -> `UTF-8`.
fn locale_charset(locale: &str) -> Option<&str> {
    let (_, rest) = locale.split_once('.')?;
    let charset = rest.split('@').next().unwrap_or(rest);
    (!charset.is_empty()).then_some(charset)
}
