use std::fmt;

use crate::identifiers::doi::Doi;

pub const OPENALEX_URI_PREFIX: &str = "https://openalex.org/";

/// How a user-supplied identifier is looked up upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkIdentifier {
    /// Direct lookup by provider key, e.g. `W2741809807`.
    OpenAlex(String),
    /// Filter lookup by DOI; the first match wins.
    Doi(String),
}

impl WorkIdentifier {
    /// Detect the identifier form. Work URIs and bare `W<digits>` keys are
    /// provider ids; everything else is treated as a DOI, normalized when it
    /// parses as one and passed through trimmed otherwise.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some(key) = input
            .strip_prefix(OPENALEX_URI_PREFIX)
            .or_else(|| input.strip_prefix("http://openalex.org/"))
        {
            return Self::OpenAlex(key.trim_matches('/').to_string());
        }
        if is_openalex_key(input) {
            return Self::OpenAlex(input.to_uppercase());
        }
        match Doi::parse(input) {
            Ok(doi) => Self::Doi(doi.normalized),
            Err(_) => Self::Doi(input.to_string()),
        }
    }
}

impl fmt::Display for WorkIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAlex(key) => write!(f, "{OPENALEX_URI_PREFIX}{key}"),
            Self::Doi(doi) => write!(f, "{doi}"),
        }
    }
}

fn is_openalex_key(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some('W' | 'w'))
        && s.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}
