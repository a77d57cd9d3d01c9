use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
    "DOI:",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = DOI_PREFIXES
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .map(str::trim_start)
            .unwrap_or(input);

        // 10.<registrant>/<suffix>, suffix non-empty
        if !stripped.starts_with("10.") {
            return Err(ScienceError::InvalidIdentifier(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ScienceError::InvalidIdentifier(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(ScienceError::InvalidIdentifier(input.to_string()));
        }

        Ok(Self {
            raw: input.to_string(),
            normalized: stripped.to_lowercase(),
        })
    }
}
