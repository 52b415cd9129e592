use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Countries with a supported mobile-money corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "UG")]
    Uganda,
    #[serde(rename = "KE")]
    Kenya,
    #[serde(rename = "RW")]
    Rwanda,
    #[serde(rename = "TZ")]
    Tanzania,
}

impl Country {
    pub fn code(&self) -> &'static str {
        match self {
            Country::Uganda => "UG",
            Country::Kenya => "KE",
            Country::Rwanda => "RW",
            Country::Tanzania => "TZ",
        }
    }

    pub fn calling_code(&self) -> &'static str {
        match self {
            Country::Uganda => "256",
            Country::Kenya => "254",
            Country::Rwanda => "250",
            Country::Tanzania => "255",
        }
    }
}

static UG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+?256|0)?7\d{8}$").unwrap());
static KE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+?254|0)?(7|1)\d{8}$").unwrap());
static RW_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+?250|0)?7[2389]\d{7}$").unwrap());
static TZ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+?255|0)?[67]\d{8}$").unwrap());

/// Strips everything except digits and a leading `+`.
pub fn normalize(msisdn: &str) -> String {
    msisdn
        .char_indices()
        .filter(|&(i, c)| c.is_ascii_digit() || (c == '+' && i == 0))
        .map(|(_, c)| c)
        .collect()
}

/// Minimum number of digits for any destination after stripping separators.
pub const MIN_DIGITS: usize = 10;

pub fn digit_count(msisdn: &str) -> usize {
    msisdn.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Checks the number against the country's mobile-number pattern.
pub fn validate_mobile_number(msisdn: &str, country: Country) -> bool {
    let normalized = normalize(msisdn);
    let pattern = match country {
        Country::Uganda => &*UG_PATTERN,
        Country::Kenya => &*KE_PATTERN,
        Country::Rwanda => &*RW_PATTERN,
        Country::Tanzania => &*TZ_PATTERN,
    };
    pattern.is_match(normalized.trim_start_matches('+'))
}

/// Normalizes to E.164-like form, inserting the country calling code when the
/// local `0`-prefixed form is given.
pub fn format_mobile_number(msisdn: &str, country: Country) -> String {
    let normalized = normalize(msisdn);
    let cc = country.calling_code();
    if let Some(rest) = normalized.strip_prefix('0') {
        format!("+{cc}{rest}")
    } else if let Some(rest) = normalized.strip_prefix('+') {
        format!("+{rest}")
    } else if normalized.starts_with(cc) {
        format!("+{normalized}")
    } else {
        format!("+{cc}{normalized}")
    }
}
