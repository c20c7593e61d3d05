//! Regex patterns for invoice table rows.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Item, Description, NCM, Unit, Quantity, R1, R2, Amount.
    // \d is any Unicode decimal digit; Unit is ASCII uppercase only.
    pub static ref ROW_PATTERN: Regex = Regex::new(concat!(
        r"^\s*(\d{2})\s+",
        r"(.+?)\s+",
        r"(\d{4}\.\d{2}\.\d{2})\s+",
        r"([A-Z]{2,3})\s+",
        r"([\d.,]+(?:\.\d{2})?)\s+",
        r"([\d.,]+)\s+",
        r"([\d.,]+)\s+",
        r"([\d.,]+)\s*$",
    ))
    .unwrap();
}
