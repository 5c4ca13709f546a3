//! Harvested contract records

use serde::{Deserialize, Serialize};

/// One logical contract record, merged from a head row and its tail row.
///
/// Field order is the column order of the output artifact; the serialized
/// headers match the spreadsheet operators already work with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRow {
    #[serde(rename = "No")]
    pub sequence_no: String,

    #[serde(rename = "계약구분")]
    pub category: String,

    /// Contract number exactly as displayed (separators kept)
    #[serde(rename = "계약번호")]
    pub contract_no: String,

    #[serde(rename = "계약명")]
    pub title: String,

    #[serde(rename = "금액")]
    pub amount: String,

    #[serde(rename = "계약대상자")]
    pub counterparty: String,

    #[serde(rename = "기관명", default)]
    pub organization: String,

    #[serde(rename = "계약일", default)]
    pub contract_date: String,
}

impl RecordRow {
    /// Column headers in output order
    pub const HEADERS: [&'static str; 8] = [
        "No",
        "계약구분",
        "계약번호",
        "계약명",
        "금액",
        "계약대상자",
        "기관명",
        "계약일",
    ];

    /// Digits of the contract number, separators stripped
    #[must_use]
    pub fn contract_digits(&self) -> String {
        digits_only(&self.contract_no)
    }
}

/// Strips every non-ASCII-digit character
#[must_use]
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
