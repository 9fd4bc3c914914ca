//! Utility-bill PDF parser.
//!
//! Extracts one bill record per PDF document:
//! - Billing period: "Service from MM/DD/YY - MM/DD/YY"
//! - Usage: "<n> kWh X"
//! - Total: "Total Amount Due $<amount>"
//!
//! The tool targets a single supplier's bill layout; a document where any
//! required field fails to match is rejected with the reason.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur while parsing a bill document.
#[derive(Debug, Error)]
pub enum BillError {
    #[error("IO error reading bill file: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF text extraction error: {0}")]
    Pdf(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid field value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Bill data extracted from one document, before it is assigned an id and
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBill {
    /// First day of the billing period.
    pub billing_start: NaiveDate,
    /// Last day of the billing period (inclusive).
    pub billing_end: NaiveDate,
    /// Total energy used over the period.
    pub kwh_used: i64,
    /// Total amount due in dollars.
    pub total_cost: Decimal,
}

fn period_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Service from (\d{2}/\d{2}/\d{2}) - (\d{2}/\d{2}/\d{2})")
            .expect("valid period regex")
    })
}

fn usage_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*kWh\s+X").expect("valid usage regex"))
}

fn total_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Total Amount Due\s+\$?(\d+\.\d{2})").expect("valid total regex"))
}

/// Parse a bill PDF from raw bytes: extract the text layer, then the fields.
pub fn parse_bill_pdf(pdf_bytes: &[u8]) -> Result<ParsedBill, BillError> {
    let text = pdf_extract::extract_text_from_mem(pdf_bytes).map_err(|e| {
        BillError::Pdf(e.to_string())
    })?;
    parse_bill_text(&text)
}

/// Parse a bill PDF from disk.
pub fn parse_bill_file(path: &Path) -> Result<ParsedBill, BillError> {
    let bytes = std::fs::read(path)?;
    parse_bill_pdf(&bytes)
}

/// Extract bill fields from already-extracted document text.
///
/// Pure function (no I/O) — all field matching and validation lives here so
/// it can be tested without PDFs.
pub fn parse_bill_text(text: &str) -> Result<ParsedBill, BillError> {
    let period = period_regex()
        .captures(text)
        .ok_or_else(|| BillError::MissingField("service period (Service from ... - ...)".to_string()))?;
    let usage = usage_regex()
        .captures(text)
        .ok_or_else(|| BillError::MissingField("kWh usage".to_string()))?;
    let total = total_regex()
        .captures(text)
        .ok_or_else(|| BillError::MissingField("Total Amount Due".to_string()))?;

    let billing_start = parse_bill_date(&period[1], "service period start")?;
    let billing_end = parse_bill_date(&period[2], "service period end")?;

    if billing_end <= billing_start {
        return Err(BillError::InvalidValue {
            field: "service period".to_string(),
            message: format!(
                "end date {} is not after start date {}",
                billing_end, billing_start
            ),
        });
    }

    let kwh_used: i64 = usage[1].parse().map_err(|_| BillError::InvalidValue {
        field: "kWh usage".to_string(),
        message: format!("not a valid integer: '{}'", &usage[1]),
    })?;

    let total_cost = Decimal::from_str(&total[1]).map_err(|_| BillError::InvalidValue {
        field: "Total Amount Due".to_string(),
        message: format!("not a valid amount: '{}'", &total[1]),
    })?;

    Ok(ParsedBill {
        billing_start,
        billing_end,
        kwh_used,
        total_cost,
    })
}

/// Parse a two-digit-year bill date ("01/10/25" → 2025-01-10).
fn parse_bill_date(s: &str, field: &str) -> Result<NaiveDate, BillError> {
    NaiveDate::parse_from_str(s, "%m/%d/%y").map_err(|e| BillError::InvalidValue {
        field: field.to_string(),
        message: format!("not a valid MM/DD/YY date: '{}' ({})", s, e),
    })
}

/// Scan a directory for `*.pdf` files and parse each one.
///
/// Unparsable documents are skipped with an error log, matching the upload
/// endpoint's per-file behaviour.
pub fn load_bills_from_dir(dir: &Path) -> Result<Vec<(String, ParsedBill)>, BillError> {
    let mut bills = Vec::new();
    if !dir.exists() {
        tracing::warn!("Bills directory does not exist: {}", dir.display());
        return Ok(bills);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "pdf") {
            tracing::info!("Loading bill from PDF: {}", path.display());
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            match parse_bill_file(&path) {
                Ok(bill) => {
                    tracing::info!(
                        "  Parsed bill {} → {}: {} kWh, ${}",
                        bill.billing_start,
                        bill.billing_end,
                        bill.kwh_used,
                        bill.total_cost
                    );
                    bills.push((filename, bill));
                }
                Err(e) => {
                    tracing::error!("  Failed to parse {}: {}", path.display(), e);
                }
            }
        }
    }
    Ok(bills)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_BILL_TEXT: &str = "\
Eversource Energy
Account 51-1234567-8
Service from 01/10/25 - 02/09/25
Electricity used
523 kWh X $0.24523 per kWh
Delivery charges
Total Amount Due $184.30
Payment due 03/01/25
";

    #[test]
    fn test_parse_sample_bill() {
        let bill = parse_bill_text(SAMPLE_BILL_TEXT).unwrap();
        assert_eq!(
            bill.billing_start,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert_eq!(
            bill.billing_end,
            NaiveDate::from_ymd_opt(2025, 2, 9).unwrap()
        );
        assert_eq!(bill.kwh_used, 523);
        assert_eq!(bill.total_cost, Decimal::from_str("184.30").unwrap());
    }

    #[test]
    fn test_total_without_dollar_sign() {
        let text = SAMPLE_BILL_TEXT.replace("Total Amount Due $184.30", "Total Amount Due 184.30");
        let bill = parse_bill_text(&text).unwrap();
        assert_eq!(bill.total_cost, Decimal::from_str("184.30").unwrap());
    }

    #[test]
    fn test_missing_period_errors() {
        let text = "523 kWh X $0.24523\nTotal Amount Due $184.30";
        let err = parse_bill_text(text).unwrap_err();
        assert!(err.to_string().contains("service period"));
    }

    #[test]
    fn test_missing_usage_errors() {
        let text = "Service from 01/10/25 - 02/09/25\nTotal Amount Due $184.30";
        let err = parse_bill_text(text).unwrap_err();
        assert!(err.to_string().contains("kWh"));
    }

    #[test]
    fn test_missing_total_errors() {
        let text = "Service from 01/10/25 - 02/09/25\n523 kWh X $0.24523";
        let err = parse_bill_text(text).unwrap_err();
        assert!(err.to_string().contains("Total Amount Due"));
    }

    #[test]
    fn test_period_end_before_start_errors() {
        let text = SAMPLE_BILL_TEXT.replace(
            "Service from 01/10/25 - 02/09/25",
            "Service from 02/09/25 - 01/10/25",
        );
        let err = parse_bill_text(&text).unwrap_err();
        assert!(err.to_string().contains("not after"));
    }

    #[test]
    fn test_zero_length_period_errors() {
        let text = SAMPLE_BILL_TEXT.replace(
            "Service from 01/10/25 - 02/09/25",
            "Service from 01/10/25 - 01/10/25",
        );
        assert!(parse_bill_text(&text).is_err());
    }

    #[test]
    fn test_two_digit_year_maps_to_2000s() {
        let bill = parse_bill_text(SAMPLE_BILL_TEXT).unwrap();
        assert_eq!(bill.billing_start.format("%Y").to_string(), "2025");
    }

    #[test]
    fn test_year_rollover_period() {
        let text = SAMPLE_BILL_TEXT.replace(
            "Service from 01/10/25 - 02/09/25",
            "Service from 12/10/24 - 01/09/25",
        );
        let bill = parse_bill_text(&text).unwrap();
        assert_eq!(
            bill.billing_start,
            NaiveDate::from_ymd_opt(2024, 12, 10).unwrap()
        );
        assert_eq!(
            bill.billing_end,
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
        );
    }

    /// Generate a valid PDF with text using lopdf (the library that pdf-extract
    /// uses internally), one text line per `Tj` operator.
    fn make_test_pdf(lines: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut content = String::from("BT /F1 12 Tf 72 720 Td ");
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                content.push_str("0 -16 Td ");
            }
            content.push_str(&format!("({line}) Tj "));
        }
        content.push_str("ET");
        let content_stream = Stream::new(dictionary! {}, content.into_bytes());
        let content_id = doc.add_object(content_stream);

        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        };

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });

        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_parse_bill_pdf_roundtrip() {
        let pdf = make_test_pdf(&[
            "Service from 01/10/25 - 02/09/25",
            "Electricity supply",
            "523 kWh X $0.24523 per kWh",
            "Total Amount Due $184.30",
        ]);
        let bill = parse_bill_pdf(&pdf).unwrap();
        assert_eq!(bill.kwh_used, 523);
        assert_eq!(bill.total_cost, Decimal::from_str("184.30").unwrap());
    }

    #[test]
    fn test_parse_bill_pdf_rejects_non_pdf() {
        let err = parse_bill_pdf(b"this is not a pdf").unwrap_err();
        assert!(matches!(err, BillError::Pdf(_)));
    }

    #[test]
    fn test_load_bills_from_missing_dir() {
        let bills = load_bills_from_dir(Path::new("/nonexistent/bills")).unwrap();
        assert!(bills.is_empty());
    }
}
