use crate::diag::Diagnostics;
use crate::errors::{BvbError, Result};

/// Canonical English columns of the listing download. The endpoint
/// serves either these or the Romanian captions, depending on
/// session/cookie state.
pub const EXPECTED_HEADERS: [&str; 16] = [
    "Symbol",
    "Security name",
    "ISIN",
    "Issuer",
    "Fiscal / Unique Code",
    "Shares",
    "Face value",
    "CAEN Code",
    "District",
    "Country",
    "Exchange segment",
    "Main Market",
    "Tier",
    "Status",
    "Trading Model Type",
    "Price steps list",
];

// Mappings recorded in Feb 2024 by downloading both file variants.
const RO_EN_MAPPINGS: [(&str, &str); 16] = [
    ("Simbol", "Symbol"),
    ("Denumire emisiune", "Security name"),
    ("ISIN", "ISIN"),
    ("Emitent", "Issuer"),
    ("Cod Fiscal / CUI", "Fiscal / Unique Code"),
    ("Actiuni", "Shares"),
    ("Valoare nominala", "Face value"),
    ("Cod CAEN", "CAEN Code"),
    ("Judet", "District"),
    ("Tara", "Country"),
    ("Sectiune bursa", "Exchange segment"),
    ("Piata Principala", "Main Market"),
    ("Categoria", "Tier"),
    ("Stare", "Status"),
    ("Model tranzactionare", "Trading Model Type"),
    ("Lista pasi de pret", "Price steps list"),
];

// The presence of this column marks a Romanian header row.
const RO_MARKER: &str = "Simbol";

/// Splits the raw header line on `;`, trims each token and, when the
/// row is Romanian, translates every token through the fixed mapping.
/// An unmapped token passes through unchanged with one warning.
pub fn normalize_header(line: &str, diag: &mut Diagnostics) -> Vec<String> {
    let mut headers: Vec<String> = line.split(';').map(|token| token.trim().to_string()).collect();

    if headers.iter().any(|header| header == RO_MARKER) {
        for header in headers.iter_mut() {
            match RO_EN_MAPPINGS.iter().find(|(ro, _)| *ro == header.as_str()) {
                Some((_, en)) => *header = en.to_string(),
                None => diag.warn(format!(
                    "no English mapping found for Romanian header '{}'",
                    header
                )),
            }
        }
    }

    headers
}

/// Order-independent presence check for the 16 expected columns.
/// Additional columns are allowed; they just won't be processed.
pub fn validate_header(headers: &[String]) -> Result<()> {
    for expected in EXPECTED_HEADERS {
        if !headers.iter().any(|header| header == expected) {
            return Err(BvbError::MissingColumn(expected.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| BvbError::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RO_HEADER: &str = "Simbol;Denumire emisiune;ISIN;Emitent;Cod Fiscal / CUI;Actiuni;\
        Valoare nominala;Cod CAEN;Judet;Tara;Sectiune bursa;Piata Principala;Categoria;Stare;\
        Model tranzactionare;Lista pasi de pret";

    fn en_header() -> String {
        EXPECTED_HEADERS.join(";")
    }

    #[test]
    fn romanian_headers_map_to_english() {
        let mut diag = Diagnostics::new();
        let normalized = normalize_header(RO_HEADER, &mut diag);
        assert_eq!(normalized, EXPECTED_HEADERS.to_vec());
        assert!(diag.is_empty());
    }

    #[test]
    fn normalization_is_idempotent_on_english_headers() {
        let mut diag = Diagnostics::new();
        let once = normalize_header(&en_header(), &mut diag);
        let twice = normalize_header(&once.join(";"), &mut diag);
        assert_eq!(once, twice);
        assert!(diag.is_empty());
    }

    #[test]
    fn unmapped_romanian_token_passes_through_with_one_warning() {
        let mut diag = Diagnostics::new();
        let line = format!("{};Coloana noua", RO_HEADER);
        let normalized = normalize_header(&line, &mut diag);
        assert_eq!(normalized.last().map(String::as_str), Some("Coloana noua"));
        assert_eq!(diag.warnings().len(), 1);
        assert!(diag.warnings()[0].contains("Coloana noua"));
    }

    #[test]
    fn tokens_are_trimmed() {
        let mut diag = Diagnostics::new();
        let normalized = normalize_header("Symbol ;  ISIN", &mut diag);
        assert_eq!(normalized, vec!["Symbol".to_string(), "ISIN".to_string()]);
    }

    #[test]
    fn missing_expected_column_is_fatal_and_named() {
        let headers: Vec<String> = EXPECTED_HEADERS
            .iter()
            .filter(|header| **header != "ISIN")
            .map(|header| header.to_string())
            .collect();
        match validate_header(&headers) {
            Err(BvbError::MissingColumn(name)) => assert_eq!(name, "ISIN"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn extra_columns_are_allowed() {
        let mut headers: Vec<String> =
            EXPECTED_HEADERS.iter().map(|header| header.to_string()).collect();
        headers.push("Extra".to_string());
        assert!(validate_header(&headers).is_ok());
    }
}
