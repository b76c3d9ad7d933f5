use crate::errors::{BvbError, Result};
use crate::models::company::Company;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref SYMBOL: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
    static ref ISIN: Regex = Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").unwrap();
}

/// Exchange segment of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Segment {
    #[serde(rename = "BSE")]
    Bse,
    #[serde(rename = "BER")]
    Ber,
    #[serde(rename = "ATS")]
    Ats,
}

impl Segment {
    pub(crate) fn parse(value: &str) -> Result<Option<Self>> {
        match value.trim() {
            "" => Ok(None),
            "BSE" => Ok(Some(Self::Bse)),
            "BER" => Ok(Some(Self::Ber)),
            "ATS" => Ok(Some(Self::Ats)),
            other => Err(BvbError::Validation {
                field: "segment",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bse => "BSE",
            Self::Ber => "BER",
            Self::Ats => "ATS",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main market an instrument trades on, by the exchange's wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Market {
    /// Regulated market (`REGS`).
    #[serde(rename = "REGS")]
    Regs,
    /// AeRO (`XRS1`).
    #[serde(rename = "XRS1")]
    Aero,
    /// MTS International (`XRSI`).
    #[serde(rename = "XRSI")]
    MtsIntl,
}

impl Market {
    pub(crate) fn parse(value: &str) -> Result<Option<Self>> {
        match value.trim() {
            "" | "-" => Ok(None),
            "REGS" => Ok(Some(Self::Regs)),
            "XRS1" => Ok(Some(Self::Aero)),
            "XRSI" => Ok(Some(Self::MtsIntl)),
            other => Err(BvbError::Validation {
                field: "market",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regs => "REGS",
            Self::Aero => "XRS1",
            Self::MtsIntl => "XRSI",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Market tier. The exchange serves Romanian captions for some tiers
/// depending on session state; those are folded into the English ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    #[serde(rename = "INT'L")]
    Intl,
    #[serde(rename = "PREMIUM")]
    Premium,
    #[serde(rename = "STANDARD")]
    Standard,
    #[serde(rename = "AERO PREMIUM")]
    AeroPremium,
    #[serde(rename = "AERO STANDARD")]
    AeroStandard,
    #[serde(rename = "AERO BASE")]
    AeroBase,
    #[serde(rename = "INTL-MTS")]
    IntlMts,
    #[serde(rename = "III-R")]
    IiiR,
}

impl Tier {
    pub(crate) fn parse(value: &str) -> Result<Option<Self>> {
        let upper = value.trim().to_uppercase();
        // Romanian captions observed in the downloaded listing
        let folded = match upper.as_str() {
            "INTL-SMT" => "INTL-MTS",
            "AERO BAZA" => "AERO BASE",
            other => other,
        };
        match folded {
            "" | "-" => Ok(None),
            "INT'L" => Ok(Some(Self::Intl)),
            "PREMIUM" => Ok(Some(Self::Premium)),
            "STANDARD" => Ok(Some(Self::Standard)),
            "AERO PREMIUM" => Ok(Some(Self::AeroPremium)),
            "AERO STANDARD" => Ok(Some(Self::AeroStandard)),
            "AERO BASE" => Ok(Some(Self::AeroBase)),
            "INTL-MTS" => Ok(Some(Self::IntlMts)),
            "III-R" => Ok(Some(Self::IiiR)),
            other => Err(BvbError::Validation {
                field: "tier",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intl => "INT'L",
            Self::Premium => "PREMIUM",
            Self::Standard => "STANDARD",
            Self::AeroPremium => "AERO PREMIUM",
            Self::AeroStandard => "AERO STANDARD",
            Self::AeroBase => "AERO BASE",
            Self::IntlMts => "INTL-MTS",
            Self::IiiR => "III-R",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trading status, folded from the Romanian captions where needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "TRADEABLE")]
    Tradeable,
    #[serde(rename = "SUSPENDED")]
    Suspended,
}

impl Status {
    pub(crate) fn parse(value: &str) -> Result<Option<Self>> {
        match value.trim().to_uppercase().as_str() {
            "" => Ok(None),
            "TRANZACTIONABILA" | "TRADEABLE" => Ok(Some(Self::Tradeable)),
            "SUSPENDATA" | "SUSPENDED" => Ok(Some(Self::Suspended)),
            other => Err(BvbError::Validation {
                field: "status",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tradeable => "TRADEABLE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strips embedded spaces, validates the alphanumeric shape and
/// uppercases a raw ticker symbol.
pub(crate) fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.replace(' ', "");
    if symbol.is_empty() || !SYMBOL.is_match(&symbol) {
        return Err(BvbError::Validation {
            field: "symbol",
            value: raw.to_string(),
        });
    }
    Ok(symbol.to_uppercase())
}

/// A listed share. The symbol uniquely identifies it; equality and
/// hashing consider the symbol alone.
///
/// Constructed fully-formed from a listing row; the only later
/// mutations are the explicit enrichment steps (symbol metadata,
/// issuer profile, issue info), which go through the same validating
/// setters.
#[derive(Debug, Clone, Serialize)]
pub struct Share {
    symbol: String,
    isin: Option<String>,
    #[serde(rename = "share_name")]
    name: Option<String>,
    total_shares: Option<u64>,
    face_value: Option<f64>,
    segment: Option<Segment>,
    market: Option<Market>,
    tier: Option<Tier>,
    status: Option<Status>,
    company: Option<Company>,
    start_trading_date: Option<NaiveDate>,
}

impl Share {
    pub fn new(symbol: &str) -> Result<Self> {
        Ok(Self {
            symbol: normalize_symbol(symbol)?,
            isin: None,
            name: None,
            total_shares: None,
            face_value: None,
            segment: None,
            market: None,
            tier: None,
            status: None,
            company: None,
            start_trading_date: None,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// ISO 6166 identifier: two letters, nine alphanumerics, one digit.
    pub fn set_isin(&mut self, isin: &str) -> Result<()> {
        let isin = isin.trim();
        if isin.is_empty() {
            return Ok(());
        }
        if !ISIN.is_match(isin) {
            return Err(BvbError::Validation {
                field: "ISIN",
                value: isin.to_string(),
            });
        }
        self.isin = Some(isin.to_string());
        Ok(())
    }

    pub fn isin(&self) -> Option<&str> {
        self.isin.as_deref()
    }

    /// Security name; not necessarily the issuer's name.
    pub fn set_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.name = Some(name.to_string());
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_total_shares(&mut self, total_shares: &str) -> Result<()> {
        let raw = total_shares.trim();
        if raw.is_empty() {
            return Ok(());
        }
        let parsed: i64 = raw.parse().map_err(|_| BvbError::NotNumeric {
            field: "total shares",
            value: total_shares.to_string(),
        })?;
        if parsed <= 0 {
            return Err(BvbError::Validation {
                field: "total shares",
                value: total_shares.to_string(),
            });
        }
        self.total_shares = Some(parsed as u64);
        Ok(())
    }

    pub fn total_shares(&self) -> Option<u64> {
        self.total_shares
    }

    /// Nominal value per share. The listing writes the decimal
    /// separator as a comma and `-` for "none".
    pub fn set_face_value(&mut self, face_value: &str) -> Result<()> {
        let cleaned = face_value.replace('-', "");
        let cleaned = cleaned.trim().replace(',', ".");
        if cleaned.is_empty() {
            return Ok(());
        }
        let parsed: f64 = cleaned.parse().map_err(|_| BvbError::NotNumeric {
            field: "face value",
            value: face_value.to_string(),
        })?;
        self.face_value = Some(parsed);
        Ok(())
    }

    pub fn face_value(&self) -> Option<f64> {
        self.face_value
    }

    pub fn set_segment(&mut self, segment: &str) -> Result<()> {
        if let Some(segment) = Segment::parse(segment)? {
            self.segment = Some(segment);
        }
        Ok(())
    }

    pub fn segment(&self) -> Option<Segment> {
        self.segment
    }

    pub fn set_market(&mut self, market: &str) -> Result<()> {
        if let Some(market) = Market::parse(market)? {
            self.market = Some(market);
        }
        Ok(())
    }

    pub fn market(&self) -> Option<Market> {
        self.market
    }

    pub fn set_tier(&mut self, tier: &str) -> Result<()> {
        if let Some(tier) = Tier::parse(tier)? {
            self.tier = Some(tier);
        }
        Ok(())
    }

    pub fn tier(&self) -> Option<Tier> {
        self.tier
    }

    pub fn set_status(&mut self, status: &str) -> Result<()> {
        if let Some(status) = Status::parse(status)? {
            self.status = Some(status);
        }
        Ok(())
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// The share owns its company; there is no sharing between shares.
    pub fn set_company(&mut self, company: Company) {
        self.company = Some(company);
    }

    pub fn company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    pub fn company_mut(&mut self) -> Option<&mut Company> {
        self.company.as_mut()
    }

    pub fn set_start_trading_date(&mut self, date: NaiveDate) {
        self.start_trading_date = Some(date);
    }

    pub fn start_trading_date(&self) -> Option<NaiveDate> {
        self.start_trading_date
    }
}

impl PartialEq for Share {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Share {}

impl std::hash::Hash for Share {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Share<{}>", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_strips_spaces_and_uppercases() {
        let share = Share::new(" tl v ").unwrap();
        assert_eq!(share.symbol(), "TLV");
        assert!(Share::new("").is_err());
        assert!(Share::new("TL-V").is_err());
    }

    #[test]
    fn valid_isin_round_trips() {
        let mut share = Share::new("TLV").unwrap();
        share.set_isin("ROTLVAACNOR1").unwrap();
        assert_eq!(share.isin(), Some("ROTLVAACNOR1"));
    }

    #[test]
    fn invalid_isin_is_rejected() {
        let mut share = Share::new("TLV").unwrap();
        for isin in ["ROTLVAACNORX", "R0TLVAACNOR1", "ROTLVAACNO1", "rotlvaacnor1"] {
            assert!(share.set_isin(isin).is_err(), "accepted '{}'", isin);
        }
        assert_eq!(share.isin(), None);
    }

    #[test]
    fn total_shares_coercion() {
        let mut share = Share::new("TLV").unwrap();
        share.set_total_shares("798658233").unwrap();
        assert_eq!(share.total_shares(), Some(798658233));

        assert!(matches!(
            Share::new("TLV").unwrap().set_total_shares("n/a"),
            Err(BvbError::NotNumeric { .. })
        ));
        assert!(matches!(
            Share::new("TLV").unwrap().set_total_shares("0"),
            Err(BvbError::Validation { .. })
        ));
    }

    #[test]
    fn face_value_accepts_comma_separator() {
        let mut share = Share::new("TLV").unwrap();
        share.set_face_value("1,50").unwrap();
        assert_eq!(share.face_value(), Some(1.5));
    }

    #[test]
    fn face_value_dash_means_absent() {
        let mut share = Share::new("TLV").unwrap();
        share.set_face_value("-").unwrap();
        assert_eq!(share.face_value(), None);
    }

    #[test]
    fn market_and_tier_parse_wire_codes() {
        let mut share = Share::new("TLV").unwrap();
        share.set_market("REGS").unwrap();
        share.set_tier("PREMIUM").unwrap();
        assert_eq!(share.market(), Some(Market::Regs));
        assert_eq!(share.tier(), Some(Tier::Premium));

        share.set_market("-").unwrap();
        assert_eq!(share.market(), Some(Market::Regs));

        assert!(share.set_market("NYSE").is_err());
    }

    #[test]
    fn tier_folds_romanian_captions() {
        assert_eq!(Tier::parse("AERO BAZA").unwrap(), Some(Tier::AeroBase));
        assert_eq!(Tier::parse("INTL-SMT").unwrap(), Some(Tier::IntlMts));
        assert_eq!(Tier::parse("-").unwrap(), None);
    }

    #[test]
    fn status_folds_romanian_captions() {
        assert_eq!(
            Status::parse("Tranzactionabila").unwrap(),
            Some(Status::Tradeable)
        );
        assert_eq!(Status::parse("SUSPENDATA").unwrap(), Some(Status::Suspended));
        assert_eq!(Status::parse("TRADEABLE").unwrap(), Some(Status::Tradeable));
        assert!(Status::parse("HALTED").is_err());
    }

    #[test]
    fn equality_is_by_symbol_alone() {
        let mut a = Share::new("TLV").unwrap();
        a.set_name("Banca Transilvania");
        let b = Share::new("tlv").unwrap();
        assert_eq!(a, b);
    }
}
