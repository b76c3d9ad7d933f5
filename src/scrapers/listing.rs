use crate::diag::Diagnostics;
use crate::errors::{BvbError, Result};
use crate::models::company::Company;
use crate::models::share::{self, Market, Share, Tier};
use crate::scrapers::headers::{column_index, normalize_header, validate_header};
use crate::scrapers::BvbScraper;
use log::{debug, info};
use serde::Deserialize;

const SHARES_LIST_URL: &str =
    "https://www.bvb.ro/FinancialInstruments/Markets/SharesListForDownload.ashx";
const SYMBOL_INFO_URL: &str = "https://wapi.bvb.ro/api/symbols";
const WAPI_REFERER: &str = "https://www.bvb.ro/";

/// Boundary form of a "one, several or all" parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Of(Vec<T>),
}

impl<T: PartialEq> Selection<T> {
    pub fn one(value: T) -> Self {
        Self::Of(vec![value])
    }

    fn matches(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Of(values) => values.contains(value),
        }
    }

    /// True when the selection excludes rows that carry no value at
    /// all in the filtered column.
    fn is_restrictive(&self) -> bool {
        matches!(self, Self::Of(_))
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

/// Row filter for the instrument listing. The default keeps every row.
#[derive(Debug, Clone, Default)]
pub struct ShareFilter {
    pub symbols: Selection<String>,
    pub markets: Selection<Market>,
    pub tiers: Selection<Tier>,
}

impl ShareFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter by ticker symbols. Each symbol is validated and
    /// uppercased; duplicates are dropped, order is kept.
    pub fn for_symbols(symbols: &[&str]) -> Result<Self> {
        let mut normalized = Vec::new();
        for raw in symbols {
            let symbol = share::normalize_symbol(raw)?;
            if !normalized.contains(&symbol) {
                normalized.push(symbol);
            }
        }
        Ok(Self {
            symbols: Selection::Of(normalized),
            ..Self::default()
        })
    }

    pub fn for_markets(markets: &[Market]) -> Self {
        let mut values = Vec::new();
        for market in markets {
            if !values.contains(market) {
                values.push(*market);
            }
        }
        Self {
            markets: Selection::Of(values),
            ..Self::default()
        }
    }

    pub fn for_tiers(tiers: &[Tier]) -> Self {
        let mut values = Vec::new();
        for tier in tiers {
            if !values.contains(tier) {
                values.push(*tier);
            }
        }
        Self {
            tiers: Selection::Of(values),
            ..Self::default()
        }
    }
}

// Column positions resolved once per download from the normalized
// header, so rows are read by index instead of repeated name lookups.
struct CompanyColumns {
    name: usize,
    fiscal_code: usize,
    caen_code: usize,
    district: usize,
    country: usize,
}

impl CompanyColumns {
    fn resolve(headers: &[String]) -> Result<Self> {
        Ok(Self {
            name: column_index(headers, "Issuer")?,
            fiscal_code: column_index(headers, "Fiscal / Unique Code")?,
            caen_code: column_index(headers, "CAEN Code")?,
            district: column_index(headers, "District")?,
            country: column_index(headers, "Country")?,
        })
    }
}

struct ShareColumns {
    symbol: usize,
    isin: usize,
    name: usize,
    total_shares: usize,
    face_value: usize,
    segment: usize,
    market: usize,
    tier: usize,
    status: usize,
}

impl ShareColumns {
    fn resolve(headers: &[String]) -> Result<Self> {
        Ok(Self {
            symbol: column_index(headers, "Symbol")?,
            isin: column_index(headers, "ISIN")?,
            name: column_index(headers, "Security name")?,
            total_shares: column_index(headers, "Shares")?,
            face_value: column_index(headers, "Face value")?,
            segment: column_index(headers, "Exchange segment")?,
            market: column_index(headers, "Main Market")?,
            tier: column_index(headers, "Tier")?,
            status: column_index(headers, "Status")?,
        })
    }
}

fn field<'a>(row: &[&'a str], index: usize) -> Result<&'a str> {
    row.get(index)
        .copied()
        .ok_or_else(|| BvbError::Schema(format!("row has no column at index {}", index)))
}

fn build_share(
    row: &[&str],
    company_cols: &CompanyColumns,
    share_cols: &ShareColumns,
    filter: &ShareFilter,
) -> Result<Option<Share>> {
    let symbol_raw = field(row, share_cols.symbol)?;
    if !filter.symbols.matches(&symbol_raw.trim().to_uppercase()) {
        return Ok(None);
    }

    let market = Market::parse(field(row, share_cols.market)?)?;
    match market {
        Some(market) if !filter.markets.matches(&market) => return Ok(None),
        None if filter.markets.is_restrictive() => return Ok(None),
        _ => {}
    }

    let tier = Tier::parse(field(row, share_cols.tier)?)?;
    match tier {
        Some(tier) if !filter.tiers.matches(&tier) => return Ok(None),
        None if filter.tiers.is_restrictive() => return Ok(None),
        _ => {}
    }

    let mut company = Company::new(
        field(row, company_cols.name)?,
        field(row, company_cols.fiscal_code)?,
    )?;
    company.set_caen_code(field(row, company_cols.caen_code)?)?;
    company.set_district(field(row, company_cols.district)?);
    company.set_country_iso2(field(row, company_cols.country)?)?;

    let mut share = Share::new(symbol_raw)?;
    share.set_isin(field(row, share_cols.isin)?)?;
    share.set_name(field(row, share_cols.name)?);
    share.set_total_shares(field(row, share_cols.total_shares)?)?;
    share.set_face_value(field(row, share_cols.face_value)?)?;
    share.set_segment(field(row, share_cols.segment)?)?;
    share.set_market(field(row, share_cols.market)?)?;
    share.set_tier(field(row, share_cols.tier)?)?;
    share.set_status(field(row, share_cols.status)?)?;
    share.set_company(company);

    Ok(Some(share))
}

/// Parses the downloaded listing body into shares, in file order.
///
/// A malformed row aborts the whole parse; the error carries the row's
/// leading field so the offending instrument can be identified.
pub(crate) fn parse_share_list(
    body: &str,
    filter: &ShareFilter,
    diag: &mut Diagnostics,
) -> Result<Vec<Share>> {
    let mut lines: Vec<&str> = body.split("\r\n").collect();
    // the file ends with CRLF, which yields one empty trailing element
    if lines.last() == Some(&"") {
        lines.pop();
    }
    if lines.is_empty() {
        return Err(BvbError::Schema("listing response is empty".to_string()));
    }

    let headers = normalize_header(lines[0], diag);
    validate_header(&headers)?;

    let company_cols = CompanyColumns::resolve(&headers)?;
    let share_cols = ShareColumns::resolve(&headers)?;

    let mut shares = Vec::new();
    for line in &lines[1..] {
        let row: Vec<&str> = line.split(';').collect();
        match build_share(&row, &company_cols, &share_cols, filter) {
            Ok(Some(share)) => shares.push(share),
            Ok(None) => {}
            Err(e) => {
                return Err(BvbError::Row {
                    leading: row.first().copied().unwrap_or_default().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    Ok(shares)
}

#[derive(Debug, Deserialize)]
struct SymbolMeta {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

impl BvbScraper {
    /// Downloads the full instrument listing and returns one `Share`
    /// per row retained by `filter`, in file order. Each retained
    /// share's company is enriched with sector/industry/timezone from
    /// the symbols endpoint — one extra round-trip per share, issued
    /// sequentially.
    pub async fn get_shares(
        &self,
        filter: &ShareFilter,
        diag: &mut Diagnostics,
    ) -> Result<Vec<Share>> {
        info!("downloading instrument listing");
        let body = self.http.get_text(SHARES_LIST_URL, None).await?;

        let mut shares = parse_share_list(&body, filter, diag)?;
        for share in shares.iter_mut() {
            self.enrich_symbol_info(share).await?;
        }

        info!("retrieved {} shares", shares.len());
        Ok(shares)
    }

    /// Resolves a single symbol through the listing. The symbol must
    /// be present there.
    pub async fn get_share(&self, symbol: &str, diag: &mut Diagnostics) -> Result<Share> {
        let filter = ShareFilter::for_symbols(&[symbol])?;
        let shares = self.get_shares(&filter, diag).await?;
        shares.into_iter().next().ok_or_else(|| {
            BvbError::Schema(format!("symbol '{}' not present in the listing", symbol))
        })
    }

    async fn enrich_symbol_info(&self, share: &mut Share) -> Result<()> {
        debug!("fetching symbol metadata for {}", share.symbol());
        let text = self
            .http
            .get_text_with_query(
                SYMBOL_INFO_URL,
                &[("symbol", share.symbol())],
                Some(WAPI_REFERER),
            )
            .await?;
        let meta: SymbolMeta = serde_json::from_str(&text)?;

        if let Some(company) = share.company_mut() {
            if let Some(sector) = &meta.sector {
                company.set_sector(sector);
            }
            if let Some(industry) = &meta.industry {
                company.set_industry(industry);
            }
            if let Some(timezone) = &meta.timezone {
                company.set_timezone(timezone)?;
            }
        }

        Ok(())
    }
}
