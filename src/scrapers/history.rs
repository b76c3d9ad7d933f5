use crate::diag::Diagnostics;
use crate::errors::{BvbError, Result};
use crate::models::history::PriceHistory;
use crate::models::share::Share;
use crate::scrapers::BvbScraper;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::debug;
use std::fmt;

const HISTORY_URL: &str = "https://wapi.bvb.ro/api/history";
const HISTORY_REFERER: &str = "https://bvb.ro/";

/// Named lookback period for a history download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_uppercase().as_str() {
            "1D" => Ok(Self::OneDay),
            "5D" => Ok(Self::FiveDays),
            "1M" => Ok(Self::OneMonth),
            "3M" => Ok(Self::ThreeMonths),
            "6M" => Ok(Self::SixMonths),
            "1Y" => Ok(Self::OneYear),
            "2Y" => Ok(Self::TwoYears),
            "5Y" => Ok(Self::FiveYears),
            "10Y" => Ok(Self::TenYears),
            "YTD" => Ok(Self::YearToDate),
            "MAX" => Ok(Self::Max),
            other => Err(BvbError::Validation {
                field: "period",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::FiveDays => "5D",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
            Self::FiveYears => "5Y",
            Self::TenYears => "10Y",
            Self::YearToDate => "YTD",
            Self::Max => "MAX",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bar frequency; maps to the endpoint's `dt`/`p` parameter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_uppercase().as_str() {
            "1MIN" => Ok(Self::OneMinute),
            "5MIN" => Ok(Self::FiveMinutes),
            "15MIN" => Ok(Self::FifteenMinutes),
            "30MIN" => Ok(Self::ThirtyMinutes),
            "1H" => Ok(Self::OneHour),
            "1D" => Ok(Self::Daily),
            "1W" => Ok(Self::Weekly),
            "1M" => Ok(Self::Monthly),
            other => Err(BvbError::Validation {
                field: "interval",
                value: other.to_string(),
            }),
        }
    }

    /// (`dt` granularity class, `p` period code) as the endpoint
    /// expects them.
    fn wire(&self) -> (&'static str, &'static str) {
        match self {
            Self::OneMinute => ("INTRA", "intraday_1"),
            Self::FiveMinutes => ("INTRA", "intraday_5"),
            Self::FifteenMinutes => ("INTRA", "intraday_15"),
            Self::ThirtyMinutes => ("INTRA", "intraday_30"),
            Self::OneHour => ("INTRA", "intraday_60"),
            Self::Daily => ("DAILY", "day"),
            Self::Weekly => ("DAILY", "week"),
            Self::Monthly => ("MONTH", "month"),
        }
    }
}

/// Time range inputs for a history download.
///
/// A named period always wins over explicit bounds. With neither given
/// the query means `MAX`; a lone start bound runs until now, a lone
/// end bound starts at the 1970-01-01 epoch.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub period: Option<Period>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub interval: Interval,
    pub adjusted: bool,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            period: None,
            start_date: None,
            end_date: None,
            interval: Interval::Daily,
            adjusted: true,
        }
    }
}

impl HistoryQuery {
    pub fn for_period(period: Period) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }

    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn unadjusted(mut self) -> Self {
        self.adjusted = false;
        self
    }
}

fn epoch(tz: &Tz) -> DateTime<Tz> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(tz)
}

fn midnight(date: NaiveDate, tz: &Tz) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .ok_or_else(|| BvbError::Schema(format!("date {} does not exist in {}", date, tz)))
}

/// Resolves a query into concrete bounds against the given "now".
fn resolve_range(query: &HistoryQuery, now: DateTime<Tz>) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
    let tz = now.timezone();

    let period = match query.period {
        Some(period) => Some(period),
        // neither period nor bounds means the full history
        None if query.start_date.is_none() && query.end_date.is_none() => Some(Period::Max),
        None => None,
    };

    if let Some(period) = period {
        let start = match period {
            Period::OneDay => now - Duration::days(1),
            Period::FiveDays => now - Duration::days(5),
            Period::OneMonth => sub_months(now, 1)?,
            Period::ThreeMonths => sub_months(now, 3)?,
            Period::SixMonths => sub_months(now, 6)?,
            Period::OneYear => sub_months(now, 12)?,
            Period::TwoYears => sub_months(now, 24)?,
            Period::FiveYears => sub_months(now, 60)?,
            Period::TenYears => sub_months(now, 120)?,
            Period::YearToDate => midnight(
                NaiveDate::from_ymd_opt(now.year(), 1, 1).ok_or_else(|| {
                    BvbError::Schema(format!("no January 1 in year {}", now.year()))
                })?,
                &tz,
            )?,
            Period::Max => epoch(&tz),
        };
        return Ok((start, now));
    }

    let start = match query.start_date {
        Some(date) => midnight(date, &tz)?,
        None => epoch(&tz),
    };
    let end = match query.end_date {
        Some(date) => midnight(date, &tz)?,
        None => now,
    };

    if start < epoch(&tz) {
        return Err(BvbError::Validation {
            field: "start date",
            value: start.to_string(),
        });
    }

    Ok((start, end))
}

fn sub_months(now: DateTime<Tz>, months: u32) -> Result<DateTime<Tz>> {
    now.checked_sub_months(Months::new(months))
        .ok_or_else(|| BvbError::Schema(format!("cannot go back {} months from {}", months, now)))
}

/// Picks the timezone the query bounds are interpreted in: the share's
/// recorded one when present, UTC otherwise (with a warning).
fn share_timezone(share: &Share, diag: &mut Diagnostics) -> Tz {
    match share.company().and_then(|company| company.timezone()) {
        Some(name) => match Tz::from_str_insensitive(name) {
            Ok(tz) => tz,
            Err(_) => {
                diag.warn(format!(
                    "unrecognized timezone '{}' recorded for {}, falling back to UTC",
                    name,
                    share.symbol()
                ));
                Tz::UTC
            }
        },
        None => {
            diag.warn(format!(
                "share {} has no recorded timezone, falling back to UTC",
                share.symbol()
            ));
            Tz::UTC
        }
    }
}

/// Applies the status policy: `ok` passes through, `no_data` becomes
/// an empty-but-valid series with one warning, anything else is fatal
/// and carries the raw body.
fn normalize_history(
    raw: PriceHistory,
    symbol: &str,
    body: &str,
    diag: &mut Diagnostics,
) -> Result<PriceHistory> {
    match raw.s.as_str() {
        "ok" => Ok(raw),
        "no_data" => {
            diag.warn(format!(
                "no history data for {} in the requested range",
                symbol
            ));
            Ok(PriceHistory::empty_ok())
        }
        other => Err(BvbError::History {
            status: other.to_string(),
            raw: body.to_string(),
        }),
    }
}

impl BvbScraper {
    /// Downloads the price series for a share. Bounds are interpreted
    /// in the share's recorded timezone (UTC fallback) and submitted
    /// as epoch seconds.
    pub async fn get_history(
        &self,
        share: &Share,
        query: &HistoryQuery,
        diag: &mut Diagnostics,
    ) -> Result<PriceHistory> {
        let tz = share_timezone(share, diag);
        let now = Utc::now().with_timezone(&tz);
        let (start, end) = resolve_range(query, now)?;

        let (dt, p) = query.interval.wire();
        let ajust = if query.adjusted { "1" } else { "0" };
        let from = start.timestamp().to_string();
        let to = end.timestamp().to_string();

        debug!(
            "fetching history for {}: dt={} p={} ajust={} from={} to={}",
            share.symbol(),
            dt,
            p,
            ajust,
            from,
            to
        );

        let body = self
            .http
            .get_text_with_query(
                HISTORY_URL,
                &[
                    ("symbol", share.symbol()),
                    ("dt", dt),
                    ("p", p),
                    ("ajust", ajust),
                    ("from", &from),
                    ("to", &to),
                ],
                Some(HISTORY_REFERER),
            )
            .await?;

        let raw: PriceHistory = serde_json::from_str(&body)?;
        normalize_history(raw, share.symbol(), &body, diag)
    }

    /// Resolves a symbol through the listing first, then downloads its
    /// history.
    pub async fn get_history_for_symbol(
        &self,
        symbol: &str,
        query: &HistoryQuery,
        diag: &mut Diagnostics,
    ) -> Result<PriceHistory> {
        let share = self.get_share(symbol, diag).await?;
        self.get_history(&share, query, diag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Tz> {
        // 2024-06-15 12:00 UTC
        Tz::UTC
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn ytd_starts_on_january_first() {
        let query = HistoryQuery::for_period(Period::YearToDate);
        let (start, end) = resolve_range(&query, fixed_now()).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn max_starts_at_the_epoch() {
        let query = HistoryQuery::for_period(Period::Max);
        let (start, end) = resolve_range(&query, fixed_now()).unwrap();
        assert_eq!(start.timestamp(), 0);
        assert_eq!(end, fixed_now());
    }

    #[test]
    fn no_period_and_no_bounds_means_max() {
        let (start, _) = resolve_range(&HistoryQuery::default(), fixed_now()).unwrap();
        assert_eq!(start.timestamp(), 0);
    }

    #[test]
    fn calendar_periods_subtract_from_now() {
        let (start, _) = resolve_range(
            &HistoryQuery::for_period(Period::ThreeMonths),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let (start, _) =
            resolve_range(&HistoryQuery::for_period(Period::FiveDays), fixed_now()).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());

        let (start, _) =
            resolve_range(&HistoryQuery::for_period(Period::TenYears), fixed_now()).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2014, 6, 15).unwrap());
    }

    #[test]
    fn named_period_wins_over_explicit_bounds() {
        let mut query = HistoryQuery::between(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        );
        query.period = Some(Period::YearToDate);
        let (start, _) = resolve_range(&query, fixed_now()).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn lone_bounds_default_to_epoch_and_now() {
        let query = HistoryQuery {
            start_date: Some(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()),
            ..HistoryQuery::default()
        };
        let (start, end) = resolve_range(&query, fixed_now()).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
        assert_eq!(end, fixed_now());

        let query = HistoryQuery {
            end_date: Some(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()),
            ..HistoryQuery::default()
        };
        let (start, end) = resolve_range(&query, fixed_now()).unwrap();
        assert_eq!(start.timestamp(), 0);
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
    }

    #[test]
    fn period_tokens_parse_case_insensitively() {
        assert_eq!(Period::parse("ytd").unwrap(), Period::YearToDate);
        assert_eq!(Period::parse("10y").unwrap(), Period::TenYears);
        assert!(Period::parse("2W").is_err());
    }

    #[test]
    fn interval_wire_codes() {
        assert_eq!(Interval::Daily.wire(), ("DAILY", "day"));
        assert_eq!(Interval::OneHour.wire(), ("INTRA", "intraday_60"));
        assert_eq!(Interval::Monthly.wire(), ("MONTH", "month"));
        assert_eq!(Interval::parse("1w").unwrap(), Interval::Weekly);
    }

    #[test]
    fn no_data_becomes_an_empty_ok_series_with_one_warning() {
        let raw: PriceHistory = serde_json::from_str(r#"{"s":"no_data"}"#).unwrap();
        let mut diag = Diagnostics::new();
        let history = normalize_history(raw, "TLV", r#"{"s":"no_data"}"#, &mut diag).unwrap();

        assert_eq!(history.s, "ok");
        assert!(history.t.is_empty());
        assert!(history.o.is_empty());
        assert!(history.h.is_empty());
        assert!(history.l.is_empty());
        assert!(history.c.is_empty());
        assert!(history.v.is_empty());
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn unknown_status_is_fatal_and_carries_the_body() {
        let body = r#"{"s":"error"}"#;
        let raw: PriceHistory = serde_json::from_str(body).unwrap();
        let mut diag = Diagnostics::new();
        let err = normalize_history(raw, "TLV", body, &mut diag).unwrap_err();
        match err {
            BvbError::History { status, raw } => {
                assert_eq!(status, "error");
                assert_eq!(raw, body);
            }
            other => panic!("expected History error, got {:?}", other),
        }
    }

    #[test]
    fn ok_series_passes_through() {
        let body = r#"{"s":"ok","t":[1700000000],"o":[24.1],"h":[24.5],"l":[23.9],"c":[24.3],"v":[125000]}"#;
        let raw: PriceHistory = serde_json::from_str(body).unwrap();
        let mut diag = Diagnostics::new();
        let history = normalize_history(raw, "TLV", body, &mut diag).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.c, vec![24.3]);
        assert!(diag.is_empty());
    }

    #[test]
    fn fallback_timezone_warns_once() {
        let share = Share::new("TLV").unwrap();
        let mut diag = Diagnostics::new();
        let tz = share_timezone(&share, &mut diag);
        assert_eq!(tz, Tz::UTC);
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn uppercased_timezone_still_resolves() {
        let mut share = Share::new("TLV").unwrap();
        let mut company = crate::models::company::Company::new("BANCA", "123").unwrap();
        company.set_timezone("Europe/Bucharest").unwrap();
        share.set_company(company);

        let mut diag = Diagnostics::new();
        let tz = share_timezone(&share, &mut diag);
        assert_eq!(tz, chrono_tz::Europe::Bucharest);
        assert!(diag.is_empty());
    }
}
