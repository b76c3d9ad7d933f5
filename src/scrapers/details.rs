use crate::diag::Diagnostics;
use crate::errors::{BvbError, Result};
use crate::models::company::{Company, ShareholderRow};
use crate::models::share::{self, Share};
use crate::scrapers::BvbScraper;
use chrono::NaiveDate;
use log::debug;
use scraper::{ElementRef, Html, Selector};

const DETAILS_URL: &str =
    "https://www.bvb.ro/FinancialInstruments/Details/FinancialInstrumentsDetails.aspx?s=";

// ASP.NET postback plumbing: the page re-submits these two checkbox
// flags along with every hidden __-prefixed field.
const CHECKBOX_FLAGS: [&str; 2] = [
    "ctl00$body$ctl02$NewsBySymbolControl$chOutVolatility",
    "ctl00$body$ctl02$NewsBySymbolControl$chOutInsiders",
];
const SCRIPT_MANAGER_FIELD: &str = "ctl00$MasterScriptManager";
const SCRIPT_MANAGER_TARGET: &str = "ctl00$body$updIfttc";

const PROFILE_TABLE_SELECTOR: &str = "table#ctl00_body_ctl02_CompanyProfile_dvIssProfile";
const DESCRIPTION_SELECTOR: &str = "div#ctl00_body_ctl02_CompanyProfile_CDescription";
const SHAREHOLDERS_TABLE_SELECTOR: &str = "table#gvDetails";
const ISSUE_INFO_TABLE_SELECTOR: &str = "table#dvInfo";

/// Tabs of the instrument details page. `Overview` is the landing tab
/// and needs no postback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsTab {
    Overview,
    Trading,
    Charts,
    News,
    Financials,
    IssuerProfile,
}

impl DetailsTab {
    /// Button captions as the site renders them, uppercased; English
    /// or Romanian depending on session state.
    fn captions(&self) -> &'static [&'static str] {
        match self {
            Self::Overview => &["OVERVIEW", "SUMAR"],
            Self::Trading => &["TRADING", "TRANZACTIONARE"],
            Self::Charts => &["CHARTS", "GRAFICE"],
            Self::News => &["NEWS", "STIRI"],
            Self::Financials => &["FINANCIALS", "INFORMATII FINANCIARE"],
            Self::IssuerProfile => &["ISSUER PROFILE", "EMITENT"],
        }
    }
}

/// Fields scraped from the "Issuer profile" tab.
#[derive(Debug, Clone, Default)]
pub struct IssuerProfile {
    pub commerce_registry_code: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub activity_field: Option<String>,
    pub description: Option<String>,
    pub shareholders: Option<Vec<ShareholderRow>>,
}

#[derive(Clone, Copy)]
enum ProfileField {
    CommerceRegistryCode,
    Address,
    Website,
    Email,
    ActivityField,
}

// Label cells as served in either site language.
const PROFILE_LABELS: [(&str, ProfileField); 8] = [
    ("Cod Registrul Comertului", ProfileField::CommerceRegistryCode),
    ("Commerce Registry Code", ProfileField::CommerceRegistryCode),
    ("Adresa", ProfileField::Address),
    ("Address", ProfileField::Address),
    ("Website", ProfileField::Website),
    ("E-mail", ProfileField::Email),
    ("Domeniu de activitate", ProfileField::ActivityField),
    ("Field of activity", ProfileField::ActivityField),
];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| BvbError::Schema(format!("invalid selector '{}': {:?}", css, e)))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>()
}

/// Composes the field set of the ASP.NET postback that switches the
/// details page to `tab`: every hidden `__`-prefixed input of the
/// `aspnetForm` form (or the first form present), the two checkbox
/// flags, and the submit button whose caption matches the tab.
fn build_postback_fields(html: &str, tab: DetailsTab) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);

    let form_sel = selector("form#aspnetForm")?;
    let any_form_sel = selector("form")?;
    let form = document
        .select(&form_sel)
        .next()
        .or_else(|| document.select(&any_form_sel).next())
        .ok_or_else(|| {
            BvbError::Schema("no form element in the instrument details page".to_string())
        })?;

    let mut fields: Vec<(String, String)> = CHECKBOX_FLAGS
        .iter()
        .map(|flag| (flag.to_string(), "on".to_string()))
        .collect();

    let hidden_sel = selector(r#"input[type="hidden"]"#)?;
    for input in form.select(&hidden_sel) {
        if let Some(name) = input.value().attr("name") {
            if name.starts_with("__") {
                let value = input.value().attr("value").unwrap_or("");
                fields.push((name.to_string(), value.to_string()));
            }
        }
    }

    let submit_sel = selector(r#"input[type="submit"]"#)?;
    for button in form.select(&submit_sel) {
        let caption = button.value().attr("value").unwrap_or("");
        let caption_upper = caption.to_uppercase();
        if tab.captions().contains(&caption_upper.as_str()) {
            let handler = button.value().attr("name").ok_or_else(|| {
                BvbError::Schema("the target tab button has no name attribute".to_string())
            })?;
            fields.push((
                SCRIPT_MANAGER_FIELD.to_string(),
                format!("{}|{}", SCRIPT_MANAGER_TARGET, handler),
            ));
            fields.push((handler.to_string(), caption.to_string()));
            return Ok(fields);
        }
    }

    Err(BvbError::Schema(format!(
        "no submit button found for tab {:?}",
        tab
    )))
}

/// Extracts the issuer profile fields, the optional description block
/// and the optional shareholder table from the "Issuer profile" tab
/// HTML. Unrecognized profile labels are ignored.
fn parse_issuer_profile(html: &str) -> Result<IssuerProfile> {
    let document = Html::parse_document(html);
    let mut profile = IssuerProfile::default();

    let table_sel = selector(PROFILE_TABLE_SELECTOR)?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;

    let table = document.select(&table_sel).next().ok_or_else(|| {
        BvbError::Schema("issuer profile table not found in the page".to_string())
    })?;

    for tr in table.select(&tr_sel) {
        let cells: Vec<ElementRef> = tr.select(&td_sel).collect();
        if cells.len() != 2 {
            return Err(BvbError::Schema(
                "an issuer profile row does not have exactly two cells".to_string(),
            ));
        }

        let label = cell_text(&cells[0]);
        let field = PROFILE_LABELS
            .iter()
            .find(|(caption, _)| *caption == label.trim())
            .map(|(_, field)| *field);

        match field {
            Some(ProfileField::Website) => {
                let href = cells[1]
                    .select(&a_sel)
                    .next()
                    .and_then(|anchor| anchor.value().attr("href"))
                    .ok_or_else(|| {
                        BvbError::Schema("the website profile cell has no link".to_string())
                    })?;
                profile.website = Some(href.to_string());
            }
            Some(field) => {
                let value = cell_text(&cells[1]).replace("\r\n", "").trim().to_string();
                match field {
                    ProfileField::CommerceRegistryCode => {
                        profile.commerce_registry_code = Some(value)
                    }
                    ProfileField::Address => profile.address = Some(value),
                    ProfileField::Email => profile.email = Some(value),
                    ProfileField::ActivityField => profile.activity_field = Some(value),
                    ProfileField::Website => {}
                }
            }
            None => {}
        }
    }

    let description_sel = selector(DESCRIPTION_SELECTOR)?;
    if let Some(description_div) = document.select(&description_sel).next() {
        let span_sel = selector(r#"span[lang="EN-US"]"#)?;
        let text: String = description_div
            .select(&span_sel)
            .map(|span| cell_text(&span))
            .collect();
        if !text.is_empty() {
            profile.description = Some(text);
        }
    }

    let shareholders_sel = selector(SHAREHOLDERS_TABLE_SELECTOR)?;
    if let Some(table) = document.select(&shareholders_sel).next() {
        let th_sel = selector("th")?;
        let rows: Vec<ElementRef> = table.select(&tr_sel).collect();
        if rows.len() > 2 {
            let headers: Vec<String> = rows[0]
                .select(&th_sel)
                .map(|th| cell_text(&th).trim().to_string())
                .collect();
            let mut shareholders = Vec::new();
            // the last row is the table's own total line
            for row in &rows[1..rows.len() - 1] {
                let cells: Vec<String> = row
                    .select(&td_sel)
                    .map(|td| cell_text(&td).trim().to_string())
                    .collect();
                let entry: ShareholderRow = headers
                    .iter()
                    .cloned()
                    .zip(cells.into_iter())
                    .collect();
                shareholders.push(entry);
            }
            profile.shareholders = Some(shareholders);
        }
    }

    Ok(profile)
}

/// Applies profile fields onto a company through the validating
/// setters.
pub fn apply_issuer_profile(company: &mut Company, profile: &IssuerProfile) -> Result<()> {
    if let Some(code) = &profile.commerce_registry_code {
        company.set_commerce_registry_code(code)?;
    }
    if let Some(address) = &profile.address {
        company.set_address(address);
    }
    if let Some(website) = &profile.website {
        company.set_website(website);
    }
    if let Some(email) = &profile.email {
        company.set_email(email)?;
    }
    if let Some(activity_field) = &profile.activity_field {
        company.set_activity_field(activity_field);
    }
    if let Some(description) = &profile.description {
        company.set_description(description);
    }
    if let Some(shareholders) = &profile.shareholders {
        company.set_shareholders(shareholders.clone());
    }
    Ok(())
}

fn parse_trading_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    for format in ["%d.%m.%Y", "%m/%d/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(BvbError::Schema(format!(
        "unparseable trading date '{}'",
        raw
    )))
}

/// Reads the start-trading date from the Overview tab's "Issue info"
/// table, when present.
fn parse_issue_info(html: &str) -> Result<Option<NaiveDate>> {
    let document = Html::parse_document(html);

    let table_sel = selector(ISSUE_INFO_TABLE_SELECTOR)?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| BvbError::Schema("issue info table not found in the page".to_string()))?;

    for tr in table.select(&tr_sel) {
        let cells: Vec<ElementRef> = tr.select(&td_sel).collect();
        if cells.len() < 2 {
            continue;
        }
        if cell_text(&cells[0]).trim() == "Start trading date" {
            return parse_trading_date(&cell_text(&cells[1])).map(Some);
        }
    }

    Ok(None)
}

impl BvbScraper {
    /// Returns the HTML of one tab of the instrument details page,
    /// imitating the client-side form postback for non-landing tabs:
    /// load the page, re-submit its hidden state fields plus the
    /// target button, with the page URL as referer.
    pub async fn get_instrument_tab(&self, symbol: &str, tab: DetailsTab) -> Result<String> {
        let symbol = share::normalize_symbol(symbol)?;
        let url = format!("{}{}", DETAILS_URL, symbol);

        debug!("loading instrument details page for {}", symbol);
        let landing = self.http.get_text(&url, None).await?;
        if tab == DetailsTab::Overview {
            return Ok(landing);
        }

        let fields = build_postback_fields(&landing, tab)?;
        debug!("posting back for tab {:?} of {}", tab, symbol);
        self.http.post_form(&url, &fields, Some(&url)).await
    }

    /// Scrapes the "Issuer profile" tab of a symbol.
    pub async fn get_issuer_profile(&self, symbol: &str) -> Result<IssuerProfile> {
        let html = self
            .get_instrument_tab(symbol, DetailsTab::IssuerProfile)
            .await?;
        parse_issuer_profile(&html)
    }

    /// Resolves a symbol through the listing, then fills in the issuer
    /// profile and the start-trading date from the details page.
    pub async fn get_share_details(
        &self,
        symbol: &str,
        diag: &mut Diagnostics,
    ) -> Result<Share> {
        let mut share = self.get_share(symbol, diag).await?;

        let profile = self.get_issuer_profile(share.symbol()).await?;
        if let Some(company) = share.company_mut() {
            apply_issuer_profile(company, &profile)?;
        }

        let overview = self
            .get_instrument_tab(share.symbol(), DetailsTab::Overview)
            .await?;
        if let Some(date) = parse_issue_info(&overview)? {
            share.set_start_trading_date(date);
        }

        Ok(share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_HTML: &str = r#"
        <html><body>
        <form id="aspnetForm" action="x">
            <input type="hidden" name="__VIEWSTATE" value="vs123" />
            <input type="hidden" name="__EVENTVALIDATION" value="ev456" />
            <input type="hidden" name="__LASTFOCUS" value="" />
            <input type="hidden" name="session" value="ignored" />
            <input type="submit" name="ctl00$body$btnOverview" value="Overview" />
            <input type="submit" name="ctl00$body$btnProfile" value="Issuer profile" />
        </form>
        </body></html>"#;

    const PROFILE_HTML: &str = r#"
        <html><body>
        <table id="ctl00_body_ctl02_CompanyProfile_dvIssProfile">
            <tr><td>Commerce Registry Code</td><td>J40/8302/1997</td></tr>
            <tr><td>Address</td><td>Str. Exemplu 1, Bucuresti</td></tr>
            <tr><td>Website</td><td><a href="https://www.example.ro">www.example.ro</a></td></tr>
            <tr><td>E-mail</td><td>office@example.ro</td></tr>
            <tr><td>Field of activity</td><td>Banking</td></tr>
            <tr><td>Phone</td><td>+40 21 000 0000</td></tr>
        </table>
        <div id="ctl00_body_ctl02_CompanyProfile_CDescription">
            <span lang="EN-US">A bank. </span><span lang="EN-US">Founded 1990.</span>
        </div>
        <table id="gvDetails">
            <tr><th>Shareholder</th><th>Percent</th></tr>
            <tr><td>NN GROUP</td><td>10,05</td></tr>
            <tr><td>OTHER</td><td>89,95</td></tr>
            <tr><td>Total</td><td>100</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn postback_collects_hidden_fields_and_target_button() {
        let fields = build_postback_fields(FORM_HTML, DetailsTab::IssuerProfile).unwrap();

        let get = |name: &str| {
            fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.as_str())
        };

        assert_eq!(get("__VIEWSTATE"), Some("vs123"));
        assert_eq!(get("__EVENTVALIDATION"), Some("ev456"));
        assert_eq!(get("__LASTFOCUS"), Some(""));
        assert_eq!(get("session"), None);
        assert_eq!(get(CHECKBOX_FLAGS[0]), Some("on"));
        assert_eq!(get(CHECKBOX_FLAGS[1]), Some("on"));
        assert_eq!(
            get(SCRIPT_MANAGER_FIELD),
            Some("ctl00$body$updIfttc|ctl00$body$btnProfile")
        );
        assert_eq!(get("ctl00$body$btnProfile"), Some("Issuer profile"));
    }

    #[test]
    fn postback_requires_a_form() {
        let err = build_postback_fields("<html><body></body></html>", DetailsTab::News)
            .unwrap_err();
        assert!(matches!(err, BvbError::Schema(_)));
    }

    #[test]
    fn postback_requires_the_target_button() {
        let err = build_postback_fields(FORM_HTML, DetailsTab::Financials).unwrap_err();
        assert!(matches!(err, BvbError::Schema(_)));
    }

    #[test]
    fn postback_rejects_an_unnamed_button() {
        let html = r#"<form id="aspnetForm">
            <input type="submit" value="Issuer profile" />
        </form>"#;
        let err = build_postback_fields(html, DetailsTab::IssuerProfile).unwrap_err();
        assert!(matches!(err, BvbError::Schema(_)));
    }

    #[test]
    fn profile_fields_are_extracted() {
        let profile = parse_issuer_profile(PROFILE_HTML).unwrap();
        assert_eq!(
            profile.commerce_registry_code.as_deref(),
            Some("J40/8302/1997")
        );
        assert_eq!(profile.address.as_deref(), Some("Str. Exemplu 1, Bucuresti"));
        assert_eq!(profile.website.as_deref(), Some("https://www.example.ro"));
        assert_eq!(profile.email.as_deref(), Some("office@example.ro"));
        assert_eq!(profile.activity_field.as_deref(), Some("Banking"));
        assert_eq!(profile.description.as_deref(), Some("A bank. Founded 1990."));

        let shareholders = profile.shareholders.unwrap();
        assert_eq!(shareholders.len(), 2);
        assert_eq!(
            shareholders[0],
            vec![
                ("Shareholder".to_string(), "NN GROUP".to_string()),
                ("Percent".to_string(), "10,05".to_string()),
            ]
        );
    }

    #[test]
    fn profile_row_with_wrong_cell_count_fails_loudly() {
        let html = r#"
            <table id="ctl00_body_ctl02_CompanyProfile_dvIssProfile">
                <tr><td>Address</td></tr>
            </table>"#;
        let err = parse_issuer_profile(html).unwrap_err();
        assert!(matches!(err, BvbError::Schema(_)));
    }

    #[test]
    fn profile_applies_onto_the_company() {
        let profile = parse_issuer_profile(PROFILE_HTML).unwrap();
        let mut company = Company::new("EXAMPLE BANK", "123456").unwrap();
        apply_issuer_profile(&mut company, &profile).unwrap();

        assert_eq!(company.commerce_registry_code(), Some("J40/8302/1997"));
        assert_eq!(company.address(), Some("Str. Exemplu 1, Bucuresti"));
        assert_eq!(company.website(), Some("https://www.example.ro"));
        assert_eq!(company.email(), Some("office@example.ro"));
        assert_eq!(company.activity_field(), Some("BANKING"));
        assert_eq!(company.description(), Some("A bank. Founded 1990."));
        assert_eq!(company.shareholders().map(|rows| rows.len()), Some(2));
    }

    #[test]
    fn issue_info_yields_the_start_trading_date() {
        let html = r#"
            <h2>Issue info</h2>
            <table id="dvInfo">
                <tr><td>Share Capital</td><td>100</td></tr>
                <tr><td>Start trading date</td><td>14.09.2010</td></tr>
            </table>"#;
        let date = parse_issue_info(html).unwrap().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2010, 9, 14).unwrap());
    }

    #[test]
    fn issue_info_without_the_row_is_none() {
        let html = r#"<table id="dvInfo"><tr><td>Share Capital</td><td>100</td></tr></table>"#;
        assert_eq!(parse_issue_info(html).unwrap(), None);
    }
}
