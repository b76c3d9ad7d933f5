use crate::errors::{BvbError, Result};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref FISCAL_CODE: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
    static ref CAEN_CODE: Regex = Regex::new(r"^[0-9]{4}$").unwrap();
    static ref COUNTRY_ISO2: Regex = Regex::new(r"^[A-Z]{2}$").unwrap();
    static ref COMMERCE_REGISTRY_CODE: Regex = Regex::new(r"^[JCF][0-9]{2}/[0-9]+/[0-9]{4}").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^.+@.+\..+$").unwrap();
}

/// One row of the issuer's shareholder table, keyed by the table's own
/// header captions in column order.
pub type ShareholderRow = Vec<(String, String)>;

/// Issuer of a listed instrument.
///
/// `name` and `fiscal_code` are required at construction; every other
/// field is optional and validated by its setter. Empty input (or the
/// exchange's `-` placeholder where documented) means "absent" and
/// leaves the field untouched, so re-applying scraped values is
/// harmless.
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    #[serde(rename = "company_name")]
    name: String,
    fiscal_code: String,
    commerce_registry_code: Option<String>,
    #[serde(rename = "headquarters")]
    address: Option<String>,
    district: Option<String>,
    country_iso2: Option<String>,
    #[serde(rename = "nace_code")]
    caen_code: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    timezone: Option<String>,
    activity_field: Option<String>,
    description: Option<String>,
    website: Option<String>,
    email: Option<String>,
    shareholders: Option<Vec<ShareholderRow>>,
}

impl Company {
    pub fn new(name: &str, fiscal_code: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BvbError::Validation {
                field: "company name",
                value: name.to_string(),
            });
        }

        let fiscal_code = fiscal_code.trim();
        if !FISCAL_CODE.is_match(fiscal_code) {
            return Err(BvbError::Validation {
                field: "fiscal code",
                value: fiscal_code.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            fiscal_code: fiscal_code.to_string(),
            commerce_registry_code: None,
            address: None,
            district: None,
            country_iso2: None,
            caen_code: None,
            sector: None,
            industry: None,
            timezone: None,
            activity_field: None,
            description: None,
            website: None,
            email: None,
            shareholders: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fiscal_code(&self) -> &str {
        &self.fiscal_code
    }

    /// CAEN/NACE economic activity classification, four digits after
    /// stripping hyphens.
    pub fn set_caen_code(&mut self, caen_code: &str) -> Result<()> {
        let stripped = caen_code.replace('-', "");
        let stripped = stripped.trim();
        if stripped.is_empty() {
            return Ok(());
        }
        if !CAEN_CODE.is_match(stripped) {
            return Err(BvbError::Validation {
                field: "CAEN code",
                value: caen_code.to_string(),
            });
        }
        self.caen_code = Some(stripped.to_string());
        Ok(())
    }

    pub fn caen_code(&self) -> Option<&str> {
        self.caen_code.as_deref()
    }

    pub fn set_district(&mut self, district: &str) {
        let district = district.trim();
        if !district.is_empty() {
            self.district = Some(district.to_string());
        }
    }

    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    pub fn set_country_iso2(&mut self, country_iso2: &str) -> Result<()> {
        let country = country_iso2.trim().to_uppercase();
        if country.is_empty() {
            return Ok(());
        }
        if !COUNTRY_ISO2.is_match(&country) {
            return Err(BvbError::Validation {
                field: "country ISO 2 code",
                value: country_iso2.to_string(),
            });
        }
        self.country_iso2 = Some(country);
        Ok(())
    }

    pub fn country_iso2(&self) -> Option<&str> {
        self.country_iso2.as_deref()
    }

    pub fn set_sector(&mut self, sector: &str) {
        let sector = sector.trim();
        if !sector.is_empty() {
            self.sector = Some(sector.to_uppercase());
        }
    }

    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    pub fn set_industry(&mut self, industry: &str) {
        let industry = industry.trim();
        if !industry.is_empty() {
            self.industry = Some(industry.to_uppercase());
        }
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    /// IANA timezone identifier, e.g. `Europe/Bucharest`. Stored
    /// uppercased; lookup stays case-insensitive.
    pub fn set_timezone(&mut self, timezone: &str) -> Result<()> {
        let timezone = timezone.trim();
        if timezone.is_empty() {
            return Ok(());
        }
        if Tz::from_str_insensitive(timezone).is_err() {
            return Err(BvbError::Validation {
                field: "timezone",
                value: timezone.to_string(),
            });
        }
        self.timezone = Some(timezone.to_uppercase());
        Ok(())
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Romanian commerce registry code, e.g. `J40/8302/1997`.
    pub fn set_commerce_registry_code(&mut self, code: &str) -> Result<()> {
        let code_upper = code.trim().to_uppercase();
        if code_upper.is_empty() {
            return Ok(());
        }
        if !COMMERCE_REGISTRY_CODE.is_match(&code_upper) {
            return Err(BvbError::Validation {
                field: "commerce registry code",
                value: code.to_string(),
            });
        }
        self.commerce_registry_code = Some(code_upper);
        Ok(())
    }

    pub fn commerce_registry_code(&self) -> Option<&str> {
        self.commerce_registry_code.as_deref()
    }

    pub fn set_address(&mut self, address: &str) {
        let address = address.trim();
        if !address.is_empty() {
            self.address = Some(address.to_string());
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn set_website(&mut self, website: &str) {
        let website = website.trim();
        if !website.is_empty() {
            self.website = Some(website.to_string());
        }
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn set_email(&mut self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(());
        }
        if !EMAIL.is_match(email) {
            return Err(BvbError::Validation {
                field: "email",
                value: email.to_string(),
            });
        }
        self.email = Some(email.to_string());
        Ok(())
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_activity_field(&mut self, activity_field: &str) {
        let activity_field = activity_field.trim();
        if !activity_field.is_empty() {
            self.activity_field = Some(activity_field.to_uppercase());
        }
    }

    pub fn activity_field(&self) -> Option<&str> {
        self.activity_field.as_deref()
    }

    pub fn set_description(&mut self, description: &str) {
        let description = description.trim();
        if !description.is_empty() {
            self.description = Some(description.to_string());
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_shareholders(&mut self, shareholders: Vec<ShareholderRow>) {
        if !shareholders.is_empty() {
            self.shareholders = Some(shareholders);
        }
    }

    pub fn shareholders(&self) -> Option<&[ShareholderRow]> {
        self.shareholders.as_deref()
    }
}
