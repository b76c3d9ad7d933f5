// Public modules for library consumers.
pub mod config;
pub mod diag;
pub mod errors;
pub mod models;
pub mod scrapers;

// Transport plumbing, internal to the scrapers.
mod http;

// Re-export the commonly used types.
pub use config::Config;
pub use diag::Diagnostics;
pub use errors::{BvbError, Result};
pub use models::company::{Company, ShareholderRow};
pub use models::history::PriceHistory;
pub use models::share::{Market, Segment, Share, Status, Tier};
pub use scrapers::details::{DetailsTab, IssuerProfile};
pub use scrapers::history::{HistoryQuery, Interval, Period};
pub use scrapers::listing::{Selection, ShareFilter};
pub use scrapers::BvbScraper;
