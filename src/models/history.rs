use serde::{Deserialize, Serialize};

/// Price series as served by the history endpoint: parallel arrays
/// keyed by single-letter codes (t=timestamp, o=open, h=high, l=low,
/// c=close, v=volume) plus the `s` status string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>,
}

impl PriceHistory {
    /// An empty series with "ok" status; what a "no_data" response
    /// normalizes to.
    pub fn empty_ok() -> Self {
        Self {
            s: "ok".to_string(),
            t: Vec::new(),
            o: Vec::new(),
            h: Vec::new(),
            l: Vec::new(),
            c: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}
