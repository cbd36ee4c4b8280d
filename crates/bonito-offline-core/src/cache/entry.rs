use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::network::Response;

/// Key of a cached response: the request method and its URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId {
    pub method: String,
    pub url: String,
}

impl RequestId {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
        }
    }

    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// One stored request/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub request: RequestId,
    pub response: Response,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// Short relative age, rounded to the nearest unit ("5m ago", "2h ago").
    pub fn age_display(&self) -> String {
        Self::format_age(self.age_minutes())
    }

    fn format_age(minutes: i64) -> String {
        const HOUR: i64 = 60;
        const DAY: i64 = 24 * HOUR;

        match minutes {
            // Negative ages come from clock skew
            m if m < 1 => "just now".to_string(),
            m if m < HOUR => format!("{}m ago", m),
            m if m < DAY => format!("{}h ago", (m + HOUR / 2) / HOUR),
            m => format!("{}d ago", (m + DAY / 2) / DAY),
        }
    }
}
