//! Core types for queries and engine results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// A single result produced by an engine adapter.
///
/// Entries without a URL are suggestion-only (e.g. "did you mean")
/// and never become sitelinks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Target URL, `None` for suggestion-only entries.
    pub url: Option<String>,
    /// Result title (or suggestion text).
    pub title: String,
    /// Snippet summarising the page.
    pub content: String,
    /// Name of the engine that produced this result.
    pub engine: String,
    /// Deep links on the same site, attached by sitelink enrichment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sitelinks: Vec<SearchResult>,
}

impl SearchResult {
    /// A regular result pointing at `url`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            title: title.into(),
            content: content.into(),
            engine: engine.into(),
            sitelinks: Vec::new(),
        }
    }

    /// A suggestion-only entry (no URL).
    pub fn suggestion(text: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            url: None,
            title: text.into(),
            content: String::new(),
            engine: engine.into(),
            sitelinks: Vec::new(),
        }
    }

    /// The URL, or `""` for suggestion-only entries.
    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

/// A search locale such as `en` or `en-US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    /// Lowercase language subtag (`en`).
    pub language: String,
    /// Uppercase territory subtag (`US`), if any.
    pub territory: Option<String>,
}

impl Locale {
    /// Locale with a language and optional territory.
    pub fn new(language: impl Into<String>, territory: Option<&str>) -> Self {
        Self {
            language: language.into(),
            territory: territory.map(str::to_owned),
        }
    }
}

impl FromStr for Locale {
    type Err = SearchError;

    /// Parses `en`, `en-US` and `en_US`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(['-', '_']);
        let language = parts
            .next()
            .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphabetic()))
            .ok_or_else(|| SearchError::Config(format!("invalid locale: {s:?}")))?
            .to_ascii_lowercase();
        let territory = match parts.next() {
            Some(t) if !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Some(t.to_ascii_uppercase())
            }
            Some(_) => return Err(SearchError::Config(format!("invalid locale: {s:?}"))),
            None => None,
        };
        if parts.next().is_some() {
            return Err(SearchError::Config(format!("invalid locale: {s:?}")));
        }
        Ok(Self {
            language,
            territory,
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.territory {
            Some(t) => write!(f, "{}-{t}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

/// Safe search level requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    /// No filtering.
    Off,
    /// Engine default filtering.
    #[default]
    Moderate,
    /// Strict filtering.
    Strict,
}

impl FromStr for SafeSearch {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "off" => Ok(Self::Off),
            "1" | "moderate" => Ok(Self::Moderate),
            "2" | "strict" => Ok(Self::Strict),
            other => Err(SearchError::Config(format!("invalid safesearch: {other:?}"))),
        }
    }
}

/// Restricts results to a recent time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
    /// Last month.
    Month,
    /// Last year.
    Year,
}

impl FromStr for TimeRange {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(SearchError::Config(format!("invalid time range: {other:?}"))),
        }
    }
}

/// A user query as handed to every engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text.
    pub query: String,
    /// Requested locale, if any.
    pub locale: Option<Locale>,
    /// 1-based page number.
    pub pageno: u32,
    /// Safe search level.
    pub safesearch: SafeSearch,
    /// Time window restriction, if any.
    pub time_range: Option<TimeRange>,
}

impl SearchQuery {
    /// First page, no locale, moderate safe search, no time range.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            locale: None,
            pageno: 1,
            safesearch: SafeSearch::default(),
            time_range: None,
        }
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Set the page number.
    pub fn with_pageno(mut self, pageno: u32) -> Self {
        self.pageno = pageno;
        self
    }

    /// Set the time range.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    /// Set the safe search level.
    pub fn with_safesearch(mut self, safesearch: SafeSearch) -> Self {
        self.safesearch = safesearch;
        self
    }
}
