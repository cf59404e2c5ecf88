//! Query parameter building and validation.
//!
//! [`ParamBuilder`] accumulates the parameters of a notice search. Every
//! `with_*` call consumes the builder and returns a new value, so a builder
//! handed to a concurrent page fetch can never be mutated by its caller.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::ClientError;
use crate::models::Topic;

/// Largest page size accepted by the service.
pub const MAX_PER_PAGE: u32 = 10_000;

/// Parameter keys understood by `/notices/search.json`.
pub mod keys {
    pub const TERM: &str = "term";
    pub const TITLE: &str = "title";
    pub const TOPICS: &str = "topics";
    pub const TAGS: &str = "tags";
    pub const JURISDICTIONS: &str = "jurisdictions";
    pub const SENDER: &str = "sender_name";
    pub const PRINCIPAL: &str = "principal_name";
    pub const RECIPIENT: &str = "recipient_name";
    pub const WORKS: &str = "works";
    pub const ACTION_TAKEN: &str = "action_taken";
    pub const COUNTRY_CODE: &str = "country_code_facet";
    pub const LANGUAGE: &str = "language_facet";
    pub const DATE_RECEIVED: &str = "date_received_facet";
    pub const PER_PAGE: &str = "per_page";
    pub const PAGE: &str = "page";
    pub const SORT_BY: &str = "sort_by";
}

/// Suffix appended to a field key to request that all of its words match.
const REQUIRE_ALL_SUFFIX: &str = "-require-all";

/// Ordered, key-unique mapping of parameter names to raw string values.
///
/// Values are stored unencoded; [`QueryParams::to_query_string`] applies
/// form encoding (space becomes `+`) uniformly at transmission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any earlier value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove `key` if present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Look up a raw value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrow the underlying sorted map
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Form-encode the parameters (`a=b&c=d+e`) in key order.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Sort order for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    /// Most relevant first (service default)
    #[default]
    RelevancyDesc,
    RelevancyAsc,
    /// Newest notices first
    DateReceivedDesc,
    DateReceivedAsc,
}

impl Sort {
    /// Value transmitted as `sort_by`
    pub fn as_param(&self) -> &'static str {
        match self {
            Sort::RelevancyDesc => "relevancy desc",
            Sort::RelevancyAsc => "relevancy asc",
            Sort::DateReceivedDesc => "date_received desc",
            Sort::DateReceivedAsc => "date_received asc",
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Inclusive range of result pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Validate and create a range; pages are 1-based and `start <= end`.
    pub fn new(start: u32, end: u32) -> Result<Self, ClientError> {
        if start < 1 {
            return Err(ClientError::InvalidArgument(
                "cannot request pages lower than page 1".to_string(),
            ));
        }
        if start > end {
            return Err(ClientError::InvalidArgument(format!(
                "start page {} is after end page {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of pages covered
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Always false; a valid range covers at least one page
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Page numbers in ascending order
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self { start: 1, end: 1 }
    }
}

/// Fluent builder for notice search parameters.
///
/// Text fields accept an optional `require_all` flag. When it is given, the
/// companion `<field>-require-all` parameter is set to `true`/`false`; when
/// it is omitted, any companion left by an earlier call for the same field
/// is removed so that the later call fully replaces the field.
///
/// ```rust
/// use lumen_client::models::ParamBuilder;
///
/// let params = ParamBuilder::new()
///     .with_query("fan fiction", Some(true))
///     .with_amount(50)
///     .unwrap();
/// assert_eq!(params.params().get("per_page"), Some("50"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBuilder {
    params: QueryParams,
}

impl ParamBuilder {
    /// Start an empty query
    pub fn new() -> Self {
        Self::default()
    }

    fn with_field(mut self, key: &str, value: impl Into<String>, require_all: Option<bool>) -> Self {
        self.params.insert(key, value);
        let companion = format!("{}{}", key, REQUIRE_ALL_SUFFIX);
        match require_all {
            Some(flag) => self.params.insert(companion, flag.to_string()),
            None => {
                self.params.remove(&companion);
            }
        }
        self
    }

    fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Full-text term searched across all fields. Terms are OR-ed unless
    /// `require_all` is set.
    pub fn with_query(self, term: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::TERM, term, require_all)
    }

    /// Search in the notice title
    pub fn with_title(self, title: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::TITLE, title, require_all)
    }

    /// Search by topic
    pub fn with_topic(self, topic: Topic, require_all: Option<bool>) -> Self {
        self.with_field(keys::TOPICS, topic.as_str(), require_all)
    }

    pub fn with_tags(self, tags: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::TAGS, tags, require_all)
    }

    pub fn with_jurisdictions(
        self,
        jurisdictions: impl Into<String>,
        require_all: Option<bool>,
    ) -> Self {
        self.with_field(keys::JURISDICTIONS, jurisdictions, require_all)
    }

    /// Search by sender name. The sender filed the notice and is not
    /// necessarily the content owner.
    pub fn with_sender(self, sender: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::SENDER, sender, require_all)
    }

    /// Search by principal name, the party that owns the content
    pub fn with_principal(self, principal: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::PRINCIPAL, principal, require_all)
    }

    pub fn with_recipient(self, recipient: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::RECIPIENT, recipient, require_all)
    }

    /// Search in the description of the works
    pub fn with_works_desc(self, works: impl Into<String>, require_all: Option<bool>) -> Self {
        self.with_field(keys::WORKS, works, require_all)
    }

    /// Filter on the action taken by the recipient (`Yes`, `No`, `Partial`)
    pub fn with_action_taken(self, action_taken: impl Into<String>) -> Self {
        self.with_value(keys::ACTION_TAKEN, action_taken)
    }

    /// Filter on the notice's country code facet
    pub fn with_country_code(self, code: impl Into<String>) -> Self {
        self.with_value(keys::COUNTRY_CODE, code)
    }

    /// Filter on the notice's language facet
    pub fn with_language(self, language: impl Into<String>) -> Self {
        self.with_value(keys::LANGUAGE, language)
    }

    /// Number of results per page. Larger result sets must be requested as
    /// several pages.
    pub fn with_amount(self, per_page: u32) -> Result<Self, ClientError> {
        if per_page > MAX_PER_PAGE {
            return Err(ClientError::InvalidArgument(format!(
                "requested {} entries per page, the maximum is {}",
                per_page, MAX_PER_PAGE
            )));
        }
        Ok(self.with_value(keys::PER_PAGE, per_page.to_string()))
    }

    /// Select a single result page
    pub fn with_page(self, page: u32) -> Self {
        self.with_value(keys::PAGE, page.to_string())
    }

    pub fn with_order(self, sort: Sort) -> Self {
        self.with_value(keys::SORT_BY, sort.as_param())
    }

    /// Restrict to notices received between two dates, inclusive of both
    /// midnights (UTC).
    pub fn with_date_range(self, from: NaiveDate, to: NaiveDate) -> Result<Self, ClientError> {
        if from > to {
            return Err(ClientError::InvalidArgument(format!(
                "date range starts at {} which is after its end {}",
                from, to
            )));
        }
        let value = format!("{}..{}", midnight_millis(from), midnight_millis(to));
        Ok(self.with_value(keys::DATE_RECEIVED, value))
    }

    /// Parameters accumulated so far
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn into_params(self) -> QueryParams {
        self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<QueryParams> for ParamBuilder {
    fn from(params: QueryParams) -> Self {
        Self { params }
    }
}

fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
