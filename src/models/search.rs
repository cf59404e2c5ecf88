//! Search response models.

use serde::{Deserialize, Serialize};

use crate::models::Notice;

/// A facet value and the number of matching documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub count: u64,
}

impl NameCount {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Facet categories aggregated by the search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetCategory {
    Senders,
    Recipients,
    Principals,
    Submitters,
    Topics,
    Tags,
    Countries,
    Languages,
    ActionTaken,
    SubmitterCountries,
}

impl FacetCategory {
    pub const ALL: [FacetCategory; 10] = [
        FacetCategory::Senders,
        FacetCategory::Recipients,
        FacetCategory::Principals,
        FacetCategory::Submitters,
        FacetCategory::Topics,
        FacetCategory::Tags,
        FacetCategory::Countries,
        FacetCategory::Languages,
        FacetCategory::ActionTaken,
        FacetCategory::SubmitterCountries,
    ];

    /// Key of this facet under `meta.facets`
    pub fn facet_key(&self) -> &'static str {
        match self {
            FacetCategory::Senders => "sender_name_facet",
            FacetCategory::Recipients => "recipient_name_facet",
            FacetCategory::Principals => "principal_name_facet",
            FacetCategory::Submitters => "submitter_name_facet",
            FacetCategory::Topics => "topic_facet",
            FacetCategory::Tags => "tag_list_facet",
            FacetCategory::Countries => "country_code_facet",
            FacetCategory::Languages => "language_facet",
            FacetCategory::ActionTaken => "action_taken_facet",
            FacetCategory::SubmitterCountries => "submitter_country_code_facet",
        }
    }
}

/// Aggregated facet counts for a search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Those who filed the notice
    pub senders: Vec<NameCount>,
    pub recipients: Vec<NameCount>,
    /// Content owners
    pub principals: Vec<NameCount>,
    /// Those who submitted the notice to the database
    pub submitters: Vec<NameCount>,
    pub topics: Vec<NameCount>,
    pub tags: Vec<NameCount>,
    pub countries: Vec<NameCount>,
    pub languages: Vec<NameCount>,
    pub action_taken: Vec<NameCount>,
    pub submitter_countries: Vec<NameCount>,
}

impl Metadata {
    /// Counts for one category
    pub fn facet(&self, category: FacetCategory) -> &[NameCount] {
        match category {
            FacetCategory::Senders => &self.senders,
            FacetCategory::Recipients => &self.recipients,
            FacetCategory::Principals => &self.principals,
            FacetCategory::Submitters => &self.submitters,
            FacetCategory::Topics => &self.topics,
            FacetCategory::Tags => &self.tags,
            FacetCategory::Countries => &self.countries,
            FacetCategory::Languages => &self.languages,
            FacetCategory::ActionTaken => &self.action_taken,
            FacetCategory::SubmitterCountries => &self.submitter_countries,
        }
    }

    pub(crate) fn facet_mut(&mut self, category: FacetCategory) -> &mut Vec<NameCount> {
        match category {
            FacetCategory::Senders => &mut self.senders,
            FacetCategory::Recipients => &mut self.recipients,
            FacetCategory::Principals => &mut self.principals,
            FacetCategory::Submitters => &mut self.submitters,
            FacetCategory::Topics => &mut self.topics,
            FacetCategory::Tags => &mut self.tags,
            FacetCategory::Countries => &mut self.countries,
            FacetCategory::Languages => &mut self.languages,
            FacetCategory::ActionTaken => &mut self.action_taken,
            FacetCategory::SubmitterCountries => &mut self.submitter_countries,
        }
    }
}

/// Pagination details reported under `meta`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub total_entries: Option<u64>,
}

/// Result of one successful search request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchData {
    /// Notices in the order the service returned them
    pub notices: Vec<Notice>,

    pub metadata: Metadata,

    pub page_info: PageInfo,

    /// The payload as received
    pub raw: serde_json::Value,
}

/// An entry of `/topics.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// A sender, recipient or principal known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Result of an entity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySearch {
    pub entities: Vec<Entity>,
    pub page_info: PageInfo,
    pub raw: serde_json::Value,
}
