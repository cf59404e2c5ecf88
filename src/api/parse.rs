//! Conversion of raw JSON payloads into typed records.
//!
//! These are pure functions: JSON in, records out.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::ClientError;
use crate::models::{
    Entity, EntitySearch, FacetCategory, Metadata, NameCount, Notice, NoticeType, PageInfo,
    SearchData, Topic, TopicRecord,
};

#[derive(Debug, Deserialize)]
struct RawNotice {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "type")]
    notice_type: Option<String>,
    #[serde(default)]
    date_sent: Option<String>,
    #[serde(default)]
    date_received: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    jurisdictions: Vec<String>,
    #[serde(default)]
    works: Vec<RawWork>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    action_taken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWork {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    infringing_urls: Vec<RawUrl>,
}

#[derive(Debug, Deserialize)]
struct RawUrl {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    #[serde(default)]
    key: Value,
    #[serde(default)]
    doc_count: u64,
}

/// Host (with port, if any) of an infringing URL
fn url_host(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn notice_from_raw(raw: RawNotice, fallback_type: Option<&str>) -> Notice {
    let type_label = raw
        .notice_type
        .or_else(|| fallback_type.map(str::to_string))
        .unwrap_or_default();
    let notice_type = match type_label.parse::<NoticeType>() {
        Ok(kind) => Some(kind),
        Err(e) => {
            tracing::debug!("Flagging notice {:?}: {}", raw.id, e);
            None
        }
    };

    let mut topics = Vec::new();
    let mut unrecognized_topics = Vec::new();
    for name in raw.topics {
        match name.parse::<Topic>() {
            Ok(topic) => topics.push(topic),
            Err(_) => unrecognized_topics.push(name),
        }
    }

    let mut infringing_urls: BTreeMap<String, usize> = BTreeMap::new();
    for host in raw
        .works
        .iter()
        .flat_map(|work| work.infringing_urls.iter())
        .filter_map(|u| u.url.as_deref())
        .filter_map(url_host)
    {
        *infringing_urls.entry(host).or_default() += 1;
    }

    let works = raw
        .works
        .into_iter()
        .map(|work| work.description.unwrap_or_default().trim_end().to_string())
        .collect();

    Notice {
        id: raw.id,
        title: raw.title.unwrap_or_default(),
        notice_type,
        type_label,
        date_sent: raw.date_sent,
        date_received: raw.date_received,
        topics,
        unrecognized_topics,
        tags: raw.tags,
        jurisdictions: raw.jurisdictions,
        infringing_urls,
        works,
        subject: raw.subject,
        body: raw.body,
        language: raw.language,
        action_taken: raw.action_taken,
    }
}

/// Parse one notice object as it appears in the `notices` array
pub fn parse_notice(data: &Value) -> Result<Notice, ClientError> {
    let raw = RawNotice::deserialize(data)
        .map_err(|e| ClientError::Decode(format!("invalid notice: {}", e)))?;
    Ok(notice_from_raw(raw, None))
}

/// Parse the payload of `/notices/{id}.json`.
///
/// The notice sits under a single root key naming its type, e.g.
/// `{"dmca": {...}}`; the key is used when the object has no `type`.
pub fn parse_single_notice(payload: &Value) -> Result<Notice, ClientError> {
    let object = payload
        .as_object()
        .ok_or_else(|| ClientError::Decode("notice payload is not an object".to_string()))?;

    let mut entries = object.iter();
    let (root_key, data) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ClientError::Decode(format!(
                "expected one root key in notice payload, found {}",
                object.len()
            )))
        }
    };

    let raw = RawNotice::deserialize(data)
        .map_err(|e| ClientError::Decode(format!("invalid notice: {}", e)))?;
    Ok(notice_from_raw(raw, Some(root_key.as_str())))
}

/// Build facet metadata from `meta.facets`.
///
/// Buckets with an empty key are dropped and a missing facet yields an
/// empty list.
pub fn metadata_from_facets(facets: &Value) -> Result<Metadata, ClientError> {
    let mut metadata = Metadata::default();
    for category in FacetCategory::ALL {
        let Some(buckets) = facets.get(category.facet_key()).and_then(|f| f.get("buckets")) else {
            continue;
        };
        let buckets = Vec::<RawBucket>::deserialize(buckets).map_err(|e| {
            ClientError::Decode(format!("invalid {} buckets: {}", category.facet_key(), e))
        })?;

        let entries = metadata.facet_mut(category);
        for bucket in buckets {
            let name = match bucket.key {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if !name.is_empty() {
                entries.push(NameCount::new(name, bucket.doc_count));
            }
        }
    }
    Ok(metadata)
}

fn page_info(payload: &Value) -> PageInfo {
    payload
        .get("meta")
        .and_then(|meta| PageInfo::deserialize(meta).ok())
        .unwrap_or_default()
}

/// Parse the payload of `/notices/search.json`
pub fn parse_search(payload: Value) -> Result<SearchData, ClientError> {
    let notices = payload
        .get("notices")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Decode("search payload has no notices array".to_string()))?
        .iter()
        .map(parse_notice)
        .collect::<Result<Vec<_>, _>>()?;

    let metadata = match payload.get("meta").and_then(|meta| meta.get("facets")) {
        Some(facets) => metadata_from_facets(facets)?,
        None => Metadata::default(),
    };

    Ok(SearchData {
        notices,
        metadata,
        page_info: page_info(&payload),
        raw: payload,
    })
}

/// Parse the payload of `/topics.json`
pub fn parse_topics(payload: &Value) -> Result<Vec<TopicRecord>, ClientError> {
    let topics = payload
        .get("topics")
        .ok_or_else(|| ClientError::Decode("topics payload has no topics array".to_string()))?;
    Ok(Vec::<TopicRecord>::deserialize(topics)?)
}

/// Parse the payload of `/entities/search.json`
pub fn parse_entities(payload: Value) -> Result<EntitySearch, ClientError> {
    let entities = payload
        .get("entities")
        .ok_or_else(|| ClientError::Decode("entity payload has no entities array".to_string()))?;
    let entities = Vec::<Entity>::deserialize(entities)?;

    Ok(EntitySearch {
        entities,
        page_info: page_info(&payload),
        raw: payload,
    })
}
