//! Core data models for notice searches.

mod notice;
mod params;
mod search;

pub use notice::{Notice, NoticeType, Topic, UnknownValue};
pub use params::{keys, PageRange, ParamBuilder, QueryParams, Sort, MAX_PER_PAGE};
pub use search::{
    Entity, EntitySearch, FacetCategory, Metadata, NameCount, PageInfo, SearchData, TopicRecord,
};
