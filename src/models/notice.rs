//! Notice model and the closed vocabularies used to classify notices.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A value that is not part of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Topics a notice can be filed under.
///
/// The remote taxonomy changes independently of this client, so parsing is
/// fallible and callers decide whether to reject or flag unknown names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Trademark,
    JohnDoeAnonymity,
    Defamation,
    Responses,
    DerivativeWorks,
    FanFiction,
    DomainNamesAndTrademarks,
    TradeSecret,
    NoAction,
    DmcaSubpoenas,
    RightOfPublicity,
    CourtOrders,
    ECommercePatents,
    Udrp,
    Acpa,
    Piracy,
    DocumentingDomainDefense,
    DmcaNotices,
    DmcaAnticircumvention,
    Copyright,
    FairUse,
    ReverseEngineering,
    ProtestParodyCriticism,
    Linking,
    LawEnforcementRequests,
    Patent,
    International,
    RightToBeForgotten,
    DmcaSafeHarbor,
    GovernmentRequests,
    Counterfeit,
}

impl Topic {
    /// Every known topic
    pub const ALL: [Topic; 31] = [
        Topic::Trademark,
        Topic::JohnDoeAnonymity,
        Topic::Defamation,
        Topic::Responses,
        Topic::DerivativeWorks,
        Topic::FanFiction,
        Topic::DomainNamesAndTrademarks,
        Topic::TradeSecret,
        Topic::NoAction,
        Topic::DmcaSubpoenas,
        Topic::RightOfPublicity,
        Topic::CourtOrders,
        Topic::ECommercePatents,
        Topic::Udrp,
        Topic::Acpa,
        Topic::Piracy,
        Topic::DocumentingDomainDefense,
        Topic::DmcaNotices,
        Topic::DmcaAnticircumvention,
        Topic::Copyright,
        Topic::FairUse,
        Topic::ReverseEngineering,
        Topic::ProtestParodyCriticism,
        Topic::Linking,
        Topic::LawEnforcementRequests,
        Topic::Patent,
        Topic::International,
        Topic::RightToBeForgotten,
        Topic::DmcaSafeHarbor,
        Topic::GovernmentRequests,
        Topic::Counterfeit,
    ];

    /// Topic name as used by the service
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Trademark => "Trademark",
            Topic::JohnDoeAnonymity => "John Doe Anonymity",
            Topic::Defamation => "Defamation",
            Topic::Responses => "Responses",
            Topic::DerivativeWorks => "Derivative Works",
            Topic::FanFiction => "Fan Fiction",
            Topic::DomainNamesAndTrademarks => "Domain Names and Trademarks",
            Topic::TradeSecret => "Trade Secret",
            Topic::NoAction => "No Action",
            Topic::DmcaSubpoenas => "DMCA Subpoenas",
            Topic::RightOfPublicity => "Right of Publicity",
            Topic::CourtOrders => "Court Orders",
            Topic::ECommercePatents => "E-Commerce Patents",
            Topic::Udrp => "UDRP",
            Topic::Acpa => "ACPA",
            Topic::Piracy => "Piracy or Copyright Infringement",
            Topic::DocumentingDomainDefense => "Documenting Your Domain Defense",
            Topic::DmcaNotices => "DMCA Notices",
            Topic::DmcaAnticircumvention => "Anticircumvention (DMCA)",
            Topic::Copyright => "Copyright",
            Topic::FairUse => "Copyright and Fair Use",
            Topic::ReverseEngineering => "Reverse Engineering",
            Topic::ProtestParodyCriticism => "Protest, Parody and Criticism Sites",
            Topic::Linking => "Linking",
            Topic::LawEnforcementRequests => "Law Enforcement Requests",
            Topic::Patent => "Patent",
            Topic::International => "International",
            Topic::RightToBeForgotten => "EU - Right to Be Forgotten",
            Topic::DmcaSafeHarbor => "DMCA Safe Harbor",
            Topic::GovernmentRequests => "Government Requests",
            Topic::Counterfeit => "Counterfeit",
        }
    }
}

impl FromStr for Topic {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Topic::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownValue {
                kind: "topic",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Kind of notice as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeType {
    Counternotice,
    CourtOrder,
    DataProtection,
    Defamation,
    Dmca,
    LawEnforcementRequest,
    Other,
    PrivateInformation,
    GovernmentRequest,
    Trademark,
}

impl NoticeType {
    pub const ALL: [NoticeType; 10] = [
        NoticeType::Counternotice,
        NoticeType::CourtOrder,
        NoticeType::DataProtection,
        NoticeType::Defamation,
        NoticeType::Dmca,
        NoticeType::LawEnforcementRequest,
        NoticeType::Other,
        NoticeType::PrivateInformation,
        NoticeType::GovernmentRequest,
        NoticeType::Trademark,
    ];

    /// Compact lowercase identifier (`"courtorder"`, `"dmca"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeType::Counternotice => "counternotice",
            NoticeType::CourtOrder => "courtorder",
            NoticeType::DataProtection => "dataprotection",
            NoticeType::Defamation => "defamation",
            NoticeType::Dmca => "dmca",
            NoticeType::LawEnforcementRequest => "lawenforcementrequest",
            NoticeType::Other => "other",
            NoticeType::PrivateInformation => "privateinformation",
            NoticeType::GovernmentRequest => "governmentrequest",
            NoticeType::Trademark => "trademark",
        }
    }
}

impl FromStr for NoticeType {
    type Err = UnknownValue;

    /// Accepts `CourtOrder`, `court_order`, `Court Order` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        NoticeType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownValue {
                kind: "notice type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NoticeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A takedown notice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    /// Service-assigned identifier
    pub id: Option<u64>,

    pub title: String,

    /// Parsed notice type, `None` when the service reported an unknown type
    pub notice_type: Option<NoticeType>,

    /// Notice type exactly as reported
    pub type_label: String,

    pub date_sent: Option<String>,

    pub date_received: Option<String>,

    /// Recognized topics
    pub topics: Vec<Topic>,

    /// Topic names that are not in [`Topic::ALL`]
    pub unrecognized_topics: Vec<String>,

    pub tags: Vec<String>,

    pub jurisdictions: Vec<String>,

    /// Number of infringing URLs per host
    pub infringing_urls: BTreeMap<String, usize>,

    /// Descriptions of the works the notice concerns
    pub works: Vec<String>,

    pub subject: Option<String>,

    pub body: Option<String>,

    pub language: Option<String>,

    /// `Yes`, `No`, `Partial` or blank
    pub action_taken: Option<String>,
}

impl Notice {
    /// Total number of infringing URLs across all hosts
    pub fn infringing_url_count(&self) -> usize {
        self.infringing_urls.values().sum()
    }
}
