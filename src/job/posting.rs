use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Display attributes attached to a posting under `primary_details`.
///
/// Every attribute is optional. Keys the client does not interpret are kept in
/// `extra` so a bookmarked posting is stored exactly as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(rename = "Place", default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(rename = "Salary", default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(rename = "Experience", default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(rename = "Qualification", default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(rename = "Phone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single job posting as returned by the listing API.
///
/// No field is unique or stable across pages; use [`identity_of`] to decide
/// whether two postings refer to the same bookmarkable item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(rename = "primary_details", default, deserialize_with = "null_as_default")]
    pub details: JobDetails,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobPosting {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            ..Self::default()
        }
    }

    pub fn identity(&self) -> ItemIdentity {
        identity_of(self)
    }
}

/// Bookmark identity of a posting: the exact `(title, company)` pair.
///
/// Comparison is case-sensitive with no trimming. Two different listings that
/// share both strings collapse into one bookmark; there is no server-issued ID
/// to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemIdentity {
    pub title: String,
    pub company: String,
}

impl std::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.title, self.company)
    }
}

pub fn identity_of(posting: &JobPosting) -> ItemIdentity {
    ItemIdentity {
        title: posting.title.clone(),
        company: posting.company.clone(),
    }
}

/// True when both postings share an identity, without allocating one.
pub fn same_item(a: &JobPosting, b: &JobPosting) -> bool {
    a.title == b.title && a.company == b.company
}

/// Response body of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<JobPosting>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
