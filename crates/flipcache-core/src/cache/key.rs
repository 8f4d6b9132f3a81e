use std::fmt;

use serde::{Deserialize, Serialize};

/// Cache address: a category alone for collection-level entries
/// (`projects`) or category plus entity id (`expenses:42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    category: String,
    id: Option<i64>,
}

impl CacheKey {
    pub fn collection(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            id: None,
        }
    }

    pub fn entity(category: impl Into<String>, id: i64) -> Self {
        Self {
            category: category.into(),
            id: Some(id),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// True if invalidating `self` must also drop `other`: identical keys,
    /// or `self` is a bare category and `other` lives under it.
    pub fn covers(&self, other: &CacheKey) -> bool {
        match self.id {
            Some(_) => self == other,
            None => self.category == other.category,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}:{}", self.category, id),
            None => write!(f, "{}", self.category),
        }
    }
}

/// `"expenses:42"` becomes an entity key; anything without a trailing
/// integer id is a collection key.
impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        if let Some((category, id)) = s.rsplit_once(':') {
            if let Ok(id) = id.parse::<i64>() {
                return CacheKey::entity(category, id);
            }
        }
        CacheKey::collection(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::from(s.as_str())
    }
}

impl From<(&str, i64)> for CacheKey {
    fn from((category, id): (&str, i64)) -> Self {
        CacheKey::entity(category, id)
    }
}

impl From<(&str, Option<i64>)> for CacheKey {
    fn from((category, id): (&str, Option<i64>)) -> Self {
        Self {
            category: category.to_string(),
            id,
        }
    }
}
