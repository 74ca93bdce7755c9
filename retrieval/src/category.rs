//! The four urgency/importance quadrants.

use serde::{Deserialize, Serialize};

use crate::error::UnknownCategory;

/// Display name for ids outside the table.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A priority quadrant. The discriminant is the public category id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Category {
    /// Urgent and important.
    DoNow = 0,
    /// Urgent, not important.
    Schedule = 1,
    /// Important, not urgent.
    Delegate = 2,
    /// Neither urgent nor important.
    Delete = 3,
}

impl Category {
    /// All categories in id order.
    pub const ALL: [Category; 4] = [
        Category::DoNow,
        Category::Schedule,
        Category::Delegate,
        Category::Delete,
    ];

    /// Numeric id.
    pub fn id(self) -> i64 {
        self as i64
    }

    /// Look up a category by id.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::DoNow),
            1 => Some(Self::Schedule),
            2 => Some(Self::Delegate),
            3 => Some(Self::Delete),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::DoNow => "Do Now (Urgent + Important)",
            Self::Schedule => "Schedule (Urgent, Not Important)",
            Self::Delegate => "Delegate (Important, Not Urgent)",
            Self::Delete => "Delete (Not Urgent, Not Important)",
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, Self::DoNow | Self::Schedule)
    }

    pub fn is_important(self) -> bool {
        matches!(self, Self::DoNow | Self::Delegate)
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl TryFrom<i64> for Category {
    type Error = UnknownCategory;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(UnknownCategory(id))
    }
}

impl From<Category> for i64 {
    fn from(category: Category) -> Self {
        category.id()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and facets of a category id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub id: i64,
    pub name: &'static str,
    pub urgent: bool,
    pub important: bool,
}

/// Resolve any id, including ones outside the table.
///
/// Unknown ids get [`UNKNOWN_NAME`] and both facets `false`.
pub fn resolve(id: i64) -> CategoryInfo {
    match Category::from_id(id) {
        Some(category) => category.into(),
        None => CategoryInfo {
            id,
            name: UNKNOWN_NAME,
            urgent: false,
            important: false,
        },
    }
}

impl From<Category> for CategoryInfo {
    fn from(category: Category) -> Self {
        Self {
            id: category.id(),
            name: category.name(),
            urgent: category.is_urgent(),
            important: category.is_important(),
        }
    }
}
