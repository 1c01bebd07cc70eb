//! Document tree model.
//!
//! # Invariants
//! - `parent_document_id = None` marks a root document.
//! - Archived documents stay in storage and are hidden from listings.

use crate::model::page::Page;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DocumentId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: Option<String>,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
    pub is_published: bool,
    /// Soft-delete marker.
    pub is_archived: bool,
    pub user_id: UserId,
    pub parent_document_id: Option<DocumentId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Document with its visible children and pages, both oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub children: Vec<Document>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub user_id: UserId,
    pub parent_document_id: Option<DocumentId>,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
}

impl NewDocument {
    /// Root document with no icon or cover.
    pub fn new(title: impl Into<String>, user_id: UserId) -> Self {
        Self {
            title: title.into(),
            user_id,
            parent_document_id: None,
            icon: None,
            cover_image: None,
        }
    }

    pub fn with_parent(mut self, parent_document_id: DocumentId) -> Self {
        self.parent_document_id = Some(parent_document_id);
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
///
/// Nullable columns take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub cover_image: Option<Option<String>>,
    pub is_published: Option<bool>,
    pub is_archived: Option<bool>,
}

impl DocumentUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}
