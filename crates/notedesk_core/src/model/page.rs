//! Page model.

use crate::model::block::Block;
use crate::model::document::DocumentId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PageId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub content: Option<String>,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
    pub is_published: bool,
    pub is_archived: bool,
    pub user_id: UserId,
    pub document_id: Option<DocumentId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Page with all of its blocks in ascending `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: Page,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub title: String,
    pub user_id: UserId,
    pub document_id: Option<DocumentId>,
    pub content: Option<String>,
}

impl NewPage {
    pub fn new(title: impl Into<String>, user_id: UserId) -> Self {
        Self {
            title: title.into(),
            user_id,
            document_id: None,
            content: None,
        }
    }

    pub fn in_document(mut self, document_id: DocumentId) -> Self {
        self.document_id = Some(document_id);
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
///
/// Nullable columns take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub cover_image: Option<Option<String>>,
    pub is_published: Option<bool>,
    pub is_archived: Option<bool>,
}
