//! Block model: the typed content units of a page.
//!
//! # Invariants
//! - Blocks are ordered inside a page by the integer `order` key.
//! - Blocks are hard-deleted; there is no archive flag.

use crate::model::page::PageId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BlockId = Uuid;

/// Rendering kind of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedList,
    NumberedList,
    Todo,
    Quote,
    Code,
    Divider,
}

impl BlockType {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading1",
            Self::Heading2 => "heading2",
            Self::Heading3 => "heading3",
            Self::BulletedList => "bulleted_list",
            Self::NumberedList => "numbered_list",
            Self::Todo => "todo",
            Self::Quote => "quote",
            Self::Code => "code",
            Self::Divider => "divider",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paragraph" => Some(Self::Paragraph),
            "heading1" => Some(Self::Heading1),
            "heading2" => Some(Self::Heading2),
            "heading3" => Some(Self::Heading3),
            "bulleted_list" => Some(Self::BulletedList),
            "numbered_list" => Some(Self::NumberedList),
            "todo" => Some(Self::Todo),
            "quote" => Some(Self::Quote),
            "code" => Some(Self::Code),
            "divider" => Some(Self::Divider),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Serialized as `type` to match the wire schema.
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub content: Option<String>,
    pub order: i64,
    pub page_id: PageId,
    pub parent_id: Option<BlockId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub kind: BlockType,
    pub content: Option<String>,
    pub order: i64,
    pub page_id: PageId,
    pub parent_id: Option<BlockId>,
}

impl NewBlock {
    pub fn new(kind: BlockType, page_id: PageId, order: i64) -> Self {
        Self {
            kind,
            content: None,
            order,
            page_id,
            parent_id: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockUpdate {
    pub kind: Option<BlockType>,
    pub content: Option<String>,
    pub order: Option<i64>,
}

/// One entry of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOrder {
    pub id: BlockId,
    pub order: i64,
}
