//! Block repository contract and SQLite implementation.
//!
//! # Invariants
//! - Block listings are ordered by `order ASC`, insertion order breaking ties.
//! - `delete_block` is a hard delete; nested blocks cascade with it.
//! - `reorder_blocks` is all-or-nothing.

use crate::db::now_epoch_ms;
use crate::model::block::{Block, BlockId, BlockOrder, BlockType, BlockUpdate, NewBlock};
use crate::model::page::PageId;
use crate::repo::{
    parse_optional_uuid, parse_uuid, EntityKind, RepoError, RepoResult, SqliteStore,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const BLOCK_SELECT_SQL: &str = "SELECT
    id,
    type,
    content,
    sort_order,
    page_id,
    parent_id,
    created_at,
    updated_at
FROM blocks";

/// Repository interface for page blocks.
pub trait BlockRepository {
    /// Lists all blocks of one page in ascending `order`.
    fn list_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>>;
    fn create_block(&self, block: &NewBlock) -> RepoResult<Block>;
    fn update_block(&self, id: BlockId, update: &BlockUpdate) -> RepoResult<Block>;
    /// Removes one block row and returns it as it was.
    fn delete_block(&self, id: BlockId) -> RepoResult<Block>;
    /// Applies a batch of order changes in one transaction.
    ///
    /// # Errors
    /// - `NotFound` for the first unknown id; no change from the batch is kept.
    fn reorder_blocks(&self, orders: &[BlockOrder]) -> RepoResult<Vec<Block>>;
}

impl BlockRepository for SqliteStore<'_> {
    fn list_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>> {
        let mut stmt = self.conn().prepare(&format!(
            "{BLOCK_SELECT_SQL}
             WHERE page_id = ?1
             ORDER BY sort_order ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([page_id.to_string()])?;
        let mut blocks = Vec::new();
        while let Some(row) = rows.next()? {
            blocks.push(parse_block_row(row)?);
        }
        Ok(blocks)
    }

    fn create_block(&self, block: &NewBlock) -> RepoResult<Block> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn().execute(
            "INSERT INTO blocks (
                id,
                type,
                content,
                sort_order,
                page_id,
                parent_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                block.kind.as_str(),
                block.content.as_deref(),
                block.order,
                block.page_id.to_string(),
                block.parent_id.map(|value| value.to_string()),
                now,
            ],
        )?;

        Ok(Block {
            id,
            kind: block.kind,
            content: block.content.clone(),
            order: block.order,
            page_id: block.page_id,
            parent_id: block.parent_id,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_block(&self, id: BlockId, update: &BlockUpdate) -> RepoResult<Block> {
        let changed = self.conn().execute(
            "UPDATE blocks
             SET
                type = COALESCE(?2, type),
                content = COALESCE(?3, content),
                sort_order = COALESCE(?4, sort_order),
                updated_at = ?5
             WHERE id = ?1;",
            params![
                id.to_string(),
                update.kind.map(BlockType::as_str),
                update.content.as_deref(),
                update.order,
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(block_not_found(id));
        }
        load_required_block(self.conn(), id)
    }

    fn delete_block(&self, id: BlockId) -> RepoResult<Block> {
        let block = load_required_block(self.conn(), id)?;
        self.conn()
            .execute("DELETE FROM blocks WHERE id = ?1;", [id.to_string()])?;
        Ok(block)
    }

    fn reorder_blocks(&self, orders: &[BlockOrder]) -> RepoResult<Vec<Block>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn(), TransactionBehavior::Immediate)?;
        for entry in orders {
            let changed = tx.execute(
                "UPDATE blocks
                 SET sort_order = ?2,
                     updated_at = ?3
                 WHERE id = ?1;",
                params![entry.id.to_string(), entry.order, now],
            )?;
            if changed == 0 {
                // Dropping `tx` rolls back the updates already applied.
                return Err(block_not_found(entry.id));
            }
        }
        tx.commit()?;

        orders
            .iter()
            .map(|entry| load_required_block(self.conn(), entry.id))
            .collect()
    }
}

fn block_not_found(id: BlockId) -> RepoError {
    RepoError::NotFound {
        entity: EntityKind::Block,
        id,
    }
}

fn load_required_block(conn: &Connection, id: BlockId) -> RepoResult<Block> {
    let mut stmt = conn.prepare(&format!("{BLOCK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_block_row(row);
    }
    Err(block_not_found(id))
}

fn parse_block_row(row: &Row<'_>) -> RepoResult<Block> {
    let type_text: String = row.get("type")?;
    let kind = BlockType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid block type `{type_text}` in blocks.type"))
    })?;

    Ok(Block {
        id: parse_uuid(row, "id", "blocks")?,
        kind,
        content: row.get("content")?,
        order: row.get("sort_order")?,
        page_id: parse_uuid(row, "page_id", "blocks")?,
        parent_id: parse_optional_uuid(row, "parent_id", "blocks")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
