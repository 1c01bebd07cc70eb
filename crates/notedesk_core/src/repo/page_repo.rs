//! Page repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a page only sets `is_archived`.
//! - Page detail loads blocks ordered by `order` ascending.

use crate::db::now_epoch_ms;
use crate::model::document::DocumentId;
use crate::model::page::{NewPage, Page, PageDetail, PageId, PageUpdate};
use crate::repo::block_repo::BlockRepository;
use crate::repo::{
    bool_to_int, nullable_patch, parse_flag, parse_optional_uuid, parse_uuid, EntityKind,
    RepoError, RepoResult, SqliteStore,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const PAGE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    icon,
    cover_image,
    is_published,
    is_archived,
    user_id,
    document_id,
    created_at,
    updated_at
FROM pages";

/// Repository interface for pages.
pub trait PageRepository {
    /// Loads one page (archived or not) with its ordered blocks.
    fn get_page_detail(&self, id: PageId) -> RepoResult<Option<PageDetail>>;
    fn create_page(&self, page: &NewPage) -> RepoResult<Page>;
    fn update_page(&self, id: PageId, update: &PageUpdate) -> RepoResult<Page>;
    /// Soft-deletes one page.
    fn archive_page(&self, id: PageId) -> RepoResult<Page>;
}

impl PageRepository for SqliteStore<'_> {
    fn get_page_detail(&self, id: PageId) -> RepoResult<Option<PageDetail>> {
        let Some(page) = load_page(self.conn(), id)? else {
            return Ok(None);
        };
        let blocks = self.list_blocks(id)?;
        Ok(Some(PageDetail { page, blocks }))
    }

    fn create_page(&self, page: &NewPage) -> RepoResult<Page> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn().execute(
            "INSERT INTO pages (
                id,
                title,
                content,
                user_id,
                document_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
            params![
                id.to_string(),
                page.title.as_str(),
                page.content.as_deref(),
                page.user_id.to_string(),
                page.document_id.map(|value| value.to_string()),
                now,
            ],
        )?;
        load_required_page(self.conn(), id)
    }

    fn update_page(&self, id: PageId, update: &PageUpdate) -> RepoResult<Page> {
        let content = nullable_patch(&update.content);
        let icon = nullable_patch(&update.icon);
        let cover_image = nullable_patch(&update.cover_image);
        let changed = self.conn().execute(
            "UPDATE pages
             SET
                title = COALESCE(?2, title),
                content = CASE WHEN ?3 = 1 THEN ?4 ELSE content END,
                icon = CASE WHEN ?5 = 1 THEN ?6 ELSE icon END,
                cover_image = CASE WHEN ?7 = 1 THEN ?8 ELSE cover_image END,
                is_published = COALESCE(?9, is_published),
                is_archived = COALESCE(?10, is_archived),
                updated_at = ?11
             WHERE id = ?1;",
            params![
                id.to_string(),
                update.title.as_deref(),
                content.0,
                content.1,
                icon.0,
                icon.1,
                cover_image.0,
                cover_image.1,
                update.is_published.map(bool_to_int),
                update.is_archived.map(bool_to_int),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Page,
                id,
            });
        }
        load_required_page(self.conn(), id)
    }

    fn archive_page(&self, id: PageId) -> RepoResult<Page> {
        self.update_page(
            id,
            &PageUpdate {
                is_archived: Some(true),
                ..PageUpdate::default()
            },
        )
    }
}

/// Visible pages of one document, oldest first.
pub(crate) fn list_document_pages(
    conn: &Connection,
    document_id: DocumentId,
) -> RepoResult<Vec<Page>> {
    let mut stmt = conn.prepare(&format!(
        "{PAGE_SELECT_SQL}
         WHERE document_id = ?1
           AND is_archived = 0
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([document_id.to_string()])?;
    let mut pages = Vec::new();
    while let Some(row) = rows.next()? {
        pages.push(parse_page_row(row)?);
    }
    Ok(pages)
}

fn load_page(conn: &Connection, id: PageId) -> RepoResult<Option<Page>> {
    let mut stmt = conn.prepare(&format!("{PAGE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_page_row(row)?));
    }
    Ok(None)
}

fn load_required_page(conn: &Connection, id: PageId) -> RepoResult<Page> {
    load_page(conn, id)?.ok_or(RepoError::NotFound {
        entity: EntityKind::Page,
        id,
    })
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<Page> {
    Ok(Page {
        id: parse_uuid(row, "id", "pages")?,
        title: row.get("title")?,
        content: row.get("content")?,
        icon: row.get("icon")?,
        cover_image: row.get("cover_image")?,
        is_published: parse_flag(row, "is_published", "pages")?,
        is_archived: parse_flag(row, "is_archived", "pages")?,
        user_id: parse_uuid(row, "user_id", "pages")?,
        document_id: parse_optional_uuid(row, "document_id", "pages")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
