//! Document repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the per-user document tree.
//! - Own listing filters and ordering for documents.
//!
//! # Invariants
//! - Root listings exclude archived rows and rows with a parent, newest first.
//! - Detail children/pages exclude archived rows, oldest first.
//! - Deleting a document only sets `is_archived`.

use crate::db::now_epoch_ms;
use crate::model::document::{Document, DocumentDetail, DocumentId, DocumentUpdate, NewDocument};
use crate::model::user::UserId;
use crate::repo::page_repo::list_document_pages;
use crate::repo::{
    bool_to_int, nullable_patch, parse_flag, parse_optional_uuid, parse_uuid, EntityKind,
    RepoError, RepoResult, SqliteStore,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    icon,
    cover_image,
    is_published,
    is_archived,
    user_id,
    parent_document_id,
    created_at,
    updated_at
FROM documents";

/// Repository interface for the document tree.
pub trait DocumentRepository {
    /// Lists visible root documents of one user, newest first.
    fn list_root_documents(&self, user_id: UserId) -> RepoResult<Vec<Document>>;
    /// Loads one document regardless of archive state.
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    /// Loads one document with its visible children and pages.
    fn get_document_detail(&self, id: DocumentId) -> RepoResult<Option<DocumentDetail>>;
    fn create_document(&self, document: &NewDocument) -> RepoResult<Document>;
    fn update_document(&self, id: DocumentId, update: &DocumentUpdate) -> RepoResult<Document>;
    /// Soft-deletes one document.
    fn archive_document(&self, id: DocumentId) -> RepoResult<Document>;
}

impl DocumentRepository for SqliteStore<'_> {
    fn list_root_documents(&self, user_id: UserId) -> RepoResult<Vec<Document>> {
        query_documents(
            self.conn(),
            &format!(
                "{DOCUMENT_SELECT_SQL}
                 WHERE user_id = ?1
                   AND is_archived = 0
                   AND parent_document_id IS NULL
                 ORDER BY created_at DESC, rowid DESC;"
            ),
            user_id,
        )
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn get_document_detail(&self, id: DocumentId) -> RepoResult<Option<DocumentDetail>> {
        let Some(document) = self.get_document(id)? else {
            return Ok(None);
        };
        let children = query_documents(
            self.conn(),
            &format!(
                "{DOCUMENT_SELECT_SQL}
                 WHERE parent_document_id = ?1
                   AND is_archived = 0
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            id,
        )?;
        let pages = list_document_pages(self.conn(), id)?;
        Ok(Some(DocumentDetail {
            document,
            children,
            pages,
        }))
    }

    fn create_document(&self, document: &NewDocument) -> RepoResult<Document> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn().execute(
            "INSERT INTO documents (
                id,
                title,
                icon,
                cover_image,
                user_id,
                parent_document_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                document.title.as_str(),
                document.icon.as_deref(),
                document.cover_image.as_deref(),
                document.user_id.to_string(),
                document.parent_document_id.map(|value| value.to_string()),
                now,
            ],
        )?;

        Ok(Document {
            id,
            title: document.title.clone(),
            content: None,
            icon: document.icon.clone(),
            cover_image: document.cover_image.clone(),
            is_published: false,
            is_archived: false,
            user_id: document.user_id,
            parent_document_id: document.parent_document_id,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_document(&self, id: DocumentId, update: &DocumentUpdate) -> RepoResult<Document> {
        let content = nullable_patch(&update.content);
        let icon = nullable_patch(&update.icon);
        let cover_image = nullable_patch(&update.cover_image);
        let changed = self.conn().execute(
            "UPDATE documents
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
                entity: EntityKind::Document,
                id,
            });
        }

        self.get_document(id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::Document,
            id,
        })
    }

    fn archive_document(&self, id: DocumentId) -> RepoResult<Document> {
        self.update_document(
            id,
            &DocumentUpdate {
                is_archived: Some(true),
                ..DocumentUpdate::default()
            },
        )
    }
}

fn query_documents(conn: &Connection, sql: &str, key: Uuid) -> RepoResult<Vec<Document>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key.to_string()])?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        documents.push(parse_document_row(row)?);
    }
    Ok(documents)
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    Ok(Document {
        id: parse_uuid(row, "id", "documents")?,
        title: row.get("title")?,
        content: row.get("content")?,
        icon: row.get("icon")?,
        cover_image: row.get("cover_image")?,
        is_published: parse_flag(row, "is_published", "documents")?,
        is_archived: parse_flag(row, "is_archived", "documents")?,
        user_id: parse_uuid(row, "user_id", "documents")?,
        parent_document_id: parse_optional_uuid(row, "parent_document_id", "documents")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
