//! Document routes: `POST /documents`, `PATCH /documents/:id`, `DELETE /documents/:id`.

use crate::api::{respond, ApiError, ApiResponse};
use crate::model::document::{Document, DocumentId, DocumentUpdate, NewDocument};
use crate::model::user::User;
use crate::repo::Store;
use crate::service::data_access::DataAccess;
use log::info;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct CreateDocumentBody {
    title: Option<Value>,
}

/// Absent fields stay unchanged. `null` clears `content`, `icon` and
/// `coverImage`; on `title` and `isPublished` it is treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDocumentBody {
    title: Option<String>,
    #[serde(default, deserialize_with = "present_field")]
    content: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_field")]
    icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_field")]
    cover_image: Option<Option<String>>,
    is_published: Option<bool>,
}

/// Marks a field as present even when its value is `null`.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateDocumentBody> for DocumentUpdate {
    fn from(body: UpdateDocumentBody) -> Self {
        Self {
            title: body.title,
            content: body.content,
            icon: body.icon,
            cover_image: body.cover_image,
            is_published: body.is_published,
            is_archived: None,
        }
    }
}

/// `POST /documents`: creates a root document titled with the trimmed `title`.
pub fn create_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    body: &str,
) -> ApiResponse {
    respond("POST /documents", try_create_document(data, identity, body))
}

/// `PATCH /documents/:id`: applies a partial update to a caller-owned document.
pub fn update_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    document_id: &str,
    body: &str,
) -> ApiResponse {
    respond(
        "PATCH /documents/:id",
        try_update_document(data, identity, document_id, body),
    )
}

/// `DELETE /documents/:id`: archives a caller-owned document.
pub fn delete_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    document_id: &str,
) -> ApiResponse {
    respond(
        "DELETE /documents/:id",
        try_delete_document(data, identity, document_id),
    )
}

fn try_create_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    body: &str,
) -> Result<ApiResponse, ApiError> {
    let user = require_user(data, identity)?;

    let body: CreateDocumentBody = serde_json::from_str(body)
        .map_err(|_| ApiError::Validation("Invalid request body".to_string()))?;
    let title = body
        .title
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ApiError::Validation("Title is required".to_string()))?;

    let document = data.create_document(&NewDocument::new(title, user.id))?;
    info!(
        "event=document_create module=api status=ok document_id={}",
        document.id
    );
    ApiResponse::json(201, &document)
}

fn try_update_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    document_id: &str,
    body: &str,
) -> Result<ApiResponse, ApiError> {
    let user = require_user(data, identity)?;
    let document = require_owned_document(data, &user, document_id)?;

    let body: UpdateDocumentBody = serde_json::from_str(body)
        .map_err(|_| ApiError::Validation("Invalid request body".to_string()))?;
    let updated = data.update_document(document.id, &body.into())?;
    ApiResponse::json(200, &updated)
}

fn try_delete_document<S: Store>(
    data: &DataAccess<S>,
    identity: Option<&str>,
    document_id: &str,
) -> Result<ApiResponse, ApiError> {
    let user = require_user(data, identity)?;
    let document = require_owned_document(data, &user, document_id)?;

    data.delete_document(document.id)?;
    info!(
        "event=document_archive module=api status=ok document_id={}",
        document.id
    );
    ApiResponse::json(200, &json!({ "success": true }))
}

fn require_user<S: Store>(data: &DataAccess<S>, identity: Option<&str>) -> Result<User, ApiError> {
    let clerk_id = identity
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthenticated)?;
    data.get_user_by_clerk_id(clerk_id)?
        .ok_or(ApiError::UserNotFound)
}

fn require_owned_document<S: Store>(
    data: &DataAccess<S>,
    user: &User,
    raw_id: &str,
) -> Result<Document, ApiError> {
    let id: DocumentId = Uuid::parse_str(raw_id).map_err(|_| ApiError::DocumentNotFound)?;
    let detail = data
        .get_document_by_id(id)?
        .ok_or(ApiError::DocumentNotFound)?;
    if detail.document.user_id != user.id {
        return Err(ApiError::Forbidden);
    }
    Ok(detail.document)
}
