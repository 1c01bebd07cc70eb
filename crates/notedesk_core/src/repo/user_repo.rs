//! User repository contract and SQLite implementation.

use crate::db::now_epoch_ms;
use crate::model::user::{NewUser, User};
use crate::repo::{parse_uuid, RepoResult, SqliteStore};
use rusqlite::{params, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    clerk_id,
    email,
    first_name,
    last_name,
    image_url,
    created_at,
    updated_at
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    /// Loads the account linked to an identity-provider subject id.
    fn find_user_by_clerk_id(&self, clerk_id: &str) -> RepoResult<Option<User>>;
    /// Inserts one account. Duplicate `clerk_id` surfaces as a DB error.
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
}

impl UserRepository for SqliteStore<'_> {
    fn find_user_by_clerk_id(&self, clerk_id: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{USER_SELECT_SQL} WHERE clerk_id = ?1;"))?;
        let mut rows = stmt.query([clerk_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn().execute(
            "INSERT INTO users (
                id,
                clerk_id,
                email,
                first_name,
                last_name,
                image_url,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                user.clerk_id.as_str(),
                user.email.as_str(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.image_url.as_deref(),
                now,
            ],
        )?;

        Ok(User {
            id,
            clerk_id: user.clerk_id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            image_url: user.image_url.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: parse_uuid(row, "id", "users")?,
        clerk_id: row.get("clerk_id")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        image_url: row.get("image_url")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
