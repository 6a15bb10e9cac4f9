//! # User Repository
//!
//! Accounts and their password hashes. Hashing itself happens in the
//! server; this layer only stores the PHC string.

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use shopdesk_core::User;

const USER_COLUMNS: &str = "id, username, display_name, role, is_active, created_at";

/// A user row including the stored password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    user: &User,
    password_hash: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(password_hash)
    .bind(user.role)
    .bind(user.is_active)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(&user.username))?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user.
    ///
    /// ## Errors
    /// `UniqueViolation` when the username is taken (case-insensitive).
    pub async fn insert(&self, user: &User, password_hash: &str) -> DbResult<()> {
        debug!(id = %user.id, username = %user.username, "Inserting user");
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user, password_hash).await
    }

    /// Looks a user up for login.
    pub async fn get_credentials(&self, username: &str) -> DbResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {}, password_hash FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY username COLLATE NOCASE",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// All users with their hashes, for backups.
    pub async fn list_credentials(&self) -> DbResult<Vec<UserCredentials>> {
        let rows = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {}, password_hash FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes a user.
    ///
    /// ## Errors
    /// `Conflict` when it would remove the last active admin.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = ?1
              AND (
                  role <> 'admin' OR is_active = 0
                  OR (SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active = 1) > 1
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(_) => Err(DbError::conflict("cannot delete the last admin")),
                None => Err(DbError::not_found("User", id)),
            };
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, now};
    use shopdesk_core::Role;

    fn user(username: &str, role: Role) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: username.to_uppercase(),
            role,
            is_active: true,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_case_insensitive() {
        let db = db().await;
        let repo = db.users();
        let admin = user("admin", Role::Admin);
        repo.insert(&admin, "$argon2id$hash").await.unwrap();

        let creds = repo.get_credentials("ADMIN").await.unwrap().unwrap();
        assert_eq!(creds.user.id, admin.id);
        assert_eq!(creds.user.role, Role::Admin);
        assert_eq!(creds.password_hash, "$argon2id$hash");

        let err = repo.insert(&user("Admin", Role::Cashier), "x").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_deleted() {
        let db = db().await;
        let repo = db.users();
        let admin = user("admin", Role::Admin);
        let cashier = user("maria", Role::Cashier);
        repo.insert(&admin, "h").await.unwrap();
        repo.insert(&cashier, "h").await.unwrap();

        assert!(matches!(
            repo.delete(&admin.id).await.unwrap_err(),
            DbError::Conflict(_)
        ));

        repo.delete(&cashier.id).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
