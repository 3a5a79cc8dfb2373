//! # User Repository
//!
//! Accounts and roles. Emails are unique case-insensitively
//! (`COLLATE NOCASE` on the column).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use otherproteins_core::validation::{validate_email, validate_person_name, validate_phone};
use otherproteins_core::{CoreError, NewUser, Role, User};

use crate::error::{DbError, DbResult};

macro_rules! user_select {
    () => {
        "SELECT id, email, password_hash, first_name, last_names, phone, role, created_at FROM users"
    };
}

/// Repository for account operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Errors
    /// - `Validation` for a malformed email, name or phone
    /// - `UniqueViolation { field: "email" }` if the email is taken
    pub async fn create(&self, user: &NewUser, now: DateTime<Utc>) -> DbResult<User> {
        validate_email(&user.email)?;
        validate_person_name("first_name", &user.first_name)?;
        validate_person_name("last_names", &user.last_names)?;
        if let Some(phone) = &user.phone {
            validate_phone(phone)?;
        }

        let email = user.email.trim().to_lowercase();
        debug!(email = %email, role = user.role.as_str(), "Creating user");

        let created = sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (email, password_hash, first_name, last_names, phone, role, created_at) ",
            "VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ",
            "RETURNING id, email, password_hash, first_name, last_names, phone, role, created_at"
        ))
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.first_name.trim())
        .bind(user.last_names.trim())
        .bind(&user.phone)
        .bind(user.role)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate("email", &email))?;

        info!(user_id = created.id, role = created.role.as_str(), "User created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>(concat!(user_select!(), " WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Erabiltzailea",
                    id,
                }
                .into()
            })
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(user_select!(), " WHERE email = ?1"))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Makes sure `account` exists with the admin role.
    ///
    /// Used by the seed binary for the bootstrap admin. An existing account
    /// with that email is promoted; its password is left untouched.
    pub async fn ensure_admin(&self, account: &NewUser, now: DateTime<Utc>) -> DbResult<User> {
        if let Some(existing) = self.find_by_email(&account.email).await? {
            if existing.role == Role::Admin {
                debug!(user_id = existing.id, "Admin account already present");
                return Ok(existing);
            }

            sqlx::query("UPDATE users SET role = ?2 WHERE id = ?1")
                .bind(existing.id)
                .bind(Role::Admin)
                .execute(&self.pool)
                .await?;

            info!(user_id = existing.id, "User promoted to admin");
            return self.get_by_id(existing.id).await;
        }

        let admin = NewUser {
            role: Role::Admin,
            ..account.clone()
        };
        self.create(&admin, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$hash".to_string(),
            first_name: "Miren".to_string(),
            last_names: "Agirre".to_string(),
            phone: Some("+34 943 000 000".to_string()),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = test_db().await;
        let created = db
            .users()
            .create(&new_user("Miren@Example.eus"), Utc::now())
            .await
            .unwrap();

        assert_eq!(created.email, "miren@example.eus");
        assert_eq!(created.role, Role::Customer);

        let found = db.users().find_by_email("miren@example.eus").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
        assert_eq!(db.users().get_by_id(created.id).await.unwrap().first_name, "Miren");
    }

    #[tokio::test]
    async fn test_duplicate_email_case_insensitive() {
        let db = test_db().await;
        db.users()
            .create(&new_user("miren@example.eus"), Utc::now())
            .await
            .unwrap();

        let err = db
            .users()
            .create(&new_user("MIREN@example.eus"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = test_db().await;
        let err = db
            .users()
            .create(&new_user("not-an-email"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err.as_rejection(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_then_promotes() {
        let db = test_db().await;

        let admin = db
            .users()
            .ensure_admin(&new_user("admin@gmail.com"), Utc::now())
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);

        let again = db
            .users()
            .ensure_admin(&new_user("admin@gmail.com"), Utc::now())
            .await
            .unwrap();
        assert_eq!(again.id, admin.id);

        let customer = db
            .users()
            .create(&new_user("jon@example.eus"), Utc::now())
            .await
            .unwrap();
        let promoted = db
            .users()
            .ensure_admin(&new_user("jon@example.eus"), Utc::now())
            .await
            .unwrap();
        assert_eq!(promoted.id, customer.id);
        assert_eq!(promoted.role, Role::Admin);
    }
}
