//! Fixtures shared by the repository tests.

use std::time::Duration;

use chrono::Utc;
use otherproteins_core::{Actor, NewProduct, NewUser, Product, Role};

use crate::pool::{Database, DbConfig};
use crate::retry::RetryPolicy;

/// Fresh migrated in-memory database with a fast retry policy.
pub async fn test_db() -> Database {
    let config = DbConfig::in_memory().retry(RetryPolicy {
        attempts: 5,
        base_delay: Duration::from_millis(5),
    });
    Database::new(config).await.expect("in-memory database")
}

async fn user(db: &Database, email: &str, role: Role) -> Actor {
    let user = db
        .users()
        .create(
            &NewUser {
                email: email.to_string(),
                password_hash: "$argon2id$v=19$test".to_string(),
                first_name: "Test".to_string(),
                last_names: "Erabiltzailea".to_string(),
                phone: None,
                role,
            },
            Utc::now(),
        )
        .await
        .expect("create user");

    Actor {
        user_id: user.id,
        role: user.role,
    }
}

pub async fn customer(db: &Database, email: &str) -> Actor {
    user(db, email, Role::Customer).await
}

pub async fn admin(db: &Database) -> Actor {
    match db.users().find_by_email("admin@otherproteins.eus").await {
        Ok(Some(existing)) => Actor::admin(existing.id),
        _ => user(db, "admin@otherproteins.eus", Role::Admin).await,
    }
}

pub async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
    let admin = admin(db).await;
    db.catalog()
        .create_product(
            &admin,
            &NewProduct {
                name: name.to_string(),
                price_cents,
                stock,
                ..NewProduct::default()
            },
        )
        .await
        .expect("create product")
}
