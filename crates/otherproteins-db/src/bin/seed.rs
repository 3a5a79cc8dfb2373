//! # Store Bootstrap
//!
//! Prepares a database for first use.
//!
//! ## Usage
//! ```bash
//! # Categories + bootstrap admin
//! OTHERPROTEINS_ADMIN_PASSWORD=... cargo run -p otherproteins-db --bin seed
//!
//! # Also insert the showcase products
//! cargo run -p otherproteins-db --bin seed -- --demo
//!
//! # Specify database path
//! cargo run -p otherproteins-db --bin seed -- --db ./data/otherproteins.db
//! ```
//!
//! ## Environment
//! - `OTHERPROTEINS_DATABASE_PATH` (fallback `SQLITE_PATH`): database file
//! - `OTHERPROTEINS_ADMIN_EMAIL`: admin login (default `admin@otherproteins.eus`)
//! - `OTHERPROTEINS_ADMIN_PASSWORD`: required, at least 8 characters
//!
//! Every step is idempotent; running the seed twice changes nothing.

use chrono::Utc;
use std::env;

use otherproteins_core::validation::validate_password;
use otherproteins_core::{Actor, NewProduct, NewUser, ProductFilter, Role};
use otherproteins_db::credentials::hash_password;
use otherproteins_db::{Database, DbConfig};

/// Default categories: (name, description)
const CATEGORIES: &[(&str, &str)] = &[
    ("Proteina", "Proteina hautsak eta batidoak"),
    ("Kreatina", "Kreatina monohidratoa eta nahasketak"),
    ("Pre-entrenamendua", "Entrenamendu aurreko osagarriak"),
    ("Barritak", "Proteina eta energia barritak"),
];

/// Showcase products: (name, category, price cents, stock, description)
const DEMO_PRODUCTS: &[(&str, &str, i64, i64, &str)] = &[
    ("Whey Protein Isolate", "Proteina", 5500, 15, "Proteina isolatua, 2 kg"),
    ("Caseina Nocturna", "Proteina", 4550, 10, "Askapen geldoko kaseina, 1 kg"),
    ("Barritas Energéticas", "Barritak", 2500, 30, "12 barritako kaxa"),
    ("Creatina Monohidratada", "Kreatina", 2299, 25, "Kreatina monohidratoa, 500 g"),
    ("Pre-entreno Intenso", "Pre-entrenamendua", 3875, 0, "Kafeina eta beta-alanina"),
];

const DEFAULT_ADMIN_EMAIL: &str = "admin@otherproteins.eus";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut demo = false;
    let mut db_path = env::var("OTHERPROTEINS_DATABASE_PATH")
        .or_else(|_| env::var("SQLITE_PATH"))
        .unwrap_or_else(|_| String::from("./otherproteins.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--demo" => demo = true,
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("OtherProteins Seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./otherproteins.db)");
                println!("      --demo         Insert the showcase products");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let admin_email =
        env::var("OTHERPROTEINS_ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
    let admin_password = env::var("OTHERPROTEINS_ADMIN_PASSWORD")
        .map_err(|_| "OTHERPROTEINS_ADMIN_PASSWORD must be set")?;
    validate_password(&admin_password)?;

    println!("🌱 OtherProteins Seed");
    println!("=====================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Bootstrap admin
    let admin = db
        .users()
        .ensure_admin(
            &NewUser {
                email: admin_email,
                password_hash: hash_password(&admin_password)?,
                first_name: "Admin".to_string(),
                last_names: "OtherProteins".to_string(),
                phone: None,
                role: Role::Admin,
            },
            Utc::now(),
        )
        .await?;
    println!("✓ Admin account: {}", admin.email);
    let actor = Actor::admin(admin.id);

    // Categories
    for (name, description) in CATEGORIES {
        if db.catalog().find_category_by_name(name).await?.is_some() {
            println!("  Category '{}' already present", name);
            continue;
        }
        db.catalog()
            .create_category(&actor, name, Some(description))
            .await?;
        println!("  Created category '{}'", name);
    }
    println!("✓ Categories ready");

    if demo {
        println!();
        println!("Inserting showcase products...");

        for (name, category, price_cents, stock, description) in DEMO_PRODUCTS {
            let existing = db
                .catalog()
                .list_products(&ProductFilter {
                    query: Some(name.to_string()),
                    ..ProductFilter::default()
                })
                .await?;
            if existing.iter().any(|p| p.name == *name) {
                println!("  '{}' already present", name);
                continue;
            }

            let category_id = db
                .catalog()
                .find_category_by_name(category)
                .await?
                .map(|c| c.id);

            db.catalog()
                .create_product(
                    &actor,
                    &NewProduct {
                        name: name.to_string(),
                        description: description.to_string(),
                        price_cents: *price_cents,
                        stock: *stock,
                        category_id,
                        ..NewProduct::default()
                    },
                )
                .await?;
            println!("  Created '{}' ({} units)", name, stock);
        }
        println!("✓ Showcase products ready");
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
