//! # Seed Data Generator
//!
//! Populates a development database with staff, sessions, stock batches,
//! one pending prescription and one pending supply order.
//!
//! ## Usage
//! ```bash
//! # Default database path
//! cargo run -p rxpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p rxpos-db --bin seed -- --db ./data/rxpos.db
//! ```
//!
//! Session tokens are printed so the API can be exercised with curl:
//! `Authorization: Bearer dev-pharmacist`.

use chrono::{Duration, Months, Utc};
use rxpos_core::{Money, Role};
use rxpos_db::repository::inventory::NewBatch;
use rxpos_db::repository::prescription::{NewPrescription, NewPrescriptionItem};
use rxpos_db::repository::supply_order::{NewSupplyOrder, NewSupplyOrderItem};
use rxpos_db::{Database, DbConfig};
use std::env;

/// (name, generic, category, price in minor units)
const MEDICINES: &[(&str, &str, &str, i64)] = &[
    ("Panadol 500mg", "Paracetamol", "Analgesic", 1000),
    ("Brufen 400mg", "Ibuprofen", "Analgesic", 1500),
    ("Amoxil 500mg", "Amoxicillin", "Antibiotic", 2500),
    ("Flagyl 400mg", "Metronidazole", "Antibiotic", 1800),
    ("Glucophage 500mg", "Metformin", "Antidiabetic", 2200),
    ("Norvasc 5mg", "Amlodipine", "Antihypertensive", 3000),
    ("Zyrtec 10mg", "Cetirizine", "Antihistamine", 1200),
    ("Omez 20mg", "Omeprazole", "Antacid", 1600),
];

/// (username, full name, role)
const STAFF: &[(&str, &str, Role)] = &[
    ("admin", "Store Admin", Role::Admin),
    ("pharmacist", "Duty Pharmacist", Role::Pharmacist),
    ("cashier", "Front Till", Role::Cashier),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./rxpos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Rx POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rxpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Rx POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut uow = db.begin().await?;

    if uow.inventory().total_units().await? > 0 {
        println!("⚠ Database already has stock");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let expires = Utc::now() + Duration::days(30);
    let mut pharmacist_id = None;
    for (username, full_name, role) in STAFF {
        let id = uow.sessions().insert_user(username, full_name, *role).await?;
        let token = format!("dev-{username}");
        uow.sessions().create(&token, id, expires).await?;
        if *role == Role::Pharmacist {
            pharmacist_id = Some(id);
        }
        println!("  {:<12} id={:<3} token={}", username, id, token);
    }

    let today = Utc::now().date_naive();
    let expiry = today
        .checked_add_months(Months::new(18))
        .unwrap_or(today);

    for (idx, (name, generic, category, price)) in MEDICINES.iter().enumerate() {
        let batch = NewBatch {
            name: name.to_string(),
            generic_name: Some(generic.to_string()),
            category: Some(category.to_string()),
            batch_number: format!("DEV-{:03}", idx + 1),
            quantity: 100,
            price: Money::from_minor(*price),
            expiry_date: expiry,
            created_by: pharmacist_id,
        };
        let created = uow.inventory().insert(&batch).await?;
        println!(
            "  batch id={:<3} {:<18} {} @ {}",
            created.id, created.name, created.quantity, created.price
        );
    }

    let rx_id = uow
        .prescriptions()
        .insert(&NewPrescription {
            patient_name: "Jane Wanjiru".to_string(),
            patient_phone: Some("0712345678".to_string()),
            doctor_name: Some("Dr. Otieno".to_string()),
            notes: None,
            created_by: pharmacist_id,
            items: vec![
                NewPrescriptionItem {
                    medicine_name: "Amoxil 500mg".to_string(),
                    dosage: Some("500mg".to_string()),
                    instructions: Some("1 capsule three times daily".to_string()),
                    quantity_prescribed: 21,
                },
                NewPrescriptionItem {
                    medicine_name: "Panadol 500mg".to_string(),
                    dosage: Some("500mg".to_string()),
                    instructions: Some("As needed for pain".to_string()),
                    quantity_prescribed: 10,
                },
            ],
        })
        .await?;
    println!("  prescription id={} (pending)", rx_id);

    let order_id = uow
        .supply_orders()
        .insert(&NewSupplyOrder {
            supplier_name: "MedSupply Ltd".to_string(),
            notes: Some("Monthly restock".to_string()),
            created_by: pharmacist_id,
            items: vec![NewSupplyOrderItem {
                medicine_name: "Ventolin Inhaler".to_string(),
                generic_name: Some("Salbutamol".to_string()),
                category: Some("Respiratory".to_string()),
                quantity_ordered: 24,
                unit_cost: Money::from_minor(4500),
            }],
        })
        .await?;
    println!("  supply order id={} (pending)", order_id);

    uow.commit().await?;

    println!();
    println!("✓ Seed complete");

    db.close().await;
    Ok(())
}
