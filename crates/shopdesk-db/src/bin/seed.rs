//! # Demo Data Seeder
//!
//! Fills an empty database with a small shop: a catalog, a few customers
//! and several weeks of opened, traded and closed operational days, so the
//! reports and the forecast have history to work with.
//!
//! ## Usage
//! ```bash
//! cargo run -p shopdesk-db --bin seed
//! cargo run -p shopdesk-db --bin seed -- --days 42 --db ./data/shopdesk.db
//! ```
//!
//! The generated data is deterministic for a given start date. The admin
//! account is not created here: the server creates it on first start.

use std::env;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use shopdesk_core::accounting::{close_day, open_day, summarize_day, CashCount, OpenDayRequest};
use shopdesk_core::catalog::{build_customer, build_product, CustomerInput, NewProduct};
use shopdesk_core::sale::{prepare_sale, LineRequest, PaymentRequest, SaleContext, SaleRequest};
use shopdesk_core::{Customer, DenominationCount, Product};
use shopdesk_db::{Database, DbConfig};
use uuid::Uuid;

/// (category, name, price cents, unit)
const CATALOG: &[(&str, &str, i64, &str)] = &[
    ("Beverages", "Coffee Beans 250g", 1250, "bag"),
    ("Beverages", "Green Tea", 450, "box"),
    ("Beverages", "Orange Juice 1L", 325, "bottle"),
    ("Beverages", "Sparkling Water", 150, "bottle"),
    ("Beverages", "Cola 2L", 275, "bottle"),
    ("Bakery", "Sourdough Loaf", 550, "unit"),
    ("Bakery", "Croissant", 225, "unit"),
    ("Bakery", "Carrot Cake Slice", 375, "unit"),
    ("Bakery", "Bagel", 150, "unit"),
    ("Dairy", "Whole Milk 1L", 189, "bottle"),
    ("Dairy", "Greek Yogurt", 299, "cup"),
    ("Dairy", "Cheddar 200g", 645, "pack"),
    ("Dairy", "Butter 250g", 425, "pack"),
    ("Pantry", "Pasta 500g", 210, "pack"),
    ("Pantry", "Olive Oil 500ml", 899, "bottle"),
    ("Pantry", "Basmati Rice 1kg", 375, "bag"),
    ("Pantry", "Tomato Sauce", 245, "jar"),
    ("Pantry", "Honey 350g", 675, "jar"),
    ("Household", "Dish Soap", 315, "bottle"),
    ("Household", "Paper Towels", 499, "pack"),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ana Castillo", "ana.castillo@example.com"),
    ("Bruno Lima", "bruno.lima@example.com"),
    ("Corner Cafe", "orders@cornercafe.example.com"),
    ("Dana Whitfield", "dana.w@example.com"),
];

const OPENING_CASH_CENTS: i64 = 10_000;

struct Args {
    db_path: String,
    days: i64,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        db_path: String::from("./data/shopdesk.db"),
        days: 28,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    parsed.db_path = path.clone();
                    i += 1;
                }
            }
            "--days" => {
                if let Some(days) = args.get(i + 1) {
                    parsed.days = days.parse().unwrap_or(28).clamp(1, 365);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("ShopDesk demo data seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file (default: ./data/shopdesk.db)");
                println!("      --days <N>     Days of trading history (default: 28)");
                println!("  -h, --help         Show this help message");
                return None;
            }
            _ => {}
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args() else {
        return Ok(());
    };

    println!("ShopDesk demo data seeder");
    println!("Database: {}", args.db_path);

    let db = Database::new(DbConfig::new(&args.db_path)).await?;

    let existing = db.products().count().await? + db.sales().count().await?;
    if existing > 0 {
        println!("Database already has data, nothing to do.");
        println!("Delete the database file to reseed.");
        return Ok(());
    }

    let products = seed_catalog(&db).await?;
    let customers = seed_customers(&db).await?;
    println!("Catalog: {} products, {} customers", products.len(), customers.len());

    let today = Utc::now().date_naive();
    let first_day = today - Duration::days(args.days);
    let mut sales_total = 0usize;

    for offset in 0..args.days {
        let day = first_day + Duration::days(offset);
        sales_total += trade_one_day(&db, day, offset, &customers, today).await?;
    }

    println!(
        "History: {} days, {} sales, last closed day {}",
        args.days,
        sales_total,
        today - Duration::days(1)
    );
    println!("Seed complete.");
    Ok(())
}

async fn seed_catalog(db: &Database) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    let now = Utc::now();
    let mut products = Vec::with_capacity(CATALOG.len());

    for (i, (category, name, price_cents, unit)) in CATALOG.iter().enumerate() {
        // Cost between 55% and 75% of the price.
        let cost_pct = 55 + (i as i64 * 7) % 21;
        let product = build_product(
            NewProduct {
                name: name.to_string(),
                category: category.to_string(),
                price_cents: *price_cents,
                cost_price_cents: price_cents * cost_pct / 100,
                stock: 120 + (i as i64 * 37) % 160,
                unit: unit.to_string(),
                image: None,
                description: None,
            },
            Uuid::new_v4().to_string(),
            now,
        )?;
        db.products().insert(&product).await?;
        products.push(product);
    }

    Ok(products)
}

async fn seed_customers(db: &Database) -> Result<Vec<Customer>, Box<dyn std::error::Error>> {
    let now = Utc::now();
    let mut customers = Vec::with_capacity(CUSTOMERS.len());

    for (name, email) in CUSTOMERS {
        let customer = build_customer(
            CustomerInput {
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: None,
                address: None,
            },
            Uuid::new_v4().to_string(),
            now,
        )?;
        db.customers().insert(&customer).await?;
        customers.push(customer);
    }

    Ok(customers)
}

/// Opens `day`, rings up a weekday-shaped number of sales, and closes it
/// with a drawer that matches the expected cash. Returns the sales count.
async fn trade_one_day(
    db: &Database,
    day: NaiveDate,
    offset: i64,
    customers: &[Customer],
    today: NaiveDate,
) -> Result<usize, Box<dyn std::error::Error>> {
    let now = Utc::now();
    let accounting = db.accounting().get(today).await?;
    let opened = open_day(
        &accounting,
        &OpenDayRequest {
            operational_date: Some(day),
            opening_cash_cents: OPENING_CASH_CENTS,
        },
        "seed",
        today,
        now,
    )?;
    db.accounting().open_day(&opened).await?;

    // Busier towards the weekend, with a slow upward drift.
    let weekday = day.weekday().num_days_from_monday() as i64;
    let count = 4 + weekday + offset / 7;

    let mut recorded = 0;
    for n in 0..count {
        let catalog = db.products().list(Default::default()).await?;
        let seed = (offset * 31 + n * 17) as usize;
        let lines: Vec<LineRequest> = (0..1 + seed % 3)
            .map(|k| LineRequest {
                product_id: catalog[(seed + k * 7) % catalog.len()].id.clone(),
                quantity: 1 + ((seed + k) % 3) as i64,
            })
            .collect();

        let (payment, customer) = match seed % 10 {
            0 => (
                PaymentRequest::Credit { due_date: None },
                Some(&customers[seed % customers.len()]),
            ),
            1 | 2 | 3 => (PaymentRequest::Card { reference: None }, None),
            4 => (PaymentRequest::Transfer { reference: None }, None),
            _ => (PaymentRequest::Cash { tendered_cents: 100_000 }, None),
        };

        let request = SaleRequest {
            items: lines,
            payment,
            customer_id: customer.map(|c| c.id.clone()),
        };
        let prepared = prepare_sale(
            &request,
            &catalog,
            &opened,
            customer,
            &Default::default(),
            SaleContext {
                sale_id: Uuid::new_v4().to_string(),
                invoice_id: Uuid::new_v4().to_string(),
                cashier_id: "seed".to_string(),
                now,
            },
        );

        // Sold out lines are simply skipped.
        if let Ok(prepared) = prepared {
            db.sales().record(prepared).await?;
            recorded += 1;
        }
    }

    db.accounting()
        .close_day(day, |sales, payments| -> Result<_, Box<dyn std::error::Error>> {
            let summary = summarize_day(day, opened.opening_cash_cents, sales, payments);

            let expected = summary.expected_cash_cents;
            let count = CashCount::new(vec![
                DenominationCount {
                    denomination_cents: 2_000,
                    count: expected / 2_000,
                },
                DenominationCount {
                    denomination_cents: 1,
                    count: expected % 2_000,
                },
            ])?;
            let (_, closure) = close_day(&opened, &summary, count, "seed", None, now)?;
            Ok(closure)
        })
        .await?;

    Ok(recorded)
}
