//! # Seed Data Generator
//!
//! Populates a local data file with demo catalog, customers and rate
//! history, then records a sample sale and prints the day's summary.
//!
//! ## Usage
//! ```bash
//! # Seed the default data file
//! cargo run -p pointy-store --bin seed
//!
//! # Specify the data file
//! cargo run -p pointy-store --bin seed -- --data ./pointy_dev.json
//! ```

use std::env;

use chrono::Utc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pointy_core::{
    Cart, Customer, PaymentMethod, Product, ReportWindow, SellingMode,
};
use pointy_store::{LocalGateway, PosService, StoreConfig};

/// Demo catalog: (name, category, price USD, cost USD, stock).
const CATALOG: &[(&str, &str, f64, f64, f64)] = &[
    ("Café con Leche", "Bebidas", 1.50, 0.45, 50.0),
    ("Café Negro", "Bebidas", 1.00, 0.30, 50.0),
    ("Jugo de Parchita", "Bebidas", 2.00, 0.70, 20.0),
    ("Malta", "Bebidas", 1.20, 0.60, 36.0),
    ("Agua Mineral", "Bebidas", 0.80, 0.35, 48.0),
    ("Empanada de Queso", "Comida", 1.50, 0.55, 30.0),
    ("Empanada de Carne", "Comida", 1.80, 0.70, 30.0),
    ("Cachito de Jamón", "Comida", 2.00, 0.80, 24.0),
    ("Pastelito Andino", "Comida", 1.60, 0.60, 24.0),
    ("Tequeños (6 und)", "Comida", 3.50, 1.40, 15.0),
    ("Torta de Chocolate", "Dulces", 2.50, 0.90, 12.0),
    ("Quesillo", "Dulces", 2.20, 0.75, 10.0),
    ("Golfeado", "Dulces", 1.80, 0.65, 16.0),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ana Pérez", "0414-5550101"),
    ("Luis Rodríguez", "0424-5550202"),
    ("María González", "0412-5550303"),
];

const DEMO_RATE: f64 = 47.90;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut data_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data" | "-d" => {
                if i + 1 < args.len() {
                    data_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pointy POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --data <PATH>  Data file path (default: platform data dir)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let path = match data_path {
        Some(p) => p.into(),
        None => StoreConfig::load_or_default(None).data_path()?,
    };

    println!("🌱 Pointy POS Seed Data Generator");
    println!("=================================");
    println!("Data file: {}", path.display());
    println!();

    let gateway = LocalGateway::open(&path)?;
    let service = PosService::new(gateway);
    service.hydrate().await?;

    let existing = service.with_state(|s| s.products.len()).await;
    if existing > 0 {
        println!("⚠ Data file already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the data file to regenerate.");
        return Ok(());
    }

    println!("Seeding exchange rate ({DEMO_RATE} Bs/USD)...");
    service.update_exchange_rate(DEMO_RATE).await?;

    println!("Seeding {} products...", CATALOG.len());
    for (name, category, price, cost, stock) in CATALOG {
        service.add_category(category).await?;
        service
            .upsert_product(Product {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                category: category.to_string(),
                price: *price,
                cost_price: *cost,
                stock: *stock,
                selling_mode: SellingMode::Simple,
                units_per_package: None,
                price_per_unit: None,
                measurement_unit: None,
                description: None,
                image: None,
            })
            .await?;
    }

    println!("Seeding {} customers...", CUSTOMERS.len());
    for (name, phone) in CUSTOMERS {
        service
            .upsert_customer(Customer {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                phone: phone.to_string(),
                email: None,
                balance: 0.0,
                created_at: Utc::now(),
            })
            .await?;
    }

    // A sample cash sale so the report has something to show.
    println!("Recording a sample sale...");
    let (coffee, empanada) = service
        .with_state(|s| {
            let mut products = s.products.values();
            (
                products.next().cloned(),
                products.next().cloned(),
            )
        })
        .await;
    let mut cart = Cart::new();
    if let Some(p) = coffee {
        cart.add(&p, 2.0);
    }
    if let Some(p) = empanada {
        cart.add(&p, 1.0);
    }
    if !cart.is_empty() {
        let sale = service.record_sale(&cart, PaymentMethod::Cash, None).await?;
        println!(
            "  Sale {}: {:.2} USD / {:.2} Bs",
            sale.id,
            sale.total,
            sale.total_bs()
        );
    }

    let summary = service.summarize(ReportWindow::Today).await;
    println!();
    println!("Today's summary");
    println!("  Sales:        {:.2} Bs ({} sales)", summary.total_sales_bs, summary.sale_count);
    println!("  Est. profit:  {:.2} USD", summary.estimated_profit_usd);
    println!("  Vault cash:   {:.2} Bs", summary.vault_cash_bs);
    println!("  Bank balance: {:.2} Bs", summary.bank_balance_bs);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
