//! # Seed Data Generator
//!
//! Populates a back-office database with a tariff, a tool catalogue and a
//! set of clients for development.
//!
//! ## Usage
//! ```bash
//! # Default: 40 tools, 25 clients, into the configured database
//! cargo run -p toolshed-engine --bin seed
//!
//! # Custom amounts and database path
//! cargo run -p toolshed-engine --bin seed -- --tools 100 --clients 60 --db ./data/toolshed.db
//! ```
//!
//! Every stocked tool gets one INCOME kardex entry, recorded as the
//! `system` user. Nothing is written if the database already has tools.

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use toolshed_core::validation::rut_verifier;
use toolshed_core::{Money, NewClient, NewTool, TariffValues, SYSTEM_USER};
use toolshed_engine::telemetry::init_tracing;
use toolshed_engine::{BackOffice, EngineConfig};

/// Tool catalogue: category, names, base replacement value.
const CATALOGUE: &[(&str, &[&str], i64)] = &[
    (
        "Eléctrica",
        &[
            "Taladro percutor",
            "Rotomartillo",
            "Esmeril angular",
            "Sierra circular",
            "Lijadora orbital",
            "Caladora",
            "Atornillador inalámbrico",
            "Cepillo eléctrico",
        ],
        45000,
    ),
    (
        "Construcción",
        &[
            "Betonera",
            "Vibrador de hormigón",
            "Martillo demoledor",
            "Placa compactadora",
            "Andamio modular",
            "Cortadora de cerámica",
        ],
        180000,
    ),
    (
        "Jardín",
        &[
            "Motosierra",
            "Orilladora",
            "Cortacésped",
            "Sopladora",
            "Hidrolavadora",
        ],
        90000,
    ),
    (
        "Manual",
        &[
            "Escalera tijera",
            "Carretilla",
            "Set de llaves",
            "Nivel láser",
            "Prensa de banco",
            "Serrucho",
        ],
        15000,
    ),
];

const FIRST_NAMES: &[&str] = &[
    "Camila", "Matías", "Valentina", "Benjamín", "Francisca", "Tomás", "Josefa", "Vicente",
    "Antonia", "Martín",
];

const LAST_NAMES: &[&str] = &[
    "González", "Muñoz", "Rojas", "Díaz", "Pérez", "Soto", "Contreras", "Silva",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut tools: usize = 40;
    let mut clients: usize = 25;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tools" | "-t" => {
                if i + 1 < args.len() {
                    tools = args[i + 1].parse().unwrap_or(tools);
                    i += 1;
                }
            }
            "--clients" | "-c" => {
                if i + 1 < args.len() {
                    clients = args[i + 1].parse().unwrap_or(clients);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Toolshed Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tools <N>      Number of tools to register (default: 40)");
                println!("  -c, --clients <N>    Number of clients to register (default: 25)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = EngineConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging.filter);

    println!("Toolshed Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database.path.display());
    println!("Tools:    {}", tools);
    println!("Clients:  {}", clients);
    println!();

    let office = BackOffice::open(&config).await?;
    println!("✓ Connected to database");

    let existing = office.inventory.list_tools().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} tools", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = Instant::now();

    office
        .tariffs
        .update_tariff(TariffValues {
            daily_rental_fee: Money::new(3000),
            daily_late_fee: Money::new(5000),
            repair_fee: Money::new(15000),
        })
        .await?;
    println!("✓ Tariff configured");

    let mut registered = 0;
    for seed in 0..tools {
        let tool = generate_tool(seed);
        match office.inventory.create_tool(tool, SYSTEM_USER).await {
            Ok(_) => registered += 1,
            Err(e) => eprintln!("Failed to register tool {}: {}", seed, e),
        }
    }
    println!("✓ Registered {} tools", registered);

    let mut enrolled = 0;
    for seed in 0..clients {
        let client = generate_client(seed);
        match office.clients.create(client).await {
            Ok(_) => enrolled += 1,
            Err(e) => eprintln!("Failed to register client {}: {}", seed, e),
        }
    }
    println!("✓ Registered {} clients", enrolled);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

/// Cycles through the catalogue; repeats get a unit number.
fn generate_tool(seed: usize) -> NewTool {
    let (category, names, base_value) = CATALOGUE[seed % CATALOGUE.len()];
    let name = names[(seed / CATALOGUE.len()) % names.len()];
    let round = seed / (CATALOGUE.len() * names.len());

    let name = if round == 0 {
        name.to_string()
    } else {
        format!("{} #{}", name, round + 1)
    };

    NewTool {
        name,
        category: category.to_string(),
        replacement_value: Money::new(base_value + ((seed * 2500) % 30000) as i64),
        stock: (seed % 6) as i64,
    }
}

/// Builds a client with a RUT that passes the check-digit test.
fn generate_client(seed: usize) -> NewClient {
    let body = (5_000_000 + (seed % 90_000) * 1_013) as u32;
    let rut = format!("{}-{}", body, rut_verifier(body));

    let first = FIRST_NAMES[seed % FIRST_NAMES.len()];
    let last = LAST_NAMES[(seed / FIRST_NAMES.len() + seed) % LAST_NAMES.len()];

    NewClient {
        rut,
        name: format!("{} {}", first, last),
        phone: format!("+569{:08}", 40_000_000 + seed * 7_919),
        email: format!(
            "{}.{}{}@example.com",
            ascii_lower(first),
            ascii_lower(last),
            seed
        ),
    }
}

/// Lowercases and drops accents for email local parts.
fn ascii_lower(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
