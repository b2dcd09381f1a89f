//! # Demo Catalog Seeder
//!
//! The API exposes no catalog writes, so local databases are filled with
//! this binary.
//!
//! ```bash
//! cargo run -p storefront-db --bin seed
//! cargo run -p storefront-db --bin seed -- --count 1000 --db ./data/storefront.db
//! ```
//!
//! `STOREFRONT_DATABASE_PATH` is used when `--db` is absent, matching the
//! API server. Stock levels run from 0 to 50, so a few products are always
//! sold out for checkout testing. An already populated catalog is left alone.

use anyhow::{bail, Context};
use std::time::Instant;
use storefront_db::repository::product::NewProduct;
use storefront_db::{Database, DbConfig};

const DEFAULT_COUNT: usize = 200;
const DEFAULT_DB: &str = "./storefront_dev.db";

const USAGE: &str = "\
Usage: seed [OPTIONS]

Options:
  -c, --count <N>    Products to create (default: 200)
  -d, --db <PATH>    SQLite file (default: $STOREFRONT_DATABASE_PATH or ./storefront_dev.db)
  -h, --help         Print this message";

/// (category, base names)
const CATALOG: &[(&str, &[&str])] = &[
    (
        "kitchen",
        &[
            "Stoneware Mug",
            "Pour-Over Kettle",
            "Chef Knife",
            "Cutting Board",
            "Cast Iron Skillet",
            "French Press",
        ],
    ),
    (
        "pantry",
        &["Green Tea", "Espresso Beans", "Olive Oil", "Wildflower Honey", "Granola"],
    ),
    (
        "home",
        &["Linen Throw", "Scented Candle", "Ceramic Vase", "Wool Blanket", "Desk Lamp"],
    ),
    (
        "outdoor",
        &["Insulated Bottle", "Picnic Blanket", "Camp Mug", "Trail Backpack"],
    ),
];

/// (size label, surcharge in cents)
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 500), ("L", 1000), ("Gift", 2500)];

struct SeedArgs {
    count: usize,
    db_path: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<SeedArgs>> {
    let mut parsed = SeedArgs {
        count: DEFAULT_COUNT,
        db_path: std::env::var("STOREFRONT_DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DB.into()),
    };

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--count" => {
                let value = args.next().context("--count needs a value")?;
                parsed.count = value
                    .parse()
                    .with_context(|| format!("invalid --count '{}'", value))?;
            }
            "-d" | "--db" => {
                parsed.db_path = args.next().context("--db needs a value")?;
            }
            other => bail!("unknown argument '{}'\n\n{}", other, USAGE),
        }
    }

    Ok(Some(parsed))
}

/// Endless, deterministic stream of demo products. Names repeat with a
/// batch suffix once the catalog is exhausted.
fn demo_products() -> impl Iterator<Item = NewProduct> {
    let combos: Vec<(&str, &str, &str, i64)> = CATALOG
        .iter()
        .flat_map(|(category, names)| {
            names.iter().flat_map(move |name| {
                SIZES
                    .iter()
                    .map(move |(size, surcharge)| (*category, *name, *size, *surcharge))
            })
        })
        .collect();
    let per_batch = combos.len();

    (0usize..).map(move |n| {
        let (category, name, size, surcharge) = combos[n % per_batch];
        let batch = n / per_batch;
        let label = match batch {
            0 => format!("{} ({})", name, size),
            b => format!("{} ({}) #{}", name, size, b + 1),
        };

        NewProduct {
            name: label,
            description: Some(format!("{} from the {} range", name, category)),
            price_cents: 499 + ((n * 37) % 5000) as i64 + surcharge,
            stock: (n % 51) as i64,
            category_id: Some(category.to_string()),
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let db = Database::new(DbConfig::new(&args.db_path))
        .await
        .with_context(|| format!("opening {}", args.db_path))?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("{} already holds {} products, nothing to do", args.db_path, existing);
        return Ok(());
    }

    let started = Instant::now();
    let products = db.products();
    let mut created = 0usize;
    for product in demo_products().take(args.count) {
        match products.create(product).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("skipped a product: {}", e),
        }
    }

    println!(
        "Seeded {} of {} products into {} in {:?}",
        created,
        args.count,
        args.db_path,
        started.elapsed()
    );

    for product in products.list(Some("kitchen"), 5).await? {
        println!("  {:<32} {:>8}  stock {}", product.name, product.price(), product.stock);
    }

    Ok(())
}
