//! Recalculate balances tool
//!
//! Rebuilds every cached balance snapshot of one entity type (or of all types)
//! from the ledger. The ledger is the source of truth; snapshots are disposable
//! rollups, so running this any number of times gives the same balances.
//!
//! # Usage
//! ```bash
//! DATABASE_URL=postgres://... ./recalculate_balances --type customer --concurrency 8
//! DATABASE_URL=postgres://... ./recalculate_balances --type all
//! ```
//!
//! Exits with status 1 when any entity failed; the failures are printed.

use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

use shop_ledger_rs::{
    db,
    models::EntityType,
    repos::{PgStore, Stores},
    services::batch_recalculator::{BatchProgress, BatchRecalculator, DEFAULT_CONCURRENCY},
};

/// Parse command-line arguments manually
struct Args {
    entity_types: Vec<EntityType>,
    concurrency: usize,
}

impl Args {
    fn parse() -> Result<Self, String> {
        Self::parse_from(env::args().skip(1).collect())
    }

    fn parse_from(args: Vec<String>) -> Result<Self, String> {
        let mut entity_types = None;
        let mut concurrency = DEFAULT_CONCURRENCY;

        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1);
            match args[i].as_str() {
                "--type" => {
                    let raw = value.ok_or("--type requires a value")?;
                    entity_types = Some(if raw.eq_ignore_ascii_case("all") {
                        EntityType::ALL.to_vec()
                    } else {
                        vec![raw.parse::<EntityType>().map_err(|e| e.to_string())?]
                    });
                    i += 2;
                }
                "--concurrency" => {
                    let raw = value.ok_or("--concurrency requires a value")?;
                    concurrency = match raw.parse::<usize>() {
                        Ok(n) if n >= 1 => n,
                        _ => return Err(format!("Invalid --concurrency: {}", raw)),
                    };
                    i += 2;
                }
                other => return Err(format!("Unknown argument: {}", other)),
            }
        }

        Ok(Args {
            entity_types: entity_types.ok_or(
                "Usage: recalculate_balances --type customer|supplier|cash-account|all [--concurrency N]",
            )?,
            concurrency,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::init_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    tracing::info!("Connected to database");

    let stores = Stores::from_backend(Arc::new(PgStore::new(pool)));
    let recalculator = BatchRecalculator::new(stores.ledger, stores.snapshots, args.concurrency);

    let mut any_failed = false;

    for entity_type in args.entity_types {
        let (tx, mut rx) = mpsc::unbounded_channel::<BatchProgress>();
        let logger = tokio::spawn(async move {
            while let Some(p) = rx.recv().await {
                if p.ok {
                    tracing::info!("[{}/{}] {} {} ok", p.current, p.total, entity_type, p.entity_id);
                } else {
                    tracing::warn!("[{}/{}] {} {} failed", p.current, p.total, entity_type, p.entity_id);
                }
            }
        });

        let result = recalculator
            .recalculate_all_with_progress(entity_type, Some(tx))
            .await;
        // The sender is dropped with the batch, which ends the logger loop
        let _ = logger.await;

        match result {
            Ok(summary) => {
                println!(
                    "{}: {} of {} recalculated (run {})",
                    entity_type, summary.succeeded, summary.total, summary.run_id
                );
                for failure in &summary.failed {
                    println!(
                        "  {} {} failed [{}]: {}",
                        entity_type, failure.entity_id, failure.code, failure.error
                    );
                }
                any_failed |= !summary.is_clean();
            }
            Err(e) => {
                tracing::error!(entity_type = %entity_type, error = %e, "Could not list entities");
                any_failed = true;
            }
        }
    }

    if any_failed {
        std::process::exit(1);
    }
    tracing::info!("Balance recalculation complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args, String> {
        Args::parse_from(raw.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_all_types() {
        let parsed = args(&["--type", "all", "--concurrency", "8"]).unwrap();
        assert_eq!(parsed.entity_types.len(), 3);
        assert_eq!(parsed.concurrency, 8);
    }

    #[test]
    fn test_parse_single_type_with_default_concurrency() {
        let parsed = args(&["--type", "cash-account"]).unwrap();
        assert_eq!(parsed.entity_types, vec![EntityType::CashAccount]);
        assert_eq!(parsed.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(args(&[]).is_err());
        assert!(args(&["--type", "vendor"]).is_err());
        assert!(args(&["--type", "customer", "--concurrency", "0"]).is_err());
        assert!(args(&["--type"]).is_err());
    }
}
