//! Prints every captured email as stored, including entries that do not parse.

use anyhow::Context;
use dotenvy::dotenv;

use quantiva::config::{mask_redis_url, AppConfig};
use quantiva::init_tracing;
use quantiva::repositories::email_repository::{FileEmailStore, RedisEmailStore, EMAILS_KEY};

fn print_entries<S: AsRef<str>>(entries: &[S]) {
    println!("Found {} emails:", entries.len());
    for (i, entry) in entries.iter().enumerate() {
        println!("{} {}", i + 1, entry.as_ref());
    }
}

fn check_redis(url: &str) -> anyhow::Result<()> {
    let store = RedisEmailStore::connect(url).context("Failed to set up redis client")?;
    let entries = store.list_raw().context("Failed to read redis list")?;
    if !entries.is_empty() {
        print_entries(&entries);
        return Ok(());
    }

    let pattern = format!("{}*", EMAILS_KEY);
    println!("No list entries found in key \"{}\". Trying SCAN for keys...", EMAILS_KEY);
    let found = store.scan_values(&pattern).context("Failed to scan redis keys")?;
    if found.is_empty() {
        println!("No keys matching \"{}\" found.", pattern);
    }
    for kv in found {
        println!("Key: {} Value: {}", kv.key, kv.value.as_deref().unwrap_or("(nil)"));
    }
    Ok(())
}

fn check_file(store: &FileEmailStore) {
    println!("Reading {}", store.path().display());
    let entries: Vec<String> = store.read_entries().iter().map(|v| v.to_string()).collect();
    if entries.is_empty() {
        println!("No emails stored yet.");
    } else {
        print_entries(&entries);
    }
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();
    let config = AppConfig::from_env();
    let file = FileEmailStore::new(config.emails_file.clone());

    match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Using REDIS_URL: {}", mask_redis_url(url));
            if let Err(e) = check_redis(url) {
                // Submissions degrade to the file while redis is down
                tracing::warn!("{:#}", e);
                check_file(&file);
            }
        }
        None => {
            tracing::info!("No REDIS_URL, reading the local file");
            check_file(&file);
        }
    }
    Ok(())
}
