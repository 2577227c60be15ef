use std::path::Path;

use tokio::sync::mpsc;

use chatfx_core::{AppConfig, load_catalog};

use crate::console;
use crate::oauth;
use crate::service::Session;

/// Authorize, connect and run the session with the operator console.
pub async fn run() -> Result<(), String> {
    let config = AppConfig::load().map_err(|e| e.to_string())?;
    let credentials = oauth::login(&config.client_id)
        .await
        .map_err(|e| e.to_string())?;

    let (command_tx, command_rx) = mpsc::channel(16);
    let session = Session::start(&config, &credentials, command_rx)?;
    console::spawn_reader(command_tx);

    session.run().await;
    Ok(())
}

/// Run the browser authorization once and print the account.
pub async fn login() -> Result<(), String> {
    let config = AppConfig::load().map_err(|e| e.to_string())?;
    let credentials = oauth::login(&config.client_id)
        .await
        .map_err(|e| e.to_string())?;

    println!(
        "Authorized as {} (id {})",
        credentials.login, credentials.user_id
    );
    Ok(())
}

/// Print the event catalog.
pub fn show_events() -> Result<(), String> {
    let config = AppConfig::load().map_err(|e| e.to_string())?;
    let path = Path::new(&config.events_file);
    if !path.exists() {
        println!("No catalog at {}", path.display());
        return Ok(());
    }

    let entries = load_catalog(path).map_err(|e| e.to_string())?;
    if entries.is_empty() {
        println!("Catalog is empty");
        return Ok(());
    }

    println!(
        "{:<24} {:>6} {:>9} {:>8}  variant",
        "id", "bits", "cooldown", "effect"
    );
    println!("{}", "-".repeat(60));
    for entry in &entries {
        println!(
            "{:<24} {:>6} {:>8.1}s {:>7.1}s  {:?}",
            entry.id, entry.bit_cost, entry.cooldown_secs, entry.effect_secs, entry.variant
        );
    }
    println!("\nTotal: {} events", entries.len());
    Ok(())
}

/// Print the resolved configuration and where it lives.
pub fn show_config() -> Result<(), String> {
    let config = AppConfig::load().map_err(|e| e.to_string())?;
    if let Ok(path) = AppConfig::path() {
        println!("config file: {}", path.display());
    }

    println!("bot_name: {}", config.bot_name);
    println!("tips_pattern: {}", config.tips_pattern);
    println!("authorized_moderators: {:?}", config.authorized_moderators);
    println!(
        "client_id: {}",
        if config.client_id.is_empty() {
            "(not set)"
        } else {
            config.client_id.as_str()
        }
    );
    println!("chat: {}:{}", config.chat_server, config.chat_port);
    println!("pubsub: {}", config.pubsub_url);
    println!("tick_interval_ms: {}", config.tick_interval_ms);
    println!("max_pending: {}", config.max_pending);
    println!("hype_train_event_cost: {}", config.hype_train_event_cost);
    println!("events_file: {}", config.events_file);
    Ok(())
}
