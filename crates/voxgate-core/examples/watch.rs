//! Example: connect to a SmartPlus account and watch door activity.
//!
//! Expects `AKUVOX_COUNTRY_CODE`, `AKUVOX_PHONE`, `AKUVOX_AUTH_TOKEN`
//! and `AKUVOX_TOKEN` in the environment. The token pair can be lifted
//! from a logged-in SmartPlus app session.

use secrecy::SecretString;
use voxgate_core::{Account, AccountConfig, SignIn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = AccountConfig {
        country_code: std::env::var("AKUVOX_COUNTRY_CODE")?,
        phone_number: std::env::var("AKUVOX_PHONE")?,
        sign_in: SignIn::Tokens {
            auth_token: SecretString::from(std::env::var("AKUVOX_AUTH_TOKEN")?),
            token: SecretString::from(std::env::var("AKUVOX_TOKEN")?),
        },
        ..AccountConfig::default()
    };

    let account = Account::new(config, ".voxgate")?;
    println!("Connecting...");
    account.connect().await?;
    println!("Connected to {:?}", account.title());

    let topology = account.topology_snapshot();
    println!("\n--- Cameras ({}) ---", topology.cameras.len());
    for camera in &topology.cameras {
        println!("  {}", camera.name);
    }
    println!("\n--- Door relays ({}) ---", topology.door_relays.len());
    for relay in &topology.door_relays {
        println!("  {:20} relay {} on {}", relay.door_name, relay.relay_id, relay.mac);
    }
    println!("\n--- Temporary keys ({}) ---", topology.temporary_keys.len());
    for key in &topology.temporary_keys {
        println!(
            "  {:20} {} (expired: {})",
            key.description, key.key_code, key.expired
        );
    }

    println!("\nWatching the door log. Press Ctrl+C to stop...");
    let mut events = account.door_events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(entry) => println!(
                    "door event: {} at {} ({})",
                    entry.capture_type.as_deref().unwrap_or("unknown"),
                    entry.location.as_deref().unwrap_or("unknown"),
                    entry.capture_time,
                ),
                Err(_) => break,
            },
        }
    }

    account.disconnect().await;
    println!("Disconnected.");
    Ok(())
}
