use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use switchyard_core::KeyRegistry;
use switchyard_types::{GatewayConfig, Permission};

pub fn generate_key(
    config: &GatewayConfig,
    owner: &str,
    admin: bool,
    models: Vec<String>,
    rate_limit: Option<u32>,
) -> Result<()> {
    let Some(store_path) = &config.keys.store_path else {
        anyhow::bail!("keys.store_path is not configured; a generated key would not be persisted");
    };

    let registry = KeyRegistry::with_store(store_path.clone())?;
    let permissions = if admin { vec![Permission::Admin] } else { vec![Permission::Standard] };
    let record = registry.create_with_limit(owner, permissions, models, rate_limit)?;

    println!("{}", "API key created".green().bold());
    println!("  Owner:       {}", record.owner);
    println!(
        "  Permissions: {}",
        record.permissions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    println!("  Models:      {}", record.allowed_models.join(", "));
    if let Some(rpm) = record.rate_limit {
        println!("  Rate limit:  {} req/min", rpm);
    }
    println!("  Key:         {}", record.key.yellow());
    println!("  Stored in:   {}", store_path.display());
    Ok(())
}

pub fn check_config(config: &GatewayConfig, path: &Path) -> Result<()> {
    let source = if path.exists() { path.display().to_string() } else { "defaults".to_string() };
    println!("{} ({})", "Configuration OK".green().bold(), source);
    println!("  Listen:     {}", config.server.bind_address());
    println!("  Cache:      enabled={} ttl={}s", config.cache.enabled, config.cache.ttl_secs);
    println!(
        "  Limits:     client {}/{:.2}s, model {}/{:.2}s",
        config.rate_limits.client.capacity,
        config.rate_limits.client.refill_per_second,
        config.rate_limits.model.capacity,
        config.rate_limits.model.refill_per_second
    );
    if config.providers.is_empty() {
        println!("  Providers:  {}", "none (echo fallback)".yellow());
    }
    for provider in &config.providers {
        let key_state = if provider.resolve_api_key().is_some() { "key set".normal() } else { "no key".red() };
        println!("  Provider:   {} [{}] {} ({})", provider.name, provider.kind, provider.models.join(", "), key_state);
    }
    Ok(())
}
