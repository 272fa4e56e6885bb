//! `mimic doctor` — Diagnose config and credentials.

use mimic_config::AppConfig;
use mimic_providers::router;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Mimic Doctor — System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `mimic onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.generation.model);

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set COHERE_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let providers = router::build_from_config(&config);
    if let Some(embedder) = providers.default_embedder() {
        println!("  Embedding: {}", embedder.model());
    }
    match providers.default_provider() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ {} reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  {} answered but reported unhealthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ {} unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        None => {
            println!("  ❌ Provider '{}' could not be built", config.default_provider);
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
