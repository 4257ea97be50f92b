//! `adq config` – show where the config lives and what it resolves to.

use adq_core::config::{self, AdqConfig};
use anyhow::Result;

pub fn run_config(cfg: &AdqConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    println!(
        "# effective plan: {} (limit {})",
        cfg.plan_tier(),
        cfg.tier_limits()
            .limit_for(cfg.plan_tier())
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}
