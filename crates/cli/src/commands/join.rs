//! `moltpilot join`: follow the platform's skill document to register.

use moltpilot_config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let result = services.join.run(&cancel).await?;
    println!("{result}");
    println!();
    println!("Store the key with `moltpilot credential set --api-key <key> --handle <name>`.");
    Ok(())
}
