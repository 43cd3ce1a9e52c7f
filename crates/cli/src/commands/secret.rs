use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use foundry_core::secrets::SecretStore;

use crate::cli::SecretCommands;

fn store_for(project_directory: &Path) -> Result<SecretStore> {
    SecretStore::open(project_directory.join(".foundry").join("secrets.json")).map_err(Into::into)
}

fn parse_expire_at(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

pub async fn run(project_directory: &Path, command: SecretCommands) -> Result<()> {
    let store = store_for(project_directory)?;

    match command {
        SecretCommands::SetApiKey { host, service, key } => {
            store.set_api_key(&host, &service, key)?;
            println!("stored key for {host}/{service}.");
        }
        SecretCommands::GetApiKey { host, service } => {
            println!("{}", store.get_api_key(&host, &service)?);
        }
        SecretCommands::Rotate {
            host,
            service,
            key,
            expire_at,
        } => {
            let expiry = expire_at.as_deref().map(parse_expire_at).transpose()?;
            store.rotate(&host, &service, key, expiry)?;
            println!("rotated key for {host}/{service}.");
        }
        SecretCommands::CheckExpiresAt { host, service } => match store.check_expires_at(&host, &service)? {
            Some(expiry) => println!("{}", expiry.to_rfc3339()),
            None => println!("never expires"),
        },
    }

    Ok(())
}
