use std::path::Path;

use anyhow::Result;
use foundry_core::settings::Settings;
use serde_json::Value;

use crate::cli::SettingsCommands;
use crate::output::{self, Format};

pub async fn run(project_directory: &Path, format: Format, command: SettingsCommands) -> Result<()> {
    let settings = Settings::open(project_directory.join(".foundry").join("settings.json"))?;

    match command {
        SettingsCommands::Get { schema, key } => {
            let value = settings.get(&schema, &key).unwrap_or(Value::Null);
            output::emit(format, &value, |value| println!("{value}"))
        }
    }
}
