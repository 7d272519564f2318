use serde::Deserialize;
use settings_provisioning::{create_settings, Error, SettingsConfiguration};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppSection {
    name: String,
    debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
}

fn main() -> Result<(), Error> {
    // Try APPSETTINGS__DATABASE__PORT=6543 to override the file.
    let app: AppSection =
        create_settings(&SettingsConfiguration::new("App", "Development", "demos"))?;
    let db: DatabaseSection =
        create_settings(&SettingsConfiguration::new("Database", "", "demos"))?;

    println!("App: {} (debug={})", app.name, app.debug);
    println!("Database: {}@{}:{}", db.name, db.host, db.port);

    match create_settings::<AppSection>(&SettingsConfiguration::new("App", "", "/nonexistent")) {
        Err(Error::AppSettingsNotFound(base)) => println!("No settings under {}", base.display()),
        other => println!("Unexpected: {other:?}"),
    }

    Ok(())
}
