use super::App;
use crate::OutputFormat;

pub async fn run(app: &App) -> anyhow::Result<()> {
    let countries = app.client.countries().await?;
    match app.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&countries)?);
        }
        OutputFormat::Text => {
            println!("{} active countries:", countries.len());
            for country in &countries {
                println!("  {} {}", country.country_uuid, country.country_name);
            }
        }
    }
    Ok(())
}
