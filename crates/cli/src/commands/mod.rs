pub mod countries;
pub mod edit;
pub mod open;
pub mod preview;
pub mod status;
pub mod submit;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use onboard_client::OnboardClient;
use onboard_core::schema::PERSONAL_RECORD;
use onboard_core::{Draft, Section, SectionSchema, SessionToken};
use onboard_state::DraftStore;
use onboard_sync::{OnboardingSession, RecordBackend};

use crate::OutputFormat;

/// Shared state for every command.
pub struct App {
    pub client: Arc<OnboardClient>,
    pub store: Arc<dyn DraftStore>,
    pub token: Option<SessionToken>,
    pub debounce: Duration,
    pub format: OutputFormat,
}

impl App {
    /// Session for the configured token.
    pub fn session(&self) -> anyhow::Result<OnboardingSession> {
        let token = self
            .token
            .clone()
            .context("a session token is required (--token or ONBOARD_TOKEN)")?;
        let backend = Arc::clone(&self.client) as Arc<dyn RecordBackend>;
        Ok(OnboardingSession::new(token, backend, Arc::clone(&self.store)))
    }

    /// Requirements of a section. Identity and education requirements come
    /// from the country mappings on the server.
    pub async fn schema(
        &self,
        session: &OnboardingSession,
        section: Section,
        country: Option<&str>,
    ) -> anyhow::Result<SectionSchema> {
        let schema = match section {
            Section::Personal => SectionSchema::personal(),
            Section::Address => SectionSchema::address(),
            Section::Experience => SectionSchema::experience(),
            Section::Identity => {
                let country = resolve_country(session, section, country).await?;
                let types = self.client.identity_types(&country).await?;
                SectionSchema::identity(&types)?
            }
            Section::Education => {
                let country = resolve_country(session, section, country).await?;
                let mappings = self.client.education_mappings(&country).await?;
                SectionSchema::education(&mappings)
            }
        };
        Ok(schema)
    }
}

/// Country whose document mappings apply: the explicit one, else a
/// `country_uuid` stored in the section draft, else the nationality from
/// the personal draft.
async fn resolve_country(
    session: &OnboardingSession,
    section: Section,
    explicit: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(country) = explicit {
        return Ok(country.to_owned());
    }
    let store = session.store();
    let draft = store
        .read(session.token(), section, Draft::new(section))
        .await;
    if let Some(country) = draft
        .records
        .values()
        .find_map(|r| r.field("country_uuid").canonical())
    {
        return Ok(country);
    }
    let personal = store
        .read(session.token(), Section::Personal, Draft::new(Section::Personal))
        .await;
    personal
        .record(PERSONAL_RECORD)
        .and_then(|r| r.field("nationality_country_uuid").canonical())
        .with_context(|| {
            format!(
                "no country known for the {section} section; \
                 pass --country or fill in the nationality"
            )
        })
}

/// Print a draft in the chosen format.
pub fn print_draft(draft: &Draft, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(draft)?);
        }
        OutputFormat::Text => {
            println!("{} ({} records)", draft.section, draft.records.len());
            for (key, record) in &draft.records {
                let id = record
                    .remote_id
                    .as_ref()
                    .map_or_else(|| "not saved".to_owned(), |id| format!("id {id}"));
                match &record.mirror_of {
                    Some(source) => println!("  {key} [{id}] copy of {source}"),
                    None => println!("  {key} [{id}]"),
                }
                for (name, value) in &record.fields {
                    println!("    {name} = {value}");
                }
                for (slot, attachment) in &record.attachments {
                    let state = match (&attachment.server_path, &attachment.file_name) {
                        (Some(path), _) => path.clone(),
                        (None, Some(name)) => format!("{name} (not uploaded)"),
                        (None, None) => "-".to_owned(),
                    };
                    println!("    {slot}: {state}");
                }
            }
        }
    }
    Ok(())
}

/// Parse `KEY=VALUE`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}
