use clap::Args;
use onboard_core::{Draft, FieldValue, RecordKey, Section};
use onboard_sync::OnboardingSession;

use super::{App, parse_key_val, print_draft};

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Section name.
    pub section: Section,
    /// Record key, e.g. `permanent` or `job-1`.
    pub record: String,
    /// Field values (key=value). An empty value clears the field.
    #[arg(value_parser = parse_key_val, required = true)]
    pub values: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Section name.
    pub section: Section,
    /// Record that becomes the copy.
    pub record: String,
    /// Record to copy from. Omit to detach the copy.
    #[arg(long)]
    pub of: Option<String>,
}

pub async fn run_set(app: &App, args: &SetArgs) -> anyhow::Result<()> {
    let session = app.session()?;
    let mut draft = load(&session, args.section).await;
    for (name, raw) in &args.values {
        draft.set_field(args.record.as_str(), name.as_str(), FieldValue::parse_lenient(raw));
    }
    save(app, &session, &draft).await;
    print_draft(&draft, &app.format)
}

pub async fn run_mirror(app: &App, args: &MirrorArgs) -> anyhow::Result<()> {
    let session = app.session()?;
    let mut draft = load(&session, args.section).await;
    if let Some(source) = &args.of {
        anyhow::ensure!(
            draft.record(source).is_some(),
            "record '{source}' does not exist in the {} section",
            args.section
        );
    }
    draft.set_mirror(args.record.as_str(), args.of.as_deref().map(RecordKey::from));
    save(app, &session, &draft).await;
    print_draft(&draft, &app.format)
}

async fn load(session: &OnboardingSession, section: Section) -> Draft {
    session
        .store()
        .read(session.token(), section, Draft::new(section))
        .await
}

async fn save(app: &App, session: &OnboardingSession, draft: &Draft) {
    let writer = session.debounced_writer(app.debounce);
    writer.write(draft);
    writer.shutdown().await;
}
