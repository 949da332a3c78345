use clap::Args;
use onboard_core::{Section, SectionSchema};
use onboard_sync::SectionPreview;
use tracing::warn;

use super::{App, print_draft};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Country for identity and education requirements.
    #[arg(long)]
    pub country: Option<String>,
}

/// Show every section before the final submission.
pub async fn run(app: &App, args: &PreviewArgs) -> anyhow::Result<()> {
    let session = app.session()?;
    let mut schemas = Vec::with_capacity(Section::ALL.len());
    for section in Section::ALL {
        match app.schema(&session, section, args.country.as_deref()).await {
            Ok(schema) => schemas.push(schema),
            Err(e) => {
                warn!(section = %section, error = %e, "requirements unavailable");
                schemas.push(SectionSchema::new(section));
            }
        }
    }
    let preview = session.preview(&schemas).await;

    match app.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        OutputFormat::Text => {
            for section in &preview {
                println!("[{}] {}", section.section, summary(section));
                if !section.draft.is_empty() {
                    print_draft(&section.draft, &app.format)?;
                }
            }
            if preview.iter().all(SectionPreview::is_ready) {
                println!("All sections are complete; run `onboard submit` to finish.");
            } else {
                println!("Complete and sync every section before submitting.");
            }
        }
    }
    Ok(())
}

fn summary(preview: &SectionPreview) -> String {
    if preview.draft.is_empty() {
        return "not started".to_owned();
    }
    if let Some(problem) = &preview.status.problem {
        return format!("incomplete: {problem}");
    }
    match preview.status.diff.needing_calls().count() {
        0 => "ready".to_owned(),
        n => format!("{n} record(s) not saved yet"),
    }
}
