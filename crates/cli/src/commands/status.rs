use clap::Args;
use onboard_core::{Classification, Section};

use super::App;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Section name.
    pub section: Section,
    /// Country for identity and education requirements.
    #[arg(long)]
    pub country: Option<String>,
}

pub async fn run(app: &App, args: &StatusArgs) -> anyhow::Result<()> {
    let session = app.session()?;
    let schema = app
        .schema(&session, args.section, args.country.as_deref())
        .await?;
    let status = session.status(args.section, &schema).await;

    match app.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            if status.diff.entries.is_empty() {
                println!("The {} section is empty.", args.section);
            }
            for (key, class) in &status.diff.entries {
                println!("  {:<9} {key}", label(*class));
            }
            match &status.problem {
                Some(problem) => println!("Incomplete: {problem}"),
                None if status.diff.is_nothing_to_do() => println!("Nothing to save."),
                None => {
                    let pending = status.diff.needing_calls().count();
                    println!("{pending} record(s) will be saved on the next sync.");
                }
            }
        }
    }
    Ok(())
}

fn label(class: Classification) -> &'static str {
    match class {
        Classification::New => "new",
        Classification::Unchanged => "unchanged",
        Classification::Changed => "changed",
        Classification::Mirror => "copy",
        Classification::Removed => "removed",
    }
}
