use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use onboard_core::{PendingFile, Section, SyncOutcome};
use tracing::debug;

use super::App;
use crate::OutputFormat;

/// A file to upload into a record slot, given as `record:slot=path`.
#[derive(Debug, Clone)]
pub struct AttachArg {
    pub record: String,
    pub slot: String,
    pub path: PathBuf,
}

fn parse_attach(s: &str) -> Result<AttachArg, String> {
    let (target, path) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid RECORD:SLOT=PATH: no `=` found in `{s}`"))?;
    let (record, slot) = target
        .split_once(':')
        .ok_or_else(|| format!("invalid RECORD:SLOT=PATH: no `:` found in `{target}`"))?;
    if record.is_empty() || slot.is_empty() || path.is_empty() {
        return Err(format!("invalid RECORD:SLOT=PATH: empty part in `{s}`"));
    }
    Ok(AttachArg {
        record: record.to_owned(),
        slot: slot.to_owned(),
        path: PathBuf::from(path),
    })
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Section name.
    pub section: Section,
    /// Files to upload (record:slot=path).
    #[arg(long, value_parser = parse_attach)]
    pub attach: Vec<AttachArg>,
    /// Country for identity and education requirements.
    #[arg(long)]
    pub country: Option<String>,
}

pub async fn run(app: &App, args: &SyncArgs) -> anyhow::Result<()> {
    let session = app.session()?;
    let mut draft = session.open_section(args.section).await?;

    for arg in &args.attach {
        let bytes = tokio::fs::read(&arg.path)
            .await
            .with_context(|| format!("failed to read {}", arg.path.display()))?;
        let file_name = arg
            .path
            .file_name()
            .map_or_else(|| arg.slot.clone(), |n| n.to_string_lossy().into_owned());
        debug!(record = %arg.record, slot = %arg.slot, size = bytes.len(), "attaching file");
        draft.attach(
            arg.record.as_str(),
            arg.slot.as_str(),
            PendingFile::new(file_name, content_type(&arg.path), bytes),
        );
    }

    let schema = app
        .schema(&session, args.section, args.country.as_deref())
        .await?;
    let outcome = match session.sync_section(&mut draft, &schema).await {
        Ok(outcome) => outcome,
        Err(e) => {
            for key in e.failed_records() {
                eprintln!("  not saved: {key}");
            }
            if e.is_retryable() {
                eprintln!("Your draft is safe; run the sync again to retry.");
            }
            return Err(e.into());
        }
    };

    match app.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Text => {
            println!("{}", outcome.message());
            if let SyncOutcome::Synced(report) = &outcome {
                for key in &report.mirrored {
                    println!("  {key} copied from its source");
                }
            }
        }
    }
    Ok(())
}

/// Content type guessed from the file extension.
fn content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_argument_parses() {
        let arg = parse_attach("passport:document=/tmp/scan.pdf").unwrap();
        assert_eq!(arg.record, "passport");
        assert_eq!(arg.slot, "document");
        assert_eq!(arg.path, PathBuf::from("/tmp/scan.pdf"));

        assert!(parse_attach("passport=/tmp/scan.pdf").is_err());
        assert!(parse_attach("passport:document").is_err());
        assert!(parse_attach(":document=/tmp/a.pdf").is_err());
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type(Path::new("a/B.PDF")), "application/pdf");
        assert_eq!(content_type(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(
            content_type(Path::new("resume.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(content_type(Path::new("photo.webp")), "image/webp");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }
}
