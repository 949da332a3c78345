use onboard_core::Section;

use super::{App, print_draft};

pub async fn run(app: &App, section: Section) -> anyhow::Result<()> {
    let session = app.session()?;
    let draft = session.open_section(section).await?;
    print_draft(&draft, &app.format)
}
