use super::App;

pub async fn run(app: &App) -> anyhow::Result<()> {
    let session = app.session()?;
    match session.submit().await {
        Ok(()) => {
            println!("Onboarding submitted. Local drafts removed.");
            Ok(())
        }
        Err(e) => {
            eprintln!("Submission failed; your draft is safe.");
            Err(e.into())
        }
    }
}
