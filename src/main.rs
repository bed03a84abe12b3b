use anyhow::Context;

/// Load `.env` from the working directory; a missing file is fine.
#[cfg(not(target_arch = "wasm32"))]
fn load_dotenv() -> anyhow::Result<Option<std::path::PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err).context("failed to read .env"),
    }
}

#[cfg(target_arch = "wasm32")]
fn load_dotenv() -> anyhow::Result<Option<std::path::PathBuf>> {
    Ok(None)
}

fn main() -> anyhow::Result<()> {
    let env_file = load_dotenv()?;
    streamdesk::logging::init();
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }
    dioxus::launch(streamdesk::ui::App);
    Ok(())
}
