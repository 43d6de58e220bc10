//! Desktop entry point for the Weldmap viewer

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::path::Path;
    use tracing_subscriber::EnvFilter;
    use weldmap_core::config::{load_config, CONFIG_FILE};

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,wgpu=warn")))
        .init();

    let config = load_config(Path::new(CONFIG_FILE))?;
    tracing::info!(section_url = %config.section_url, "Starting Weldmap viewer");

    weldmap_viewer::run(config);
    Ok(())
}

// The browser build starts from `wasm_bindgen(start)` in the library
#[cfg(target_arch = "wasm32")]
fn main() {}
