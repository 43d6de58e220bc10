//! Weldmap Viewer - weld point, locator and pin editor
//!
//! Overlays engineering annotations on an STL/OBJ reference model. Runs in
//! the browser (WASM) or as a desktop binary.

pub mod app;
pub mod file_loader;
pub mod file_picker;
pub mod section_client;
pub mod ui;

pub use app::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// WASM entry point
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run(app::browser_config());
}
