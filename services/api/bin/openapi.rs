//! Writes the OpenAPI document of the tutor REST API.
//!
//! Usage: `openapi [OUTPUT]`. Writes to `openapi.json` by default; `-` prints
//! to stdout instead.

use anyhow::Context;
use tutor_api::router::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;

    if output == "-" {
        println!("{}", spec_json);
    } else {
        std::fs::write(&output, spec_json)
            .with_context(|| format!("Failed to write OpenAPI document to {}", output))?;
    }
    Ok(())
}
