//! Prints the SMD2 OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p smd-api --bin generate-openapi > openapi.json

use smd_api::ApiDoc;
use utoipa::OpenApi;

fn main() {
    match serde_json::to_string_pretty(&ApiDoc::openapi()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI document: {}", e);
            std::process::exit(1);
        }
    }
}
