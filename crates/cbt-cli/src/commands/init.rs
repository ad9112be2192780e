//! The `cbt init` command.

use std::path::Path;

use anyhow::Result;

use cbt_core::bulk::TEMPLATE;

const CONFIG_FILE: &str = "cbt.toml";
const TEMPLATE_FILE: &str = "questions-template.json";

pub fn execute() -> Result<()> {
    write_if_missing(CONFIG_FILE, SAMPLE_CONFIG)?;
    write_if_missing(TEMPLATE_FILE, TEMPLATE)?;

    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} with your API URL and admin password");
    println!("  2. Run: cbt health");
    println!("  3. Run: cbt questions import {TEMPLATE_FILE} --password <admin password>");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# cbt configuration

# "http" talks to the REST API; "memory" keeps everything in this process.
store = "http"
api_url = "http://localhost:5001/api"
timeout_secs = 10

# Shared secret for admin commands. Prefer an environment reference.
admin_password = "${CBT_ADMIN_PASSWORD}"

# Results that could not be saved are queued here until `cbt sync`.
data_dir = "./cbt-data"
"#;
