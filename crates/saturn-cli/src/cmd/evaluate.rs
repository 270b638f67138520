use crate::output::print_json;
use anyhow::Context;
use saturn_server::AppState;
use std::path::Path;

/// One evaluator pass. Webhooks for newly missed monitors are sent before
/// returning.
pub fn run(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let state = AppState::open(config).context("failed to open database")?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(saturn_server::run_evaluation(&state))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Checked {} monitor(s): {} missed, {} in maintenance.",
            report.checked,
            report.missed.len(),
            report.in_maintenance
        );
        for id in &report.missed {
            println!("  missed: {id}");
        }
    }
    Ok(())
}
