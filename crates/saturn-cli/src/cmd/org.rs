use crate::output::{fmt_time, print_json, print_table};
use clap::Subcommand;
use saturn_core::account;
use std::path::Path;

#[derive(Subcommand)]
pub enum OrgSubcommand {
    /// Create an organization
    Create {
        name: String,
        /// Maximum number of monitors (defaults to default_monitor_limit)
        #[arg(long)]
        monitor_limit: Option<u32>,
    },
    /// List organizations
    List,
}

pub fn run(data_dir: &Path, subcmd: OrgSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        OrgSubcommand::Create { name, monitor_limit } => create(data_dir, &name, monitor_limit, json),
        OrgSubcommand::List => list(data_dir, json),
    }
}

fn create(data_dir: &Path, name: &str, monitor_limit: Option<u32>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let store = super::open_store(data_dir)?;
    let limit = monitor_limit.unwrap_or(config.default_monitor_limit);

    let org = store.write(|tx| account::create_org(tx, name, limit, chrono::Utc::now()))?;

    if json {
        print_json(&org)?;
    } else {
        println!("Created org '{}' ({})", org.name, org.id);
    }
    Ok(())
}

fn list(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(data_dir)?;
    let orgs = store.read(|tx| account::list_orgs(tx))?;

    if json {
        return print_json(&orgs);
    }
    let rows = orgs
        .iter()
        .map(|o| {
            vec![
                o.id.clone(),
                o.name.clone(),
                o.monitor_limit.to_string(),
                fmt_time(Some(o.created_at)),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "LIMIT", "CREATED"], rows);
    Ok(())
}
