use crate::output::{fmt_time, print_json, print_table};
use clap::Subcommand;
use saturn_core::monitor::{self, MonitorFilter, NewMonitor};
use saturn_core::schedule::{format_schedule, ScheduleSpec};
use saturn_core::types::MonitorStatus;
use std::path::Path;

const DEFAULT_RUN_LIMIT: usize = 20;

#[derive(Subcommand)]
pub enum MonitorSubcommand {
    /// Create a monitor and print its ping URL
    Create {
        /// Owning org ID
        #[arg(long)]
        org: String,
        name: String,
        /// Expect a ping every N seconds
        #[arg(long, conflicts_with = "cron", required_unless_present = "cron")]
        interval: Option<u64>,
        /// Cron expression (5 or 6 fields)
        #[arg(long)]
        cron: Option<String>,
        /// IANA timezone for --cron
        #[arg(long, default_value = "UTC")]
        tz: String,
        /// Grace period in seconds
        #[arg(long)]
        grace: Option<u64>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List monitors of an org
    List {
        #[arg(long)]
        org: String,
        /// Only monitors in this status (OK, LATE, FAILING, MISSED, DISABLED)
        #[arg(long)]
        status: Option<MonitorStatus>,
    },

    /// Show recent runs of a monitor, newest first
    Runs {
        id: String,
        #[arg(long, default_value_t = DEFAULT_RUN_LIMIT)]
        limit: usize,
    },
}

pub fn run(data_dir: &Path, subcmd: MonitorSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MonitorSubcommand::Create {
            org,
            name,
            interval,
            cron,
            tz,
            grace,
            tags,
        } => {
            let schedule = match (interval, cron) {
                (Some(secs), _) => ScheduleSpec::interval(secs),
                (None, Some(expr)) => ScheduleSpec::cron(expr, tz),
                (None, None) => anyhow::bail!("one of --interval or --cron is required"),
            };
            let input = NewMonitor {
                org_id: org,
                name,
                schedule,
                grace_sec: grace,
                tags,
                capture_output: false,
                capture_limit_kb: None,
                depends_on: Vec::new(),
            };
            create(data_dir, input, json)
        }
        MonitorSubcommand::List { org, status } => list(data_dir, &org, status, json),
        MonitorSubcommand::Runs { id, limit } => runs(data_dir, &id, limit, json),
    }
}

fn create(data_dir: &Path, input: NewMonitor, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let store = super::open_store(data_dir)?;

    let created = store.write(|tx| monitor::create_monitor(tx, input, chrono::Utc::now()))?;
    let ping_url = format!("{}/api/ping/{}", config.base_url(), created.token);

    if json {
        print_json(&serde_json::json!({ "monitor": created, "pingUrl": ping_url }))?;
    } else {
        println!("Created monitor '{}' ({})", created.name, created.id);
        println!("Schedule: {}", format_schedule(&created.schedule));
        println!("Next due: {}", fmt_time(created.next_due_at));
        println!("Ping URL: {ping_url}");
    }
    Ok(())
}

fn list(data_dir: &Path, org: &str, status: Option<MonitorStatus>, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(data_dir)?;
    let filter = MonitorFilter {
        status,
        limit: None,
    };
    let monitors = store.read(|tx| monitor::list_monitors(tx, org, &filter))?;

    if json {
        return print_json(&monitors);
    }
    let rows = monitors
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.status.to_string(),
                format_schedule(&m.schedule),
                fmt_time(m.next_due_at),
                fmt_time(m.last_run_at),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "STATUS", "SCHEDULE", "NEXT DUE", "LAST RUN"], rows);
    Ok(())
}

fn runs(data_dir: &Path, id: &str, limit: usize, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(data_dir)?;
    let runs = store.read(|tx| {
        monitor::get_monitor(tx, id)?;
        monitor::list_runs(tx, id, limit)
    })?;

    if json {
        return print_json(&runs);
    }
    let rows = runs
        .iter()
        .map(|r| {
            vec![
                fmt_time(Some(r.started_at)),
                r.outcome.to_string(),
                r.duration_ms.map_or("-".to_string(), |d| format!("{d}ms")),
                r.exit_code.map_or("-".to_string(), |c| c.to_string()),
            ]
        })
        .collect();
    print_table(&["STARTED", "OUTCOME", "DURATION", "EXIT"], rows);
    Ok(())
}
