use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use saturn_core::schedule::{format_schedule, next_due_at, ScheduleSpec};

#[derive(Subcommand)]
pub enum ScheduleSubcommand {
    /// Print the next due time(s) for a schedule
    Next {
        /// Interval in seconds
        #[arg(long, conflicts_with = "cron", required_unless_present = "cron")]
        interval: Option<u64>,
        /// Cron expression (5 or 6 fields)
        #[arg(long)]
        cron: Option<String>,
        /// IANA timezone for --cron
        #[arg(long, default_value = "UTC")]
        tz: String,
        /// Start from this RFC 3339 instant instead of now
        #[arg(long)]
        from: Option<String>,
        /// Number of consecutive due times to print
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

pub fn run(subcmd: ScheduleSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ScheduleSubcommand::Next {
            interval,
            cron,
            tz,
            from,
            count,
        } => {
            let spec = match (interval, cron) {
                (Some(secs), _) => ScheduleSpec::interval(secs),
                (None, Some(expr)) => ScheduleSpec::cron(expr, tz),
                (None, None) => anyhow::bail!("one of --interval or --cron is required"),
            };
            let from = match from {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("invalid --from '{s}'"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            next(&spec, from, count, json)
        }
    }
}

fn next(spec: &ScheduleSpec, from: DateTime<Utc>, count: usize, json: bool) -> anyhow::Result<()> {
    let mut times = Vec::with_capacity(count);
    let mut cursor = from;
    for _ in 0..count.max(1) {
        cursor = next_due_at(spec, cursor)?;
        times.push(cursor);
    }

    if json {
        print_json(&serde_json::json!({
            "schedule": format_schedule(spec),
            "next": times.iter().map(|t| t.to_rfc3339()).collect::<Vec<_>>(),
        }))?;
    } else {
        for t in &times {
            println!("{}", t.to_rfc3339());
        }
    }
    Ok(())
}
