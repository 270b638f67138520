use crate::output::print_json;
use clap::{Subcommand, ValueEnum};
use saturn_core::account::{self, Role};
use std::path::Path;

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Create a user and print a session token for the API
    Create {
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Add the user to this org
        #[arg(long)]
        org: Option<String>,
        /// Role within --org
        #[arg(long, value_enum, default_value = "owner")]
        role: RoleArg,
    },

    /// Issue a fresh session token for an existing user
    Login { email: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Owner,
    Admin,
    Member,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Owner => Role::Owner,
            RoleArg::Admin => Role::Admin,
            RoleArg::Member => Role::Member,
        }
    }
}

pub fn run(data_dir: &Path, subcmd: UserSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        UserSubcommand::Create {
            email,
            name,
            org,
            role,
        } => create(data_dir, &email, name.as_deref(), org.as_deref(), role.into(), json),
        UserSubcommand::Login { email } => login(data_dir, &email, json),
    }
}

fn create(
    data_dir: &Path,
    email: &str,
    name: Option<&str>,
    org: Option<&str>,
    role: Role,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let store = super::open_store(data_dir)?;
    let now = chrono::Utc::now();

    let (user, membership, token) = store.write(|tx| {
        let user = account::create_user(tx, email, name, now)?;
        let membership = match org {
            Some(org_id) => Some(account::add_member(tx, org_id, &user.id, role, now)?),
            None => None,
        };
        let token = account::issue_session(tx, &user.id, config.session_ttl(), now)?;
        Ok((user, membership, token))
    })?;

    if json {
        print_json(&serde_json::json!({
            "user": user,
            "membership": membership,
            "token": token,
        }))?;
    } else {
        println!("Created user {} ({})", user.email, user.id);
        if let Some(m) = &membership {
            println!("Added to org {} as {}", m.org_id, m.role);
        }
        println!("Session token: {token}");
    }
    Ok(())
}

fn login(data_dir: &Path, email: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let store = super::open_store(data_dir)?;
    let now = chrono::Utc::now();

    let issued = store.write(|tx| {
        let Some(user) = account::find_user_by_email(tx, email)? else {
            return Ok(None);
        };
        let token = account::issue_session(tx, &user.id, config.session_ttl(), now)?;
        Ok(Some((user, token)))
    })?;
    let Some((user, token)) = issued else {
        anyhow::bail!("no user registered with email {email}");
    };

    if json {
        print_json(&serde_json::json!({ "user": user, "token": token }))?;
    } else {
        println!("Logged in as {} ({})", user.email, user.id);
        println!("Session token: {token}");
    }
    Ok(())
}
