//! `tailroster` - CLI for fetching aircraft rosters
//!
//! This binary wires configuration, the credential store, and the roster
//! aggregator together behind a small command-line interface.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;
use tokio::runtime::Runtime;
use tracing::debug;

use tailroster::cli::output::{render_record, render_roster};
use tailroster::cli::{Cli, Command, ConfigCommand, FetchCommand, LookupCommand, PoolCommand};
use tailroster::{
    init_logging, load_roster, AircraftLookup, AuthError, Config, CredentialStore, Error,
    HttpLookup, Identifier, IdentifierPool, LoginForm, RosterAggregator, RosterState, Session,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Fetch(cmd) => handle_fetch(&config, &cmd),
        Command::Lookup(cmd) => handle_lookup(&config, &cmd),
        Command::Pool(cmd) => handle_pool(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn runtime() -> tailroster::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::system_failure(format!("failed to start async runtime: {e}")))
}

fn handle_fetch(config: &Config, cmd: &FetchCommand) -> anyhow::Result<()> {
    let store = CredentialStore::from_config(&config.auth)
        .context("failed to register configured accounts")?;
    let session = Session::new();

    if config.auth.require_login || cmd.has_credentials() {
        let form = LoginForm::new(
            cmd.username.clone().unwrap_or_default(),
            cmd.password.clone().unwrap_or_default(),
        );
        match store.login(&form) {
            Ok(account) => session.sign_in(account),
            Err(AuthError::Validation(errors)) => {
                for (field, message) in errors.iter() {
                    eprintln!("{field}: {message}");
                }
                bail!("login form is incomplete");
            }
            Err(err) => bail!(err),
        }
    }

    if let Some(welcome) = session.welcome_message() {
        eprintln!("{welcome}");
    }

    let target = cmd.target.unwrap_or(config.roster.target_size);
    let pool = IdentifierPool::from_config(&config.roster);
    let mut aggregator =
        RosterAggregator::from_config(HttpLookup::from_config(config)?, &config.roster);
    if let Some(cap) = cmd.cap {
        aggregator = aggregator.with_cap(cap);
    }
    if let Some(deadline_ms) = cmd.deadline_ms {
        aggregator = aggregator.with_deadline(std::time::Duration::from_millis(deadline_ms));
    }

    let result = runtime().and_then(|rt| rt.block_on(load_roster(&pool, &aggregator, target)));
    let state = RosterState::from_result(result);

    if let RosterState::Failed(message) = state {
        bail!(message);
    }
    print!("{}", render_roster(&state, cmd.format)?);
    Ok(())
}

fn handle_lookup(config: &Config, cmd: &LookupCommand) -> anyhow::Result<()> {
    let identifier = Identifier::parse(&cmd.registration)?;
    let lookup = HttpLookup::from_config(config)?;
    let session = Session::new();

    let rt = runtime()?;
    match rt.block_on(lookup.lookup(&identifier)) {
        Ok(record) => {
            let views = session.record_detail_view();
            debug!(%identifier, views, "Opened aircraft detail");
            print!("{}", render_record(&record, cmd.json)?);
            if !cmd.json {
                println!();
            }
            Ok(())
        }
        Err(err) => bail!("lookup of {identifier} failed: {err}"),
    }
}

fn handle_pool(config: &Config, cmd: &PoolCommand) -> anyhow::Result<()> {
    let target = cmd.target.unwrap_or(config.roster.target_size);
    let pool = IdentifierPool::from_config(&config.roster);

    for identifier in pool.build_working_set(target)? {
        println!("{identifier}");
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                for account in &mut shown.auth.accounts {
                    account.password = "<redacted>".to_string();
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Lookup]");
                println!("  Base URL:           {}", config.lookup.base_url);
                println!("  Request timeout:    {:?}", config.request_timeout());
                println!("  Connect timeout:    {:?}", config.connect_timeout());
                println!();
                println!("[Roster]");
                println!(
                    "  Seed registrations: {}",
                    config.roster.seed_registrations.join(", ")
                );
                println!("  Target size:        {}", config.roster.target_size);
                println!("  Cap:                {}", config.roster.cap);
                println!("  Deadline:           {:?}", config.deadline());
                println!("  Prefixes:           {}", config.roster.prefixes);
                println!();
                println!("[Auth]");
                println!(
                    "  Duplicate names:    {:?}",
                    config.auth.duplicate_usernames
                );
                println!("  Require login:      {}", config.auth.require_login);
                println!("  Accounts:           {}", config.auth.accounts.len());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
