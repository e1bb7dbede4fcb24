use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use kikubo_auth::{AccountService, NewAccount, SessionRegistry, TokenConfig};
use kikubo_server::{DatabaseConfig, KikuboServer, ServerConfig};
use kikubo_store::PosStore;
use kikubo_types::{Role, RoleName, Store, User};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Setup => cmd_setup(&open(&config)?),
        Command::Store { command: StoreCommand::Add(args) } => cmd_store_add(&open(&config)?, args),
        Command::Store { command: StoreCommand::List } => cmd_store_list(&open(&config)?),
        Command::User { command: UserCommand::Add(args) } => cmd_user_add(&config, open(&config)?, args),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database = database.parse::<DatabaseConfig>()?;
    }
    Ok(config)
}

fn open(config: &ServerConfig) -> anyhow::Result<Arc<dyn PosStore>> {
    if config.database == DatabaseConfig::Memory {
        println!(
            "{} using an in-memory database; changes are lost on exit",
            "warning:".yellow().bold()
        );
    }
    tracing::debug!(database = %config.database, "opening database");
    config
        .database
        .open()
        .with_context(|| format!("failed to open database {}", config.database))
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = KikuboServer::new(config)?;
    println!(
        "{} Kikubo POS on {} (database: {})",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.config().database.to_string().cyan()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

/// Seed the built-in roles and the demo store. Safe to run repeatedly.
pub(crate) fn seed(db: &dyn PosStore) -> anyhow::Result<Vec<(String, bool)>> {
    let mut seeded = Vec::new();
    for name in RoleName::ALL {
        let (role, created) = db.ensure_role(&Role::builtin(name))?;
        seeded.push((format!("role {}", role.name), created));
    }
    let (store, created) = db.ensure_store(&Store::demo())?;
    seeded.push((format!("store {} ({})", store.name, store.code), created));
    Ok(seeded)
}

fn cmd_setup(db: &Arc<dyn PosStore>) -> anyhow::Result<()> {
    for (what, created) in seed(db.as_ref())? {
        if created {
            println!("  {} {}", "created:".green(), what);
        } else {
            println!("  {} {}", "exists:".dimmed(), what);
        }
    }
    println!("{} Setup complete.", "✓".green().bold());
    Ok(())
}

pub(crate) fn add_store(db: &dyn PosStore, args: StoreAddArgs) -> anyhow::Result<Store> {
    let name = args.name.trim();
    let code = args.code.trim();
    if name.is_empty() || code.is_empty() {
        bail!("store name and code must not be blank");
    }
    let mut store = Store::new(name, code);
    store.address = args.address;
    store.phone = args.phone;
    store.email = args.email.trim().to_lowercase();
    store.tax_rate = args.tax_rate;
    store.currency = args.currency.trim().to_uppercase();
    db.create_store(&store)?;
    Ok(store)
}

fn cmd_store_add(db: &Arc<dyn PosStore>, args: StoreAddArgs) -> anyhow::Result<()> {
    let store = add_store(db.as_ref(), args)?;
    println!("{} Created store {} ({})", "✓".green().bold(), store.name.bold(), store.code.yellow());
    println!("  id: {}", store.id.to_string().cyan());
    Ok(())
}

fn cmd_store_list(db: &Arc<dyn PosStore>) -> anyhow::Result<()> {
    let stores = db.list_stores()?;
    if stores.is_empty() {
        println!("No stores. Run `kikubo setup` or `kikubo store add`.");
        return Ok(());
    }
    for store in stores {
        let state = if store.is_active { "active".green() } else { "inactive".red() };
        println!(
            "{:<12} {:<30} tax {} {}  {}",
            store.code.yellow(),
            store.name,
            store.tax_rate,
            store.currency,
            state
        );
    }
    Ok(())
}

pub(crate) fn add_user(
    accounts: &AccountService,
    db: &dyn PosStore,
    args: UserAddArgs,
) -> anyhow::Result<User> {
    let store = match args.store.as_deref() {
        Some(code) => Some(
            db.get_store_by_code(code)?
                .with_context(|| format!("no store with code {code}"))?,
        ),
        None => None,
    };
    let role = match args.role {
        Some(name) => Some(
            db.get_role_by_name(name)?
                .with_context(|| format!("role {name} is not seeded; run `kikubo setup` first"))?,
        ),
        None => None,
    };
    if !args.superuser && (store.is_none() || role.is_none()) {
        bail!("--store and --role are required unless --superuser is given");
    }
    let user = accounts.create_account(NewAccount {
        name: args.name,
        email: args.email,
        password: args.password,
        phone: args.phone,
        store: store.map(|s| s.id),
        role: role.map(|r| r.id),
        superuser: args.superuser,
    })?;
    Ok(user)
}

fn cmd_user_add(config: &ServerConfig, db: Arc<dyn PosStore>, args: UserAddArgs) -> anyhow::Result<()> {
    let sessions = SessionRegistry::new(TokenConfig::from_secs(
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    ));
    let accounts = AccountService::new(db.clone(), Arc::new(sessions));
    let user = add_user(&accounts, db.as_ref(), args)?;
    println!("{} Created user {} <{}>", "✓".green().bold(), user.username.bold(), user.email);
    println!("  id: {}", user.id.to_string().cyan());
    Ok(())
}
