use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kikubo_types::{Rate, RoleName};

#[derive(Parser)]
#[command(name = "kikubo", about = "Kikubo POS backend: REST API and offline invoice sync", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database to use: `memory` or `sqlite:<path>`. Overrides the config file.
    #[arg(long, global = true)]
    pub database: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the API server
    Serve(ServeArgs),
    /// Seed the built-in roles and the demo store
    Setup,
    /// Manage stores
    Store {
        #[command(subcommand)]
        command: StoreCommand,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on. Overrides the config file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Subcommand)]
pub enum StoreCommand {
    /// Create a store
    Add(StoreAddArgs),
    /// List all stores
    List,
}

#[derive(Args)]
pub struct StoreAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub code: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    /// Fraction such as `0.18`
    #[arg(long, default_value = "0")]
    pub tax_rate: Rate,
    #[arg(long, default_value = "USD")]
    pub currency: String,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a verified account in a store
    Add(UserAddArgs),
}

#[derive(Args)]
pub struct UserAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// Store code
    #[arg(long)]
    pub store: Option<String>,
    /// owner, manager or salesperson
    #[arg(long)]
    pub role: Option<RoleName>,
    #[arg(long)]
    pub phone: Option<String>,
    /// Platform administrator, not tied to any store
    #[arg(long)]
    pub superuser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["kikubo", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kikubo", "setup", "--database", "sqlite:pos.db", "-v"]).unwrap();
        assert!(matches!(cli.command, Command::Setup));
        assert_eq!(cli.database.as_deref(), Some("sqlite:pos.db"));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_store_add() {
        let cli = Cli::try_parse_from([
            "kikubo", "store", "add", "--name", "Corner Shop", "--code", "CS01", "--tax-rate", "0.18",
        ])
        .unwrap();
        let Command::Store { command: StoreCommand::Add(args) } = cli.command else {
            panic!("expected store add");
        };
        assert_eq!(args.code, "CS01");
        assert_eq!(args.tax_rate, "0.1800".parse().unwrap());
        assert_eq!(args.currency, "USD");
    }

    #[test]
    fn parse_user_add_role() {
        let cli = Cli::try_parse_from([
            "kikubo", "user", "add", "--name", "Ann", "--email", "ann@shop.test", "--password",
            "secret123", "--store", "CS01", "--role", "Manager",
        ])
        .unwrap();
        let Command::User { command: UserCommand::Add(args) } = cli.command else {
            panic!("expected user add");
        };
        assert_eq!(args.role, Some(RoleName::Manager));
        assert!(!args.superuser);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Cli::try_parse_from([
            "kikubo", "user", "add", "--name", "Ann", "--email", "a@b.c", "--password", "x", "--role", "cashier",
        ])
        .is_err());
    }
}
