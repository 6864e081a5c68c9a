use clap::{Parser, Subcommand};

use crate::middleware::rbac::Role;

/// objgate: role-gated gateway for the upstream objects API
#[derive(Parser)]
#[command(name = "objgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a freshly signed token for a role
    Token {
        /// admin or member
        #[arg(long, value_parser = parse_role)]
        role: Role,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: crate::middleware::rbac::UnknownRole| e.to_string())
}
