use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use studio_gate::authz::{self, GuardAction, GuardRequest};
use studio_gate::config::ClientConfig;
use studio_gate::models::Role;
use studio_gate::session::{LogNavigator, SessionManager, SqliteSlotStore};

const SAMPLE_PATHS: &[&str] = &[
    "/",
    "/accounts",
    "/booking",
    "/calendar",
    "/package",
    "/billing",
    "/workload",
    "/feedback",
    "/reports",
    "/settings",
];

#[derive(Parser, Debug)]
#[command(author, version, about = "studio-gate access and session tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the role policy whether ROLE may open PATH
    Check {
        #[arg(long)]
        role: String,
        path: String,
    },
    /// Print the allow/deny matrix for every role over a set of paths
    Matrix {
        /// Paths to evaluate (defaults to the dashboard's top-level pages)
        paths: Vec<String>,
    },
    /// Run the edge guard for one navigation
    Guard {
        path: String,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Sign in against the backend and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        remember: bool,
    },
    /// Reconcile the stored session with the backend and print it
    Status,
    /// Sign out and clear every stored credential
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { role, path } => {
            let verdict = if authz::allows_raw(&role, &path) { "allow" } else { "deny" };
            println!("{verdict}");
        }
        Commands::Matrix { paths } => {
            let paths: Vec<String> = if paths.is_empty() {
                SAMPLE_PATHS.iter().map(|p| p.to_string()).collect()
            } else {
                paths
            };
            print_matrix(&paths);
        }
        Commands::Guard { path, token, role } => {
            let Some(path) = authz::guard::canonical_path(&path) else {
                println!("refused: {path} has no canonical form");
                return Ok(());
            };
            let mut request = GuardRequest::new(path);
            request.auth_cookie = token;
            request.role_cookie = role;
            let outcome = authz::evaluate(&request);
            match outcome.action {
                GuardAction::Continue => println!("{:?}: continue", outcome.state),
                GuardAction::Redirect { location, expire } => {
                    println!("{:?}: redirect {location}", outcome.state);
                    for name in expire {
                        println!("  expire {name}");
                    }
                }
            }
        }
        Commands::Login {
            email,
            password,
            remember,
        } => {
            let manager = session_manager().await?;
            let profile = manager.login(&email, &password, remember).await?;
            println!("signed in as {} ({}, {})", profile.full_name, profile.email, profile.role);
            if !remember {
                println!("note: without --remember the session ends with this process");
            }
        }
        Commands::Status => {
            let manager = session_manager().await?;
            let session = manager.initialize_auth().await;
            match (session.is_authenticated, session.user) {
                (true, Some(user)) => {
                    println!("authenticated: {} <{}> as {}", user.full_name, user.email, user.role);
                }
                _ => println!("not authenticated"),
            }
        }
        Commands::Logout => {
            let manager = session_manager().await?;
            manager.logout().await;
            println!("signed out");
        }
    }

    Ok(())
}

async fn session_manager() -> anyhow::Result<SessionManager> {
    let config = ClientConfig::from_env()?;
    let pool = studio_gate::db::init()
        .await
        .context("credential store unavailable")?;
    let manager = SessionManager::from_config(
        config,
        Arc::new(SqliteSlotStore::new(pool)),
        Arc::new(LogNavigator),
    )?;
    Ok(manager)
}

fn print_matrix(paths: &[String]) {
    print!("{:<16}", "Path");
    for role in Role::ALL {
        print!(" {:<13}", role.as_str());
    }
    println!();

    for path in paths {
        print!("{:<16}", path);
        for role in Role::ALL {
            let cell = if authz::allows(role, path) { "allow" } else { "-" };
            print!(" {:<13}", cell);
        }
        println!();
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
