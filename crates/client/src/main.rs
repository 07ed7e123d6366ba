// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};
use tracing::error;

use eduhub_client::api::{CourseFilter, NewUser};
use eduhub_client::config::GatewayConfig;
use eduhub_client::gateway::Gateway;
use eduhub_client::request::ApiRequest;
use eduhub_client::session::SessionStore;

#[derive(Debug, Parser)]
#[command(name = "eduhub", about = "EduHub API client", version)]
struct Cli {
    #[command(flatten)]
    config: GatewayConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session.
    Login {
        email: String,
        /// Password. Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Register a new account and store the session.
    Register {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// End the session (backend logout is best effort).
    Logout,
    /// Show the current user's profile.
    Whoami,
    /// List catalog courses.
    Courses {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        level: Option<String>,
    },
    /// Enroll in a course.
    Enroll { course_id: i64 },
    /// List the current user's enrollments.
    MyCourses,
    /// Raw GET against an API path (escape hatch).
    Get { path: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // reqwest is built against rustls without a baked-in provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let credentials_path = cli.config.credentials_path();
    let (session, _events) = SessionStore::with_persistence(credentials_path);
    let gateway = Gateway::new(cli.config, session);

    match cli.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let user = gateway.login(&email, &password).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Register { email, password, first_name, last_name } => {
            let user = gateway
                .register(&NewUser { email, password, first_name, last_name })
                .await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Logout => {
            gateway.logout().await?;
            println!("logged out");
        }
        Command::Whoami => {
            let user = gateway.me().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Courses { search, category, level } => {
            let filter = CourseFilter { search, category, level, ..CourseFilter::default() };
            let courses = gateway.courses(&filter).await?;
            println!("{}", serde_json::to_string_pretty(&courses)?);
        }
        Command::Enroll { course_id } => {
            let enrollment = gateway.enroll(course_id).await?;
            println!("{}", serde_json::to_string_pretty(&enrollment)?);
        }
        Command::MyCourses => {
            let enrollments = gateway.my_courses().await?;
            println!("{}", serde_json::to_string_pretty(&enrollments)?);
        }
        Command::Get { path } => {
            let resp = gateway.send(ApiRequest::get(path)).await?;
            println!("{}", serde_json::to_string_pretty(&resp.body)?);
        }
    }

    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    use std::io::Write;
    print!("password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
