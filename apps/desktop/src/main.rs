use std::{fmt, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, ClientContext, Route};
use shared::{
    domain::{NotificationKind, ProfileUpdate, Role},
    error::ErrorCode,
    protocol::{LoginCredentials, LoginOutcome},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "skillmatrix", about = "Skill matrix client session tool")]
struct Args {
    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session for later invocations.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Exit non-zero unless the session holds at least `role`.
    Can { role: String },
    /// Print which top-level surface would be shown.
    Route,
    /// Update profile fields of the signed-in user.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_delimiter = ',')]
        skills: Option<Vec<String>>,
    },
    /// Post a toast and watch it expire.
    Notify {
        message: String,
        #[arg(long, default_value = "info")]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings()?;
    tracing::debug!(database_url = %settings.database_url, "loaded settings");
    let ctx = ClientContext::initialize(&settings).await?;

    match args.command {
        Command::Login { email, password } => {
            match ctx.submit_login(LoginCredentials::new(email, password)).await {
                LoginOutcome::Success => {
                    let route = ctx.current_route().await;
                    if args.json {
                        println!("{}", serde_json::to_string(&route)?);
                    } else {
                        println!("Signed in; showing {}", describe_route(route));
                    }
                }
                LoginOutcome::Failure { error } => bail!("login failed: {error}"),
            }
        }
        Command::Logout => {
            ctx.sign_out().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let state = ctx.session().snapshot().await;
            match state.user {
                Some(user) if args.json => println!("{}", serde_json::to_string_pretty(&user)?),
                Some(user) => println!(
                    "{} <{}> role={} department={}",
                    user.name, user.email, user.role, user.department
                ),
                None => return Err(failure("whoami", ErrorCode::Unauthorized, "not signed in")),
            }
        }
        Command::Can { role } => {
            let required = Role::parse(&role);
            if !ctx.has_permission(required).await {
                return Err(failure(
                    "permission check",
                    ErrorCode::Forbidden,
                    format!("'{role}' denied"),
                ));
            }
            println!("permission '{role}' granted");
        }
        Command::Route => {
            let route = ctx.current_route().await;
            if args.json {
                println!("{}", serde_json::to_string(&route)?);
            } else {
                println!("{}", describe_route(route));
            }
        }
        Command::Profile {
            name,
            department,
            title,
            skills,
        } => {
            let update = ProfileUpdate {
                name,
                department,
                title,
                skills,
                ..ProfileUpdate::default()
            };
            if update.is_empty() {
                return Err(failure("profile update", ErrorCode::Validation, "nothing to update"));
            }
            let profile = ctx
                .session()
                .update_profile(update)
                .await
                .map_err(|err| failure("profile update", err.code(), err))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Notify { message, kind } => {
            let kind = parse_kind(&kind)?;
            ctx.ui().add_notification(kind, message);
            let dwell = ctx.notifications().dwell();
            for toast in ctx.notifications().render() {
                println!("[{}] {}", toast.kind.as_str(), toast.message);
            }
            tokio::time::sleep(dwell + Duration::from_millis(50)).await;
            println!(
                "{} notification(s) left after {} ms",
                ctx.notifications().render().len(),
                dwell.as_millis()
            );
        }
    }

    Ok(())
}

fn describe_route(route: Route) -> String {
    match route {
        Route::Login => "login screen".to_string(),
        Route::Dashboard(variant) => format!(
            "{} (sections: {})",
            variant.title(),
            variant.sections().join(", ")
        ),
    }
}

fn parse_kind(raw: &str) -> Result<NotificationKind> {
    Ok(match raw.to_ascii_lowercase().as_str() {
        "success" => NotificationKind::Success,
        "error" => NotificationKind::Error,
        "warning" => NotificationKind::Warning,
        "info" => NotificationKind::Info,
        other => {
            return Err(failure(
                "notify",
                ErrorCode::Validation,
                format!("unknown notification kind '{other}'"),
            ))
        }
    })
}

/// Error line tagged with the front-end error code, e.g. `profile update failed [forbidden]: ...`.
fn failure(action: &str, code: ErrorCode, detail: impl fmt::Display) -> anyhow::Error {
    anyhow!("{action} failed [{code}]: {detail}")
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
