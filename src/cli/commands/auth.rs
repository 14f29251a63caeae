use std::io::{BufRead, Write};

use clap::Subcommand;
use serde_json::json;

use crate::api::auth::login;
use crate::cli::config::CliContext;
use crate::cli::utils::{output_descriptor, output_success};
use crate::cli::OutputFormat;
use crate::session::{CredentialStore, SessionState, SessionStatus};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login and store the session token")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Forget the stored session token")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Follow the session state until Ctrl-C")]
    Watch,
}

pub async fn handle(cmd: AuthCommands, context: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };

            let token = match login(&context.client, &email, &password).await {
                Ok(token) => token,
                Err(e) => {
                    output_descriptor(&output_format, &e.descriptor())?;
                    anyhow::bail!("Login failed");
                }
            };
            context.store.set(&token)?;

            let guard = context.guard();
            guard.recheck();
            let state = guard.state();
            match state.identity() {
                Some(identity) => output_success(
                    &output_format,
                    &format!("Logged in as {}", identity.name),
                    Some(json!({ "identity": identity })),
                ),
                None => anyhow::bail!("Server issued a token that cannot be used"),
            }
        }
        AuthCommands::Logout => {
            context.store.delete()?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let guard = context.guard();
            guard.recheck();
            print_state(&output_format, &guard.state())
        }
        AuthCommands::Watch => {
            let mut guard = context.guard();
            guard.mount();
            let mut states = guard.subscribe_state();
            print_state(&output_format, &states.borrow_and_update().clone())?;

            loop {
                tokio::select! {
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = states.borrow_and_update().clone();
                        // Intermediate "checking" states are not interesting here
                        if state.status.is_resolved() {
                            print_state(&output_format, &state)?;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            guard.teardown();
            Ok(())
        }
    }
}

fn print_state(output_format: &OutputFormat, state: &SessionState) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(state)?),
        OutputFormat::Text => match &state.status {
            SessionStatus::Authenticated(identity) => {
                println!("Logged in as {} ({})", identity.name, identity.id)
            }
            SessionStatus::Unauthenticated => println!("Not logged in"),
            SessionStatus::Unknown | SessionStatus::Checking => println!("Checking session..."),
        },
    }
    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
