use clap::Subcommand;
use focusboard_core::{Config, CoreError};

use crate::app::{print_json, App};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },
}

/// Auth failures are shown with their user-facing text.
fn describe(err: CoreError) -> Box<dyn std::error::Error> {
    match err {
        CoreError::Auth(e) => {
            tracing::debug!(error = %e, "auth failed");
            e.user_message().into()
        }
        other => other.into(),
    }
}

pub async fn run(action: AuthAction, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open(config).await?;
    let workspace = &app.workspace;

    match action {
        AuthAction::Register { email, password } => {
            let user_id = workspace.register(&email, &password).await.map_err(describe)?;
            println!("registered and signed in as {user_id}");
        }
        AuthAction::Login { email, password } => {
            let user_id = workspace.login(&email, &password).await.map_err(describe)?;
            println!("signed in as {user_id}");
        }
        AuthAction::Logout => {
            workspace.logout().await.map_err(describe)?;
            println!("signed out");
        }
        AuthAction::Whoami { json } => {
            let info = app.profiles().user_info();
            match (json, info) {
                (true, info) => print_json(&info)?,
                (false, Some(info)) => println!("{} <{}> ({})", info.name, info.email, info.id),
                (false, None) => println!("not signed in"),
            }
        }
    }
    Ok(())
}
