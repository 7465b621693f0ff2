/**
 * authsync probe
 *
 * Bootstraps a session from the environment and prints the resulting state.
 *
 * Usage:
 *   authsync-probe                      restore and print the session
 *   authsync-probe login <email> <pw>   sign in, then print
 *   authsync-probe logout               sign out
 *   authsync-probe reset <email>        request a password reset email
 */

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use authsync::client::{AuthSession, AuthState, Config, SqliteStorage};

    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "authsync=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::from_env()?;
    let storage = Arc::new(SqliteStorage::open(config.storage_path()).await?);
    let session = AuthSession::from_config(&config, storage)?;

    session.initialize().await;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => {}
        ["login", email, password] => {
            let result = session.login(email, password).await;
            println!("login: {}", serde_json::to_string(&result)?);
        }
        ["logout"] => {
            session.logout().await;
            println!("logged out");
        }
        ["reset", email] => {
            let result = session.request_password_reset(email).await;
            println!("reset: {}", serde_json::to_string(&result)?);
        }
        other => {
            eprintln!("unknown command: {}", other.join(" "));
            std::process::exit(2);
        }
    }

    let state: AuthState = session.state().await;
    match &state.user {
        Some(user) => println!("{}", serde_json::to_string_pretty(user)?),
        None => println!("anonymous"),
    }
    if let Some(error) = &state.auth_error {
        eprintln!("error: {}", error);
    }

    session.wait_for_side_effects().await;
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("The probe requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin authsync-probe --features cli");
    std::process::exit(1);
}
