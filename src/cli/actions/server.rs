use crate::{
    api::{self, auth::AuthGate},
    cli::{actions::Action, globals::GlobalArgs},
};
use anyhow::{Context, Result};
use tracing::info;

/// Execute the server action.
/// # Errors
/// Returns an error if the provider's signing keys cannot be fetched or the
/// server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server { port, globals } = action;

    log_startup_args(&globals, port);

    let gate = AuthGate::from_issuer(
        &globals.credential.issuer_base_url(),
        &globals.credential.audience,
    )
    .await
    .context("Could not load token signing keys from the identity provider")?;

    api::new(port, globals, gate).await
}

fn log_startup_args(globals: &GlobalArgs, port: u16) {
    let entries = [
        ("listen", format!("tcp:{port}")),
        ("domain", globals.credential.domain.clone()),
        ("audience", globals.credential.audience.clone()),
        ("m2m_client_id", globals.credential.client_id.clone()),
        ("m2m_client_secret_set", "true".to_string()),
        ("web_root", globals.web_root.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = String::from("Startup configuration:");
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        message.push_str(&format!("\n  {key}:{padding} {value}"));
    }

    info!("{message}");
}
