use crate::{
    cli::{actions::Action, globals::GlobalArgs},
    mgmt::ServiceCredential,
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;

/// Turn parsed CLI matches into an [`Action`].
///
/// # Errors
/// Returns an error if any required credential field is missing or empty. This
/// aborts startup; a half-configured broker must never reach the listen loop.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        let value = matches
            .get_one::<String>(name)
            .map(|s: &String| s.trim().to_string())
            .ok_or_else(|| anyhow!("missing required argument: --{name}"))?;

        if value.is_empty() {
            return Err(anyhow!("argument --{name} must not be empty"));
        }

        Ok(value)
    };

    let credential = ServiceCredential::new(
        required("domain")?,
        required("audience")?,
        required("m2m-client-id")?,
        SecretString::from(required("m2m-client-secret")?),
    );

    let web_root = matches
        .get_one::<String>("web-root")
        .map(|s: &String| s.to_string())
        .unwrap_or_else(|| "public".to_string());

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(3001),
        globals: GlobalArgs::new(credential, web_root),
    })
}
