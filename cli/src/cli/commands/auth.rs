//! Authentication command handlers.

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::auth::{resolve_expiry, AccessToken, AuthError, DeviceCodeResponse, DeviceGrantClient};
use crate::cli::GlobalArgs;
use crate::config::{load_profile, Profile};
use crate::error::{KongctlError, Result};

fn profile_for(global: &GlobalArgs) -> Result<Profile> {
    load_profile(global.config_file.as_deref(), &global.profile, &global.overrides())
}

/// Handle the `kongctl login` command.
pub async fn handle_login(global: &GlobalArgs, no_browser: bool) -> Result<()> {
    let profile = profile_for(global)?;
    let manager = profile.session_manager()?;
    if manager.store().exists(&profile.name)? {
        tracing::debug!(profile = %profile.name, "existing credential will be replaced");
    }

    let http = Client::builder()
        .user_agent(format!("kongctl/{}", env!("CARGO_PKG_VERSION")))
        .timeout(profile.konnect.timeout())
        .build()?;
    let device_client = DeviceGrantClient::new(http);

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = manager
        .login(&profile.name, &device_client, &cancel, |code| {
            println!("{}", login_instructions(code));
            if !no_browser {
                open_browser(code);
            }
        })
        .await;
    ctrl_c.abort();

    match result {
        Ok(_) => {
            println!();
            println!("User successfully authorized");
            Ok(())
        },
        Err(AuthError::Cancelled) => {
            println!();
            println!("Login cancelled.");
            Err(AuthError::Cancelled.into())
        },
        Err(err) => Err(err.into()),
    }
}

/// Instructions shown once the device code is issued.
fn login_instructions(code: &DeviceCodeResponse) -> String {
    let open_line = code
        .verification_uri_complete
        .as_deref()
        .map(|complete| format!("  Or open {complete}\n"))
        .unwrap_or_default();

    format!(
        "Authenticating with Konnect in the browser...\n\n  \
         Copy this one-time code: {user_code}\n  \
         (Expires in {expires_in} seconds)\n\n  \
         And go to {uri}\n\
         {open_line}\n\
         Waiting for user to authenticate...",
        user_code = code.user_code,
        expires_in = code.expires_in,
        uri = code.verification_uri,
    )
}

fn open_browser(code: &DeviceCodeResponse) {
    match open::that(code.browser_url()) {
        Ok(()) => println!("Browser opened automatically."),
        Err(err) => {
            tracing::debug!(error = %err, "failed to open browser");
            println!("Could not open browser. Please visit the URL manually.");
        },
    }
}

/// Handle the `kongctl logout` command.
pub fn handle_logout(global: &GlobalArgs) -> Result<()> {
    let profile = profile_for(global)?;
    let removed = profile.session_manager()?.logout(&profile.name)?;
    println!("{}", logout_message(&profile.name, removed));
    Ok(())
}

fn logout_message(profile: &str, removed: bool) -> String {
    if removed {
        format!("Removed stored Konnect credentials for profile \"{profile}\"")
    } else {
        format!("No stored Konnect credentials found for profile \"{profile}\"")
    }
}

/// Handle the `kongctl auth status` command.
///
/// Reports what the stored credential says without refreshing it.
pub fn handle_status(global: &GlobalArgs) -> Result<()> {
    let profile = profile_for(global)?;
    let api_server = profile.konnect.resolve_base_url()?;

    println!("Profile:    {}", profile.name);
    println!("API Server: {api_server}");

    let manager = profile.session_manager()?;
    if manager.static_token().is_some() {
        println!();
        println!("Authenticated with a personal access token.");
        return Ok(());
    }

    let store = manager.store();
    match store.load(&profile.name) {
        Ok(token) => {
            println!("Credential: {}", store.path_for(&profile.name)?.display());
            println!();
            println!("{}", describe_session(&token, resolve_expiry(&token)));
            Ok(())
        },
        Err(AuthError::NotFound { .. }) => {
            println!();
            println!("Not logged in");
            println!();
            println!("Run 'kongctl login' to authenticate.");
            Ok(())
        },
        Err(err) => Err(KongctlError::Auth(err)),
    }
}

fn describe_session(token: &AccessToken, remaining_secs: i64) -> String {
    if remaining_secs > 0 {
        let minutes = remaining_secs / 60;
        let seconds = remaining_secs % 60;
        return format!("Logged in. Access token expires in {minutes}m {seconds}s.");
    }
    if token.refresh_token().is_empty() {
        "Access token has expired and cannot be refreshed. Run 'kongctl login' again.".to_string()
    } else {
        "Access token has expired. It will be refreshed on next use.".to_string()
    }
}

/// Handle the `kongctl auth token` command.
///
/// Prints a usable access token, refreshing and saving it first if needed.
pub async fn handle_token(global: &GlobalArgs) -> Result<()> {
    let profile = profile_for(global)?;
    let token = profile.session_manager()?.resolve(&profile.name).await?;
    println!("{token}");
    Ok(())
}
