//! `kongctl get me`.

use crate::cli::GlobalArgs;
use crate::client::KonnectClient;
use crate::config::load_profile;
use crate::error::Result;

/// Handle the `kongctl get me` command.
///
/// Resolves a token for the profile (refreshing it when expired) and prints
/// the current user as JSON.
pub async fn handle_get_me(global: &GlobalArgs) -> Result<()> {
    let profile = load_profile(global.config_file.as_deref(), &global.profile, &global.overrides())?;
    let token = profile.session_manager()?.resolve(&profile.name).await?;

    let client = KonnectClient::new(profile.konnect.resolve_base_url()?, &token, &profile.konnect)?;
    let user = client.current_user().await?;

    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}
