use crate::store::ConfigStore;
use crate::utils::error::CommonError;
use crate::{BotContext, BotError};

/// Whether the author is the guild owner or has Administrator.
async fn admin_or_owner(ctx: &BotContext<'_>) -> Result<bool, BotError> {
    let guild_id = ctx.guild_id().ok_or(CommonError::NotInAGuild)?;

    let guild = guild_id.to_partial_guild(ctx.http()).await?;
    if guild.owner_id == ctx.author().id {
        return Ok(true);
    }

    Ok(ctx
        .author_member()
        .await
        .and_then(|member| member.permissions)
        .map(|permissions| permissions.administrator())
        .unwrap_or(false))
}

/// Check for administrative commands: guild owner or Administrator only.
pub async fn is_admin_or_owner(ctx: BotContext<'_>) -> Result<bool, BotError> {
    if admin_or_owner(&ctx).await? {
        Ok(true)
    } else {
        Err(CommonError::NotAuthorized.into())
    }
}

/// Check for organizer commands: admin/owner, or any role named in the
/// guild's authorization policy. The policy is read from the store and
/// passed around as a value.
pub async fn is_organizer_or_higher(ctx: BotContext<'_>) -> Result<bool, BotError> {
    if admin_or_owner(&ctx).await? {
        return Ok(true);
    }

    let guild_id = ctx.guild_id().ok_or(CommonError::NotInAGuild)?;
    let policy = ctx.data().store.get_config(guild_id.get()).await?.policy;

    let authorized = match ctx.author_member().await {
        Some(member) => policy.permits(member.roles.iter().map(|r| r.get().to_string())),
        None => false,
    };

    if authorized {
        Ok(true)
    } else {
        Err(CommonError::NotAuthorized.into())
    }
}
