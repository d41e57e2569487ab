use crate::auth::Rank;
use crate::clock;
use crate::commands::{member_context, require_rank, say_ephemeral};
use crate::validate::validate_prefix;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::info;

const DENIAL: &str = "You do not have permission to modify faction settings.";

/// Configure faction settings
#[poise::command(
    slash_command,
    subcommands("prefix", "admin", "timezone", "channels"),
    guild_only
)]
pub async fn config(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set custom prefix
#[poise::command(slash_command)]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "New prefix"]
    #[max_length = 10]
    prefix: String,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }
    if let Err(e) = validate_prefix(&prefix) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    ctx.data().db.update_faction_prefix(faction.id, &prefix)?;
    say_ephemeral(&ctx, format!("Faction prefix updated to: {}", prefix)).await?;
    Ok(())
}

/// Set admin role
#[poise::command(slash_command)]
pub async fn admin(
    ctx: Context<'_>,
    #[description = "Admin role"] role: serenity::Role,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    ctx.data()
        .db
        .update_faction_admin_role(faction.id, &role.id.to_string())?;
    info!("Admin role for faction {} set to {}", faction.id, role.id);
    say_ephemeral(&ctx, format!("Admin role updated to <@&{}>", role.id)).await?;
    Ok(())
}

/// Set timezone
#[poise::command(slash_command)]
pub async fn timezone(
    ctx: Context<'_>,
    #[description = "Timezone (e.g., \"America/New_York\")"] timezone: String,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }
    if let Err(e) = clock::parse_zone(&timezone) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    ctx.data()
        .db
        .update_faction_timezone(faction.id, &timezone)?;
    say_ephemeral(&ctx, format!("Faction timezone updated to: {}", timezone)).await?;
    Ok(())
}

/// Update the configured channels
#[poise::command(slash_command)]
pub async fn channels(
    ctx: Context<'_>,
    #[description = "Channel for meeting announcements"] meeting: Option<serenity::GuildChannel>,
    #[description = "Channel for radio communications"] radio: Option<serenity::GuildChannel>,
    #[description = "Channel for polls and voting"] voting: Option<serenity::GuildChannel>,
    #[description = "Channel for fine notifications"] fine_log: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    let updates = [
        (&meeting, "Meeting"),
        (&radio, "Radio"),
        (&voting, "Voting"),
        (&fine_log, "Fine log"),
    ];
    if updates.iter().all(|(channel, _)| channel.is_none()) {
        say_ephemeral(&ctx, "Please specify at least one channel to update.").await?;
        return Ok(());
    }
    for (channel, label) in &updates {
        if let Some(channel) = channel {
            if channel.kind != serenity::ChannelType::Text {
                say_ephemeral(&ctx, format!("{label} channel must be a text channel.")).await?;
                return Ok(());
            }
        }
    }

    let meeting_id = meeting.as_ref().map(|c| c.id.to_string());
    let radio_id = radio.as_ref().map(|c| c.id.to_string());
    let voting_id = voting.as_ref().map(|c| c.id.to_string());
    let fine_log_id = fine_log.as_ref().map(|c| c.id.to_string());
    ctx.data().db.update_faction_channels(
        faction.id,
        meeting_id.as_deref(),
        radio_id.as_deref(),
        voting_id.as_deref(),
        fine_log_id.as_deref(),
    )?;

    let mut embed = serenity::CreateEmbed::new()
        .title("Channel Configuration Updated")
        .description("The following channels have been updated:")
        .color(0x57F287);
    for (channel, label) in &updates {
        if let Some(channel) = channel {
            embed = embed.field(
                format!("{label} Channel"),
                format!("<#{}>", channel.id),
                true,
            );
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
