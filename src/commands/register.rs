use crate::auth::Rank;
use crate::clock;
use crate::commands::say_ephemeral;
use crate::db::NewFaction;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Register this server's faction
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn register(
    ctx: Context<'_>,
    #[description = "The name of your faction"]
    #[max_length = 100]
    name: String,
    #[description = "Command prefix for your faction (e.g., !, $, ?)"]
    #[max_length = 3]
    prefix: String,
    #[description = "Your faction's timezone (e.g., America/New_York)"] timezone: String,
    #[description = "The admin role for your faction"] admin_role: serenity::Role,
    #[description = "Channel for meeting announcements"] meeting_channel: serenity::GuildChannel,
    #[description = "Channel for radio communications"] radio_channel: serenity::GuildChannel,
    #[description = "Channel for polls and voting"] voting_channel: serenity::GuildChannel,
    #[description = "Channel for fine notifications"] fine_log_channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let db = &ctx.data().db;

    if db.get_faction_by_guild(&guild_id.to_string())?.is_some() {
        say_ephemeral(&ctx, "This server already has a registered faction!").await?;
        return Ok(());
    }

    if let Err(e) = clock::parse_zone(&timezone) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    let channels = [
        (&meeting_channel, "Meeting"),
        (&radio_channel, "Radio"),
        (&voting_channel, "Voting"),
        (&fine_log_channel, "Fine log"),
    ];
    for (channel, label) in channels {
        if channel.kind != serenity::ChannelType::Text {
            say_ephemeral(&ctx, format!("{label} channel must be a text channel.")).await?;
            return Ok(());
        }
    }

    let faction_id = db.create_faction(&NewFaction {
        guild_id: &guild_id.to_string(),
        name: &name,
        prefix: &prefix,
        timezone: &timezone,
        admin_role_id: &admin_role.id.to_string(),
        meeting_channel_id: &meeting_channel.id.to_string(),
        radio_channel_id: &radio_channel.id.to_string(),
        voting_channel_id: &voting_channel.id.to_string(),
        fine_log_channel_id: &fine_log_channel.id.to_string(),
    })?;
    db.add_member(faction_id, &ctx.author().id.to_string(), Rank::Leader.as_str())?;
    info!(
        "Registered faction {} ({}) for guild {}",
        faction_id, name, guild_id
    );

    // Registration already succeeded; the welcome notices are best-effort.
    let welcome = format!(
        "👋 **{}** is now managed here. Use `/help` to see the available commands.",
        name
    );
    let mut notified = Vec::new();
    for (channel, _) in channels {
        if notified.contains(&channel.id) {
            continue;
        }
        notified.push(channel.id);
        if let Err(e) = channel.id.say(&ctx.serenity_context().http, &welcome).await {
            warn!("Failed to send welcome notice to {}: {}", channel.id, e);
        }
    }

    let embed = serenity::CreateEmbed::new()
        .title("✅ Faction Registered Successfully")
        .color(0x57F287)
        .field("Name", name.as_str(), true)
        .field("Prefix", prefix.as_str(), true)
        .field("Timezone", timezone.as_str(), true)
        .field("Admin Role", format!("<@&{}>", admin_role.id), true)
        .field("Meeting Channel", format!("<#{}>", meeting_channel.id), true)
        .field("Radio Channel", format!("<#{}>", radio_channel.id), true)
        .field("Voting Channel", format!("<#{}>", voting_channel.id), true)
        .field(
            "Fine Log Channel",
            format!("<#{}>", fine_log_channel.id),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
