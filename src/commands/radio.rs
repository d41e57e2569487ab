use crate::auth::Rank;
use crate::clock;
use crate::commands::{member_context, parse_channel_id, require_rank, say_ephemeral};
use crate::validate::validate_frequency;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RadioFormat {
    #[name = "FM"]
    Fm,
    #[name = "AM"]
    Am,
    #[name = "Digital"]
    Digital,
}

impl RadioFormat {
    fn as_str(self) -> &'static str {
        match self {
            RadioFormat::Fm => "FM",
            RadioFormat::Am => "AM",
            RadioFormat::Digital => "Digital",
        }
    }
}

/// Manage radio settings
#[poise::command(slash_command, subcommands("set", "view", "announce"), guild_only)]
pub async fn radio(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set radio frequency
#[poise::command(slash_command)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Radio frequency (e.g., \"123.45\")"] frequency: String,
    #[description = "Broadcast format"] format: Option<RadioFormat>,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(
        &ctx,
        &member,
        Rank::Officer,
        "Only leaders and officers can modify radio settings.",
    )
    .await?
    {
        return Ok(());
    }
    if let Err(e) = validate_frequency(&frequency) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    let format = format.unwrap_or(RadioFormat::Fm);
    ctx.data()
        .db
        .upsert_radio(faction.id, &frequency, format.as_str(), &member.user_id)?;
    info!(
        "Radio frequency set to {} ({}) in faction {}",
        frequency,
        format.as_str(),
        faction.id
    );

    let embed = serenity::CreateEmbed::new()
        .title("📻 Radio Frequency Updated")
        .description(format!("New frequency: {} ({})", frequency, format.as_str()))
        .field("Updated by", format!("<@{}>", member.user_id), true)
        .color(0x57F287);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// View the current radio settings
#[poise::command(slash_command)]
pub async fn view(ctx: Context<'_>) -> Result<(), Error> {
    let Some((faction, _member)) = member_context(&ctx).await? else {
        return Ok(());
    };

    let Some(radio) = ctx.data().db.get_radio(faction.id)? else {
        say_ephemeral(&ctx, "No radio frequency has been set for this faction.").await?;
        return Ok(());
    };

    let updated = clock::parse_sqlite_utc(&radio.updated_at)
        .map(|dt| clock::discord_timestamp(dt, 'R'))
        .unwrap_or_else(|| radio.updated_at.clone());

    let embed = serenity::CreateEmbed::new()
        .title("📻 Radio Information")
        .description(format!(
            "Current frequency: {} ({})",
            radio.frequency, radio.format
        ))
        .field("Last updated by", format!("<@{}>", radio.updated_by), true)
        .field("Last updated", updated, true)
        .color(0x5865F2);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Make a radio announcement
#[poise::command(slash_command)]
pub async fn announce(
    ctx: Context<'_>,
    #[description = "Announcement message"]
    #[max_length = 2000]
    message: String,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };

    let Some(radio) = ctx.data().db.get_radio(faction.id)? else {
        say_ephemeral(&ctx, "No radio frequency has been set for this faction.").await?;
        return Ok(());
    };
    let Some(channel) = faction
        .radio_channel_id
        .as_deref()
        .and_then(parse_channel_id)
    else {
        say_ephemeral(
            &ctx,
            "No radio channel configured. Use `/config channels` to set one up.",
        )
        .await?;
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("📻 Radio Announcement")
        .description(message)
        .field(
            "Frequency",
            format!("{} ({})", radio.frequency, radio.format),
            true,
        )
        .field("From", format!("<@{}>", member.user_id), true)
        .color(0x5865F2);

    if let Err(e) = channel
        .send_message(
            &ctx.serenity_context().http,
            serenity::CreateMessage::new().embed(embed),
        )
        .await
    {
        error!("Failed to send radio announcement to {}: {}", channel, e);
        say_ephemeral(&ctx, "An error occurred while sending the announcement.").await?;
        return Ok(());
    }

    say_ephemeral(&ctx, format!("✅ Announcement sent to <#{}>", channel)).await?;
    Ok(())
}
