use crate::auth::{self, Rank, Resolution};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show available commands
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let rank = match auth::resolve(&ctx.data().db, guild_id.get(), ctx.author().id.get())? {
        Resolution::Authorized { member, .. } => Some(member.rank()),
        _ => None,
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("📖 Faction Commands")
        .color(0x5865F2)
        .field(
            "Basics",
            "`/help` — show this list\n\
             `/ping` — check if the bot is alive\n\
             `/register` — register this server's faction (Manage Server only)",
            false,
        )
        .field(
            "Profile",
            "`/profile view` — view your faction profile\n\
             `/profile edit` — update your contact information",
            false,
        )
        .field(
            "Fines",
            "`/fine history` — view recent fines",
            false,
        )
        .field(
            "Radio",
            "`/radio view` — show the current frequency\n\
             `/radio announce` — broadcast to the radio channel",
            false,
        )
        .field("Voting", "`/poll` — create a reaction poll", false);

    if rank.is_some_and(|r| r >= Rank::Officer) {
        embed = embed.field(
            "Management",
            "`/fine issue` / `/fine remove` — manage fines\n\
             `/meeting schedule|emergency|cancel|attendance` — manage meetings\n\
             `/radio set` — set the radio frequency\n\
             `/config prefix|admin|timezone|channels` — faction settings",
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Check if the bot is alive
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("🏓 Pong! Latency: {}ms", latency.as_millis()))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
