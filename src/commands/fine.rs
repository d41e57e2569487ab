use crate::auth::{self, Rank};
use crate::clock;
use crate::commands::{member_context, parse_channel_id, require_rank, say_ephemeral};
use crate::db::FactionRecord;
use crate::validate::validate_fine_amount;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

const FINE_HISTORY_LIMIT: usize = 10;
const DENIAL: &str = "You do not have permission to manage fines.";

/// Manage fines
#[poise::command(slash_command, subcommands("issue", "history", "remove"), guild_only)]
pub async fn fine(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Issue a fine to a member
#[poise::command(slash_command)]
pub async fn issue(
    ctx: Context<'_>,
    #[description = "User to fine"] user: serenity::User,
    #[description = "Fine amount"]
    #[min = 1]
    #[max = 1000000]
    amount: i64,
    #[description = "Reason for the fine"]
    #[max_length = 1000]
    reason: String,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }
    if let Err(e) = validate_fine_amount(amount) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    let db = &ctx.data().db;
    let Some(target) = db.get_member(faction.id, &user.id.to_string())? else {
        say_ephemeral(&ctx, "You can only fine members of your faction.").await?;
        return Ok(());
    };
    if !auth::can_fine(&member, &target) {
        say_ephemeral(&ctx, "You cannot fine members of equal or higher rank.").await?;
        return Ok(());
    }

    let fine_id = db.create_fine(faction.id, &target.user_id, &member.user_id, amount, &reason)?;
    info!(
        "Fine {} of {} issued to {} in faction {}",
        fine_id, amount, target.user_id, faction.id
    );

    let embed = serenity::CreateEmbed::new()
        .title("💰 Fine Issued")
        .color(0xED4245)
        .field("User", format!("<@{}>", target.user_id), true)
        .field("Amount", format!("${}", amount), true)
        .field("Reason", reason.clone(), false)
        .field("Issued By", format!("<@{}>", member.user_id), true)
        .field("Status", "Unpaid", true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Fine ID: {}",
            fine_id
        )));

    notify_fine_log(&ctx, &faction, embed.clone(), Some(&target.user_id)).await;
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// View fine history
#[poise::command(slash_command)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Only show fines for this user"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some((faction, _member)) = member_context(&ctx).await? else {
        return Ok(());
    };

    let filter = user.as_ref().map(|u| u.id.to_string());
    let fines = ctx
        .data()
        .db
        .list_fines(faction.id, filter.as_deref(), FINE_HISTORY_LIMIT)?;

    if fines.is_empty() {
        let reply = match &user {
            Some(user) => format!("No fines found for {}.", user.name),
            None => "No fines found.".to_string(),
        };
        say_ephemeral(&ctx, reply).await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("💰 Fine History")
        .color(0x5865F2)
        .description(match &user {
            Some(user) => format!("Showing fines for {}", user.name),
            None => "Showing recent fines".to_string(),
        });

    for fine in &fines {
        let date = clock::parse_sqlite_utc(&fine.created_at)
            .map(|dt| clock::discord_timestamp(dt, 'R'))
            .unwrap_or_else(|| fine.created_at.clone());
        embed = embed.field(
            format!("Fine #{}", fine.id),
            format!(
                "**Amount:** ${}\n**Member:** <@{}>\n**Reason:** {}\n**Status:** {}\n**Issued By:** <@{}>\n**Date:** {}",
                fine.amount,
                fine.user_id,
                fine.reason,
                if fine.paid { "✅ Paid" } else { "❌ Unpaid" },
                fine.issuer_id,
                date
            ),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Remove a fine
#[poise::command(slash_command)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Fine ID"] id: i64,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    let db = &ctx.data().db;
    let Some(fine) = db.get_fine(id, faction.id)? else {
        say_ephemeral(&ctx, "Fine not found or does not belong to this faction.").await?;
        return Ok(());
    };
    if !auth::can_remove_fine(&member, &fine) {
        say_ephemeral(&ctx, "You can only remove fines that you issued.").await?;
        return Ok(());
    }

    if db.delete_fine(id, faction.id)? == 0 {
        say_ephemeral(&ctx, "Fine not found or does not belong to this faction.").await?;
        return Ok(());
    }
    info!("Fine {} removed by {} in faction {}", id, member.user_id, faction.id);

    let embed = serenity::CreateEmbed::new()
        .title("✅ Fine Removed")
        .color(0x57F287)
        .description(format!("Fine #{} has been removed.", id))
        .field("Removed By", format!("<@{}>", member.user_id), true)
        .field("Original Amount", format!("${}", fine.amount), true)
        .field("Member", format!("<@{}>", fine.user_id), true);

    notify_fine_log(&ctx, &faction, embed.clone(), None).await;
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Best-effort copy of a fine event to the configured fine log channel.
async fn notify_fine_log(
    ctx: &Context<'_>,
    faction: &FactionRecord,
    embed: serenity::CreateEmbed,
    mention: Option<&str>,
) {
    let Some(channel) = faction
        .fine_log_channel_id
        .as_deref()
        .and_then(parse_channel_id)
    else {
        return;
    };

    let mut message = serenity::CreateMessage::new().embed(embed);
    if let Some(user_id) = mention {
        message = message.content(format!("<@{}>", user_id));
    }
    if let Err(e) = channel
        .send_message(&ctx.serenity_context().http, message)
        .await
    {
        warn!("Failed to post to fine log channel {}: {}", channel, e);
    }
}
