use crate::clock;
use crate::commands::{member_context, say_ephemeral};
use crate::validate::{validate_handle, validate_phone};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage your faction profile
#[poise::command(slash_command, subcommands("view", "edit"), guild_only)]
pub async fn profile(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// View your faction profile
#[poise::command(slash_command)]
pub async fn view(ctx: Context<'_>) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    let db = &ctx.data().db;

    let fine_count = db.count_fines(faction.id, &member.user_id)?;
    let stats = db.attendance_stats(faction.id, &member.user_id)?;
    let count_of = |status: &str| {
        stats
            .iter()
            .find(|(s, _)| s == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    };

    let joined = clock::parse_sqlite_utc(&member.joined_at)
        .map(|dt| clock::discord_timestamp(dt, 'R'))
        .unwrap_or_else(|| member.joined_at.clone());

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{} Member Profile", faction.name))
        .description(format!("Profile for <@{}>", member.user_id))
        .color(0x5865F2)
        .field("Role", member.role.clone(), true)
        .field("Member Since", joined, true)
        .field("Fines", format!("{} received", fine_count), true)
        .field(
            "Meeting Attendance",
            format!(
                "✅ Attending: {}\n❔ Maybe: {}\n❌ Declined: {}",
                count_of("ATTENDING"),
                count_of("MAYBE"),
                count_of("DECLINED")
            ),
            true,
        );

    let mut contact = Vec::new();
    if let Some(phone) = &member.phone {
        contact.push(format!("Phone: {}", phone));
    }
    if let Some(handle) = &member.handle {
        contact.push(format!("Handle: {}", handle));
    }
    if !contact.is_empty() {
        embed = embed.field("Contact Information", contact.join("\n"), false);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Edit your profile
#[poise::command(slash_command)]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "Your phone number"] phone: Option<String>,
    #[description = "Your handle (e.g., @crow)"] handle: Option<String>,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };

    if phone.is_none() && handle.is_none() {
        say_ephemeral(&ctx, "Please provide at least one field to update.").await?;
        return Ok(());
    }
    if let Some(phone) = &phone {
        if let Err(e) = validate_phone(phone) {
            say_ephemeral(&ctx, e.to_string()).await?;
            return Ok(());
        }
    }
    if let Some(handle) = &handle {
        if let Err(e) = validate_handle(handle) {
            say_ephemeral(&ctx, e.to_string()).await?;
            return Ok(());
        }
    }

    ctx.data().db.update_member_contact(
        faction.id,
        &member.user_id,
        phone.as_deref(),
        handle.as_deref(),
    )?;

    say_ephemeral(&ctx, "✅ Your profile has been updated.").await?;
    Ok(())
}
