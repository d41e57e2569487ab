use crate::actions::{self, ActionId, VoteSink};
use crate::auth::Rank;
use crate::clock;
use crate::commands::{member_context, parse_channel_id, require_rank, say_ephemeral};
use crate::db::Database;
use crate::{Context, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

const DENIAL: &str = "Only leaders and officers can manage meetings.";

/// RSVP reactions in declared order; index i maps to `RSVP_STATUSES[i]`.
const RSVP_EMOJIS: [&str; 3] = ["✅", "❔", "❌"];
const RSVP_STATUSES: [&str; 3] = ["ATTENDING", "MAYBE", "DECLINED"];
const RSVP_LABELS: [&str; 3] = ["Attending", "Maybe", "Declined"];

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum AttendanceStatus {
    #[name = "attending"]
    Attending,
    #[name = "maybe"]
    Maybe,
    #[name = "declined"]
    Declined,
}

impl AttendanceStatus {
    fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "ATTENDING",
            AttendanceStatus::Maybe => "MAYBE",
            AttendanceStatus::Declined => "DECLINED",
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "✅",
            AttendanceStatus::Maybe => "❔",
            AttendanceStatus::Declined => "❌",
        }
    }
}

/// Persists RSVP choices for one announced meeting and renders the final
/// tally when the window closes at the meeting instant.
struct RsvpSink {
    db: Database,
    meeting_id: i64,
    title: String,
    scheduled_at: DateTime<Utc>,
}

#[async_trait]
impl VoteSink for RsvpSink {
    async fn record(&self, user_id: u64, option_index: usize) -> anyhow::Result<()> {
        let status = RSVP_STATUSES
            .get(option_index)
            .ok_or_else(|| anyhow::anyhow!("RSVP option {} out of range", option_index))?;
        self.db
            .upsert_attendance(self.meeting_id, &user_id.to_string(), status)
    }

    async fn finalize(
        &self,
        ctx: &serenity::Context,
        message: &mut serenity::Message,
    ) -> anyhow::Result<()> {
        let counts = self.db.attendance_counts(self.meeting_id)?;
        let tallies: Vec<u64> = RSVP_STATUSES
            .iter()
            .map(|status| {
                counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, count)| *count as u64)
                    .unwrap_or(0)
            })
            .collect();
        let labels: Vec<String> = RSVP_LABELS.iter().map(|l| l.to_string()).collect();
        let summary = actions::summarize(&labels, &tallies);

        let lines: Vec<String> = summary
            .results
            .iter()
            .zip(RSVP_EMOJIS)
            .map(|(result, emoji)| {
                format!(
                    "{} {} — {} ({}%)",
                    emoji, result.label, result.votes, result.percent
                )
            })
            .collect();

        let embed = serenity::CreateEmbed::new()
            .title(format!("📅 {}", self.title))
            .description(lines.join("\n"))
            .field(
                "Time",
                clock::discord_timestamp(self.scheduled_at, 'F'),
                true,
            )
            .footer(serenity::CreateEmbedFooter::new(format!(
                "RSVP closed • {} responses",
                summary.total
            )))
            .color(0x57F287);

        message
            .edit(ctx, serenity::EditMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

/// Manage meetings
#[poise::command(
    slash_command,
    subcommands("schedule", "emergency", "cancel", "attendance"),
    guild_only
)]
pub async fn meeting(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Schedule a meeting
#[poise::command(slash_command)]
pub async fn schedule(
    ctx: Context<'_>,
    #[description = "Meeting title"]
    #[max_length = 100]
    title: String,
    #[description = "Meeting time (e.g., \"2026-04-01 15:00\")"] time: String,
    #[description = "Meeting description"]
    #[max_length = 2000]
    description: Option<String>,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    // The naive time string is interpreted in the faction's timezone.
    let scheduled = match clock::parse_zone(&faction.timezone)
        .and_then(|tz| clock::local_to_utc(&time, tz))
        .and_then(|instant| clock::ensure_future(instant, Utc::now()).map(|()| instant))
    {
        Ok(instant) => instant,
        Err(e) => {
            say_ephemeral(&ctx, e.to_string()).await?;
            return Ok(());
        }
    };

    let Some(channel) = faction
        .meeting_channel_id
        .as_deref()
        .and_then(parse_channel_id)
    else {
        say_ephemeral(
            &ctx,
            "No meeting channel configured. Use `/config channels` to set one up.",
        )
        .await?;
        return Ok(());
    };

    let db = &ctx.data().db;
    let meeting_id = db.create_meeting(
        faction.id,
        &title,
        description.as_deref(),
        &clock::to_sqlite(scheduled),
        &member.user_id,
        false,
    )?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("📅 {}", title))
        .description(
            description
                .clone()
                .unwrap_or_else(|| "No description provided.".to_string()),
        )
        .field(
            "Time",
            format!(
                "{} ({})",
                clock::discord_timestamp(scheduled, 'F'),
                clock::discord_timestamp(scheduled, 'R')
            ),
            true,
        )
        .field("Scheduled by", format!("<@{}>", member.user_id), true)
        .field("RSVP", "✅ attending • ❔ maybe • ❌ declined", false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Meeting ID: {}",
            meeting_id
        )))
        .color(0x5865F2);

    let announcement = match channel
        .send_message(
            &ctx.serenity_context().http,
            serenity::CreateMessage::new()
                .content("@everyone New meeting scheduled!")
                .embed(embed),
        )
        .await
    {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to announce meeting {}: {}", meeting_id, e);
            say_ephemeral(
                &ctx,
                "Could not find meeting channel or it is not a text channel.",
            )
            .await?;
            return Ok(());
        }
    };
    db.set_meeting_message(
        meeting_id,
        faction.id,
        &channel.to_string(),
        &announcement.id.to_string(),
    )?;
    info!(
        "Meeting {} scheduled for {} in faction {}",
        meeting_id, scheduled, faction.id
    );

    // RSVP window collects until the meeting starts.
    let sink = Arc::new(RsvpSink {
        db: db.clone(),
        meeting_id,
        title: title.clone(),
        scheduled_at: scheduled,
    });
    ctx.data().actions.spawn_window(
        ctx.serenity_context().clone(),
        ctx.data().bot_id,
        announcement,
        ActionId::MeetingRsvp(meeting_id),
        RSVP_EMOJIS.iter().map(|e| e.to_string()).collect(),
        scheduled,
        sink,
    );

    // The reminder is only armed while its trigger is still ahead.
    if let Some(delay) = clock::reminder_delay(scheduled, Utc::now()) {
        let http = ctx.serenity_context().http.clone();
        let reminder_title = title.clone();
        let when = clock::discord_timestamp(scheduled, 'R');
        ctx.data().actions.spawn_timer(
            ActionId::MeetingReminder(meeting_id),
            delay,
            async move {
                channel
                    .send_message(
                        &http,
                        serenity::CreateMessage::new().content(format!(
                            "⏰ @everyone Meeting **{}** starts {}.",
                            reminder_title, when
                        )),
                    )
                    .await?;
                Ok(())
            },
        );
    }

    say_ephemeral(&ctx, format!("Meeting scheduled! View it in <#{}>", channel)).await?;
    Ok(())
}

/// Call an emergency meeting
#[poise::command(slash_command)]
pub async fn emergency(
    ctx: Context<'_>,
    #[description = "Reason for emergency meeting"]
    #[max_length = 2000]
    reason: String,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    let Some(channel) = faction
        .meeting_channel_id
        .as_deref()
        .and_then(parse_channel_id)
    else {
        say_ephemeral(
            &ctx,
            "No meeting channel configured. Use `/config channels` to set one up.",
        )
        .await?;
        return Ok(());
    };

    let now = Utc::now();
    let db = &ctx.data().db;
    let meeting_id = db.create_meeting(
        faction.id,
        "Emergency Meeting",
        Some(&reason),
        &clock::to_sqlite(now),
        &member.user_id,
        true,
    )?;

    let embed = serenity::CreateEmbed::new()
        .title("🚨 Emergency Meeting")
        .description(reason)
        .field("Called by", format!("<@{}>", member.user_id), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Meeting ID: {}",
            meeting_id
        )))
        .color(0xED4245);

    let announcement = match channel
        .send_message(
            &ctx.serenity_context().http,
            serenity::CreateMessage::new()
                .content("@everyone Emergency meeting called!")
                .embed(embed),
        )
        .await
    {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to announce emergency meeting {}: {}", meeting_id, e);
            say_ephemeral(
                &ctx,
                "Could not find meeting channel or it is not a text channel.",
            )
            .await?;
            return Ok(());
        }
    };
    db.set_meeting_message(
        meeting_id,
        faction.id,
        &channel.to_string(),
        &announcement.id.to_string(),
    )?;
    info!(
        "Emergency meeting {} called in faction {}",
        meeting_id, faction.id
    );

    say_ephemeral(
        &ctx,
        format!("Emergency meeting announced in <#{}>", channel),
    )
    .await?;
    Ok(())
}

/// Cancel a meeting
#[poise::command(slash_command)]
pub async fn cancel(
    ctx: Context<'_>,
    #[description = "Meeting ID"] meeting_id: i64,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    let db = &ctx.data().db;
    let Some(meeting) = db.get_meeting(meeting_id, faction.id)? else {
        say_ephemeral(
            &ctx,
            "Meeting not found or does not belong to this faction.",
        )
        .await?;
        return Ok(());
    };

    db.delete_meeting(meeting_id, faction.id)?;
    // Unsubscribe the open RSVP window and reminder; no finalization runs.
    ctx.data().actions.cancel(ActionId::MeetingRsvp(meeting_id));
    ctx.data()
        .actions
        .cancel(ActionId::MeetingReminder(meeting_id));
    info!(
        "Meeting {} canceled by {} in faction {}",
        meeting_id, member.user_id, faction.id
    );

    // Best-effort rewrite of the announcement message.
    let channel = meeting.channel_id.as_deref().and_then(parse_channel_id);
    let message_id = meeting
        .message_id
        .as_deref()
        .and_then(|id| id.parse::<u64>().ok());
    if let (Some(channel), Some(message_id)) = (channel, message_id) {
        let when = clock::parse_sqlite_utc(&meeting.scheduled_at)
            .map(|dt| clock::discord_timestamp(dt, 'F'))
            .unwrap_or_else(|| meeting.scheduled_at.clone());
        let embed = serenity::CreateEmbed::new()
            .title(format!("❌ CANCELED: {}", meeting.title))
            .description(
                meeting
                    .description
                    .clone()
                    .unwrap_or_else(|| "No description provided.".to_string()),
            )
            .field("Was scheduled for", when, true)
            .field("Canceled by", format!("<@{}>", member.user_id), true)
            .color(0xED4245);
        if let Err(e) = channel
            .edit_message(
                &ctx.serenity_context().http,
                serenity::MessageId::new(message_id),
                serenity::EditMessage::new()
                    .content("**CANCELED**")
                    .embed(embed),
            )
            .await
        {
            warn!(
                "Failed to update canceled meeting message {}: {}",
                message_id, e
            );
        }
    }

    say_ephemeral(&ctx, "Meeting has been canceled.").await?;
    Ok(())
}

/// Record a member's attendance
#[poise::command(slash_command)]
pub async fn attendance(
    ctx: Context<'_>,
    #[description = "Meeting ID"] meeting_id: i64,
    #[description = "Member"] user: serenity::User,
    #[description = "Attendance status"] status: AttendanceStatus,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };
    if !require_rank(&ctx, &member, Rank::Officer, DENIAL).await? {
        return Ok(());
    }

    let db = &ctx.data().db;
    if db.get_meeting(meeting_id, faction.id)?.is_none() {
        say_ephemeral(
            &ctx,
            "Meeting not found or does not belong to this faction.",
        )
        .await?;
        return Ok(());
    }
    if db.get_member(faction.id, &user.id.to_string())?.is_none() {
        say_ephemeral(&ctx, "The specified user is not a member of this faction.").await?;
        return Ok(());
    }

    db.upsert_attendance(meeting_id, &user.id.to_string(), status.as_str())?;

    say_ephemeral(
        &ctx,
        format!(
            "{} Updated attendance for <@{}> to {}",
            status.emoji(),
            user.id,
            status.as_str()
        ),
    )
    .await?;
    Ok(())
}
