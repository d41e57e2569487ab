use crate::actions::{self, ActionId, VoteSink};
use crate::clock;
use crate::commands::{member_context, say_ephemeral};
use crate::db::Database;
use crate::validate::{parse_poll_options, validate_poll_duration};
use crate::{Context, Error};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::info;

/// Numbered reactions in declared order; index i is the i-th poll option.
const POLL_EMOJIS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];

const DEFAULT_POLL_MINUTES: i64 = 60;

/// Persists one vote per (poll, user) and writes the finalized result when
/// the window closes. The tally comes from the stored votes, so the bot's
/// seed reactions never count.
struct PollSink {
    db: Database,
    poll_id: i64,
    faction_id: i64,
    question: String,
    labels: Vec<String>,
}

#[async_trait]
impl VoteSink for PollSink {
    async fn record(&self, user_id: u64, option_index: usize) -> anyhow::Result<()> {
        if option_index >= self.labels.len() {
            anyhow::bail!("poll option {} out of range", option_index);
        }
        self.db
            .record_poll_vote(self.poll_id, &user_id.to_string(), option_index)
    }

    async fn finalize(
        &self,
        ctx: &serenity::Context,
        message: &mut serenity::Message,
    ) -> anyhow::Result<()> {
        let tallies = self.db.poll_tallies(self.poll_id, self.labels.len())?;
        let summary = actions::summarize(&self.labels, &tallies);
        let winner = &summary.results[summary.winner];

        let mut lines: Vec<String> = summary
            .results
            .iter()
            .zip(POLL_EMOJIS)
            .map(|(result, emoji)| {
                format!(
                    "{} {}\nVotes: {} ({}%)",
                    emoji, result.label, result.votes, result.percent
                )
            })
            .collect();
        lines.push(format!(
            "**Winner:** {} with {} votes!",
            winner.label, winner.votes
        ));

        let embed = serenity::CreateEmbed::new()
            .title(format!("📊 Poll Results: {}", self.question))
            .description(lines.join("\n\n"))
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Poll ended • Total votes: {}",
                summary.total
            )))
            .color(0x57F287);

        message
            .edit(ctx, serenity::EditMessage::new().embed(embed))
            .await?;

        self.db.close_poll(
            self.poll_id,
            self.faction_id,
            &winner.label,
            summary.total as i64,
        )?;
        Ok(())
    }
}

/// Create a poll
#[poise::command(slash_command, guild_only)]
pub async fn poll(
    ctx: Context<'_>,
    #[description = "Poll question"]
    #[max_length = 200]
    question: String,
    #[description = "Poll options (comma-separated)"]
    #[max_length = 1000]
    options: String,
    #[description = "Poll duration in minutes"]
    #[min = 1]
    #[max = 10080]
    duration: Option<i64>,
) -> Result<(), Error> {
    let Some((faction, member)) = member_context(&ctx).await? else {
        return Ok(());
    };

    let labels = match parse_poll_options(&options) {
        Ok(labels) => labels,
        Err(e) => {
            say_ephemeral(&ctx, e.to_string()).await?;
            return Ok(());
        }
    };
    let minutes = duration.unwrap_or(DEFAULT_POLL_MINUTES);
    if let Err(e) = validate_poll_duration(minutes) {
        say_ephemeral(&ctx, e.to_string()).await?;
        return Ok(());
    }

    let end_time = Utc::now() + Duration::minutes(minutes);
    let options_json = serde_json::to_string(&labels)?;
    let poll_id = ctx.data().db.create_poll(
        faction.id,
        &member.user_id,
        &question,
        &options_json,
        &clock::to_sqlite(end_time),
    )?;
    info!(
        "Poll {} with {} options created in faction {}",
        poll_id,
        labels.len(),
        faction.id
    );

    let mut description: Vec<String> = labels
        .iter()
        .zip(POLL_EMOJIS)
        .map(|(label, emoji)| format!("{} {}", emoji, label))
        .collect();
    description.push(format!(
        "Poll ends: {}",
        clock::discord_timestamp(end_time, 'R')
    ));

    let embed = serenity::CreateEmbed::new()
        .title(format!("📊 {}", question))
        .description(description.join("\n\n"))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Created by {} • React with the emojis to vote!",
            ctx.author().name
        )))
        .color(0x5865F2);

    let reply = ctx.send(poise::CreateReply::default().embed(embed)).await?;
    let message = reply.message().await?.into_owned();

    let emojis: Vec<String> = POLL_EMOJIS[..labels.len()]
        .iter()
        .map(|e| e.to_string())
        .collect();
    let sink = Arc::new(PollSink {
        db: ctx.data().db.clone(),
        poll_id,
        faction_id: faction.id,
        question,
        labels,
    });
    ctx.data().actions.spawn_window(
        ctx.serenity_context().clone(),
        ctx.data().bot_id,
        message,
        ActionId::Poll(poll_id),
        emojis,
        end_time,
        sink,
    );

    Ok(())
}
