use crate::auth::{self, Rank, Resolution};
use crate::db::{FactionRecord, MemberRecord};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

pub mod config;
pub mod fine;
pub mod general;
pub mod meeting;
pub mod poll;
pub mod profile;
pub mod radio;
pub mod register;

pub(crate) async fn say_ephemeral(
    ctx: &Context<'_>,
    content: impl Into<String>,
) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content.into())
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Resolves the invocation to its (faction, member) pair. Replies with the
/// fixed rejection and yields `None` when the guild has no faction or the
/// invoker is not a member.
pub(crate) async fn member_context(
    ctx: &Context<'_>,
) -> Result<Option<(FactionRecord, MemberRecord)>, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    match auth::resolve(&ctx.data().db, guild_id.get(), ctx.author().id.get())? {
        Resolution::Unregistered => {
            say_ephemeral(
                ctx,
                "This server does not have a registered faction. Use `/register` first.",
            )
            .await?;
            Ok(None)
        }
        Resolution::NotAMember => {
            say_ephemeral(ctx, "You are not a member of this faction.").await?;
            Ok(None)
        }
        Resolution::Authorized { faction, member } => Ok(Some((faction, member))),
    }
}

/// Rank gate; replies with `denial` and yields false below `required`.
pub(crate) async fn require_rank(
    ctx: &Context<'_>,
    member: &MemberRecord,
    required: Rank,
    denial: &str,
) -> Result<bool, Error> {
    if auth::has_rank(member, required) {
        Ok(true)
    } else {
        say_ephemeral(ctx, denial).await?;
        Ok(false)
    }
}

pub(crate) fn parse_channel_id(raw: &str) -> Option<serenity::ChannelId> {
    raw.parse::<u64>().ok().map(serenity::ChannelId::new)
}
