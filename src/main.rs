use factord::commands::config as faction_config;
use factord::commands::{fine, general, meeting, poll, profile, radio, register};
use factord::{actions::ActionRegistry, config::Config, Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

/// Failure boundary: every failed invocation gets exactly one generic reply,
/// and a failure to send that reply is only logged.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command /{} failed: {}",
                ctx.command().qualified_name,
                error
            );
            if let Err(e) = ctx
                .say("An error occurred while processing your command.")
                .await
            {
                error!("Failed to send error reply: {}", e);
            }
        }
        poise::FrameworkError::CommandPanic { ctx, .. } => {
            error!("Command /{} panicked", ctx.command().qualified_name);
            if let Err(e) = ctx
                .say("An error occurred while processing your command.")
                .await
            {
                error!("Failed to send error reply: {}", e);
            }
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            if let Err(e) = ctx.say("This command can only be used in a server.").await {
                error!("Failed to send guild-only reply: {}", e);
            }
        }
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            if let Err(e) = ctx
                .say("You do not have the required permissions for this command.")
                .await
            {
                error!("Failed to send permission reply: {}", e);
            }
        }
        poise::FrameworkError::UnknownInteraction {
            ctx, interaction, ..
        } => {
            warn!("Unknown command interaction: {}", interaction.data.name);
            if let Err(e) = interaction
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content("Unknown command.")
                            .ephemeral(true),
                    ),
                )
                .await
            {
                error!("Failed to send unknown-command reply: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                general::help(),
                general::ping(),
                register::register(),
                profile::profile(),
                fine::fine(),
                meeting::meeting(),
                radio::radio(),
                poll::poll(),
                faction_config::config(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                match config.dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                    }
                }

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(
                    config.status_message.clone(),
                )));

                let db = factord::db::Database::new(&config).expect("Failed to open database");
                db.execute_init().expect("Failed to initialize database");

                Ok(Data {
                    config,
                    db,
                    actions: ActionRegistry::new(),
                    bot_id: ready.user.id.get(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
