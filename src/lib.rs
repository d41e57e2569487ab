pub mod actions;
pub mod auth;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod validate;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub db: db::Database,
    pub actions: actions::ActionRegistry,
    /// Bot's own user ID, used to ignore its seed reactions
    pub bot_id: u64,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
