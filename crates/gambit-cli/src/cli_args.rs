use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

fn parse_non_negative_i64(value: &str) -> Result<i64, String> {
    let parsed = value
        .parse::<i64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed < 0 {
        return Err("value must be 0 or greater".to_string());
    }
    Ok(parsed)
}

fn parse_bot_name(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err("bot name must be a single word".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "gambit",
    about = "Rule-based chat bot with karma, quotes, votes, and privileges",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "GAMBIT_DATABASE",
        default_value = ".gambit/gambit.sqlite",
        help = "SQLite database file, created with its schema when missing"
    )]
    pub(crate) database: PathBuf,

    #[arg(
        long = "in-memory",
        env = "GAMBIT_IN_MEMORY",
        default_value_t = false,
        help = "Keep all state in memory instead of SQLite"
    )]
    pub(crate) in_memory: bool,

    #[arg(
        long = "bot-name",
        env = "GAMBIT_BOT_NAME",
        default_value = "gambit",
        value_parser = parse_bot_name,
        help = "Word that addresses the bot ('gambit: help') and the bot's own display name"
    )]
    pub(crate) bot_name: String,

    #[arg(
        long = "admin",
        env = "GAMBIT_ADMINS",
        value_delimiter = ',',
        help = "Full names granted unrestricted privilege"
    )]
    pub(crate) admin: Vec<String>,

    #[arg(
        long = "admins-file",
        env = "GAMBIT_ADMINS_FILE",
        help = "Newline-separated admin full names, merged with --admin"
    )]
    pub(crate) admins_file: Option<PathBuf>,

    #[arg(
        long = "image-dir",
        env = "GAMBIT_IMAGE_DIR",
        default_value = ".gambit/images",
        help = "Directory holding images sent by reaction commands"
    )]
    pub(crate) image_dir: PathBuf,

    #[arg(
        long = "honorific-threshold",
        env = "GAMBIT_HONORIFIC_THRESHOLD",
        default_value_t = 75,
        value_parser = parse_non_negative_i64,
        help = "Karma needed before a user can be titled Lord or King"
    )]
    pub(crate) honorific_threshold: i64,

    #[arg(
        long,
        env = "GAMBIT_CONVERSATION",
        default_value = "console",
        help = "Conversation id used for console messages"
    )]
    pub(crate) conversation: String,

    #[arg(
        long,
        env = "GAMBIT_USER",
        default_value = "Console User",
        help = "Full name of the default console speaker"
    )]
    pub(crate) user: String,

    #[arg(
        long = "user-id",
        env = "GAMBIT_USER_ID",
        help = "Platform id of the default console speaker; derived from --user when omitted"
    )]
    pub(crate) user_id: Option<String>,

    #[arg(
        long = "fetch-url-titles",
        env = "GAMBIT_FETCH_URL_TITLES",
        default_value_t = false,
        help = "Look up page titles for links posted in chat"
    )]
    pub(crate) fetch_url_titles: bool,

    #[arg(
        long = "event-log",
        env = "GAMBIT_EVENT_LOG",
        help = "Append one JSON line per dispatched message to this file"
    )]
    pub(crate) event_log: Option<PathBuf>,

    #[arg(
        long = "log-level",
        env = "GAMBIT_LOG_LEVEL",
        default_value = "warn",
        help = "Default tracing level when RUST_LOG is unset"
    )]
    pub(crate) log_level: LevelFilter,
}
