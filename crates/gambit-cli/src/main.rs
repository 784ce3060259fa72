mod admins;
mod bootstrap_helpers;
mod cli_args;
mod console_transport;
mod event_log;
mod url_title;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gambit_dispatch::{BotConfig, Dispatcher};
use gambit_store::{BotStore, InMemoryBotStore, SqliteBotStore};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::admins::load_admins;
use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::console_transport::ConsoleTransport;
use crate::event_log::{DispatchRecord, JsonlEventLog};
use crate::url_title::HttpTitleFetcher;

fn open_store(cli: &Cli) -> Result<Arc<dyn BotStore>> {
    if cli.in_memory {
        return Ok(Arc::new(InMemoryBotStore::new()));
    }
    if let Some(parent) = cli.database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = SqliteBotStore::new(&cli.database)
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;
    Ok(Arc::new(store))
}

fn build_dispatcher(cli: &Cli) -> Result<Dispatcher> {
    let config = BotConfig {
        bot_name: cli.bot_name.clone(),
        image_dir: cli.image_dir.clone(),
        honorific_threshold: cli.honorific_threshold,
        admins: load_admins(&cli.admin, cli.admins_file.as_deref())?,
        rng_seed: None,
    };
    let mut builder = Dispatcher::builder(open_store(cli)?).config(config);
    if cli.fetch_url_titles {
        builder = builder.title_fetcher(Arc::new(HttpTitleFetcher::new()?));
    }
    builder.build().context("failed to register commands")
}

async fn run(cli: Cli) -> Result<()> {
    let transport = ConsoleTransport::new(&cli.conversation, &cli.user, cli.user_id.as_deref())?;
    let event_log = cli.event_log.clone().map(JsonlEventLog::open).transpose()?;
    let dispatcher = tokio::task::spawn_blocking(move || build_dispatcher(&cli))
        .await
        .context("dispatcher setup task failed")??;
    let dispatcher = Arc::new(dispatcher);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some(message) = transport.parse_line(&line) else {
            continue;
        };
        let worker = Arc::clone(&dispatcher);
        let (message, replies) = tokio::task::spawn_blocking(move || {
            let replies = worker.dispatch(&message);
            (message, replies)
        })
        .await
        .context("dispatch task failed")?;

        for payload in ConsoleTransport::render(&replies) {
            println!("{payload}");
        }
        if let Some(log) = &event_log {
            if let Err(error) = log.append(&DispatchRecord::new(&message, &replies)) {
                tracing::warn!(error = %format!("{error:#}"), "failed to append event log");
            }
        }
    }

    // The blocking HTTP client may not be dropped on an async worker.
    tokio::task::spawn_blocking(move || drop(dispatcher))
        .await
        .context("shutdown task failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use gambit_types::{InboundMessage, Reply, Sender};

    #[test]
    fn integration_sqlite_state_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database = dir.path().join("nested/gambit.sqlite");
        let cli = Cli::try_parse_from([
            "gambit",
            "--database",
            database.to_str().expect("utf8 path"),
            "--admin",
            "Console User",
        ])
        .expect("parse");

        let message = InboundMessage::new("console", Sender::new("u-1", "Brad Johns"), "poop++");
        let first = build_dispatcher(&cli).expect("dispatcher");
        assert_eq!(
            first.dispatch(&message),
            vec![Reply::text("Gave karma to poop, total: 1")]
        );
        drop(first);

        let second = build_dispatcher(&cli).expect("dispatcher");
        let query = InboundMessage::new("console", Sender::new("u-1", "Brad Johns"), "karma poop");
        assert_eq!(
            second.dispatch(&query),
            vec![Reply::text("Karma for poop: 1.")]
        );
        assert!(second.state().is_admin("console user"));
    }

    #[tokio::test]
    async fn functional_dispatch_runs_on_blocking_worker() {
        let cli = Cli::try_parse_from(["gambit", "--in-memory"]).expect("parse");
        let dispatcher = Arc::new(
            tokio::task::spawn_blocking(move || build_dispatcher(&cli))
                .await
                .expect("join")
                .expect("dispatcher"),
        );
        let transport = ConsoleTransport::new("console", "Console User", None).expect("transport");
        let message = transport.parse_line("@Sam Hill: gambit: list aliases").expect("message");
        let worker = Arc::clone(&dispatcher);
        let replies = tokio::task::spawn_blocking(move || worker.dispatch(&message))
            .await
            .expect("join");
        assert_eq!(ConsoleTransport::render(&replies), ["There are no aliases."]);
    }
}
