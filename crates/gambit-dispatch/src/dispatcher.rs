//! Message pipeline: sender resolution, registration, and command fan-out.

use crate::command::{CommandContext, CommandDescriptor, CommandList};
use crate::commands::builtin_commands;
use crate::rate_limit::{Clock, SystemClock};
use crate::state::{BotConfig, BotState, TitleFetcher};
use anyhow::Result;
use gambit_store::BotStore;
use gambit_types::{InboundMessage, Privilege, Reply, Sender};
use std::sync::Arc;

/// Assembles a [`Dispatcher`] from a store and optional collaborators.
pub struct DispatcherBuilder {
    store: Arc<dyn BotStore>,
    config: BotConfig,
    clock: Arc<dyn Clock>,
    title_fetcher: Option<Arc<dyn TitleFetcher>>,
    commands: Option<CommandList>,
}

impl DispatcherBuilder {
    pub fn new(store: Arc<dyn BotStore>) -> Self {
        Self {
            store,
            config: BotConfig::default(),
            clock: Arc::new(SystemClock),
            title_fetcher: None,
            commands: None,
        }
    }

    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn title_fetcher(mut self, title_fetcher: Arc<dyn TitleFetcher>) -> Self {
        self.title_fetcher = Some(title_fetcher);
        self
    }

    /// Replaces the built-in command set.
    pub fn commands(mut self, commands: CommandList) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Registers every command with the store and loads its stored privilege.
    pub fn build(self) -> Result<Dispatcher> {
        let commands = match self.commands {
            Some(commands) => commands,
            None => builtin_commands(&self.config.bot_name)?,
        };
        let state = BotState::new(self.store, self.config, self.clock, self.title_fetcher);
        let mut catalog = Vec::with_capacity(commands.len());
        for command in &commands {
            let descriptor = command.descriptor();
            let level = state.store().register_command(descriptor.name)?;
            state.set_live_privilege(descriptor.name, level);
            catalog.push(descriptor);
        }
        tracing::info!(
            bot_name = %state.config().bot_name,
            commands = catalog.len(),
            "dispatcher ready"
        );
        Ok(Dispatcher {
            state,
            commands,
            catalog,
        })
    }
}

/// Routes each inbound message to every matching command.
pub struct Dispatcher {
    state: BotState,
    commands: CommandList,
    catalog: Vec<&'static CommandDescriptor>,
}

impl Dispatcher {
    pub fn builder(store: Arc<dyn BotStore>) -> DispatcherBuilder {
        DispatcherBuilder::new(store)
    }

    /// Dispatcher over `commands` with the system clock and no title lookups.
    pub fn new(store: Arc<dyn BotStore>, config: BotConfig, commands: CommandList) -> Result<Self> {
        DispatcherBuilder::new(store)
            .config(config)
            .commands(commands)
            .build()
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn catalog(&self) -> &[&'static CommandDescriptor] {
        &self.catalog
    }

    /// Handles one message and returns the replies of every command that ran.
    ///
    /// Store failures and handler errors are logged and never abort the
    /// remaining commands.
    #[tracing::instrument(
        skip_all,
        fields(conversation_id = %message.conversation_id, user_id = %message.sender.user_id)
    )]
    pub fn dispatch(&self, message: &InboundMessage) -> Vec<Reply> {
        if message.sender.is_self {
            return Vec::new();
        }
        let message = self.resolve_sender(message);
        let sender = &message.sender;
        let conversation_id = message.conversation_id.as_str();

        if !sender.is_placeholder() && !self.state.is_bot_name(&sender.full_name) {
            if let Err(error) =
                self.state
                    .store()
                    .insert_user(&sender.user_id, conversation_id, &sender.full_name)
            {
                tracing::warn!(error = %error, "failed to register sender");
            }
        }

        let actor_privilege = self
            .state
            .effective_privilege(&sender.full_name, conversation_id)
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "failed to read sender privilege");
                Privilege::ZERO
            });
        tracing::info!(
            actor = %sender.full_name,
            privilege = %actor_privilege,
            text = %message.text,
            "message received"
        );

        let ctx = CommandContext {
            state: &self.state,
            catalog: &self.catalog,
            message: &message,
            actor_privilege,
        };
        let mut replies = Vec::new();
        for command in &self.commands {
            let Some(invocation) = command.prepare(&ctx) else {
                continue;
            };
            let descriptor = command.descriptor();
            let required = self.state.required_privilege(descriptor);
            if !actor_privilege.allows(required) {
                tracing::debug!(
                    command = descriptor.name,
                    required = %required,
                    "insufficient privilege"
                );
                continue;
            }
            match invocation.run(&ctx) {
                Ok(produced) => {
                    tracing::debug!(command = descriptor.name, replies = produced.len(), "command ran");
                    replies.extend(produced.into_iter().filter(|reply| !reply.is_empty()));
                }
                Err(error) => {
                    tracing::warn!(
                        command = descriptor.name,
                        error = %format!("{error:#}"),
                        "command failed"
                    );
                }
            }
        }

        self.state
            .remember_message(conversation_id, sender, &message.text);
        replies
    }

    /// Swaps the placeholder name for the one bound to the sender's id.
    fn resolve_sender(&self, message: &InboundMessage) -> InboundMessage {
        let mut resolved = message.clone();
        if !message.sender.is_placeholder() {
            return resolved;
        }
        match self
            .state
            .store()
            .find_user(&message.sender.user_id, &message.conversation_id)
        {
            Ok(Some(user)) => {
                resolved.sender = Sender {
                    full_name: user.full_name,
                    ..message.sender.clone()
                };
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(error = %error, "failed to resolve placeholder sender"),
        }
        resolved
    }
}
