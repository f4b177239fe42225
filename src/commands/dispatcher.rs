use super::{
    ChatState,
    dataset::DatasetCommand,
    documents::{
        CategoriesCommand, DocsCommand, RemoveCommand, UnuseCommand, UploadCommand, UseCommand,
        ViewCommand,
    },
    handler::{
        CategoryCommand, EditCommand, HelpCommand, HistoryCommand, ModeCommand, NewChatCommand,
        QuitCommand, RetryCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::DocChatError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, DocChatError> {
        self.registry.execute(command, args, state).await
    }

    /// Splits a `/command arg...` line and runs it.
    pub async fn execute_line(
        &self,
        line: &str,
        state: &mut ChatState,
    ) -> Result<Option<String>, DocChatError> {
        let line = line.trim().trim_start_matches('/');
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        self.execute(command, &args, state).await
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("exit", QuitCommand);
    registry.register("help", HelpCommand);
    registry.register("new", NewChatCommand);
    registry.register("history", HistoryCommand);
    registry.register("mode", ModeCommand);
    registry.register("category", CategoryCommand);
    registry.register("categories", CategoriesCommand);
    registry.register("docs", DocsCommand);
    registry.register("use", UseCommand);
    registry.register("unuse", UnuseCommand);
    registry.register("view", ViewCommand);
    registry.register("upload", UploadCommand);
    registry.register("remove", RemoveCommand);
    registry.register("edit", EditCommand);
    registry.register("retry", RetryCommand);
    registry.register("dataset", DatasetCommand);

    CommandDispatcher::new(Arc::new(registry))
}
