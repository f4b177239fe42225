use crate::chat::{ChatSession, RequestDispatcher, Sender};
use crate::cli::Args;
use crate::commands::{ChatState, SessionFactory, dispatcher::CommandDispatcher};
use crate::config::Config;
use crate::core::error::DocChatError;
use crate::display::{self, TerminalView};
use crate::input;
use crate::service::RemoteService;
use console::style;
use is_terminal::IsTerminal;
use std::future::Future;
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

pub struct Application {
    pub args: Args,
    pub config: Config,
    pub service: Arc<RemoteService>,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(
        args: Args,
        config: Config,
        command_dispatcher: CommandDispatcher,
    ) -> Result<Self, DocChatError> {
        let service = Arc::new(RemoteService::new(&config.service)?);
        Ok(Self {
            args,
            config,
            service,
            command_dispatcher,
        })
    }

    pub async fn run(&mut self) -> Result<ExitCode, DocChatError> {
        if self.args.chat {
            self.handle_continuous_chat_mode().await?;
            return Ok(ExitCode::SUCCESS);
        }

        let context = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| DocChatError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };
        self.handle_one_shot_mode(context).await
    }

    fn session_factory(&self) -> SessionFactory {
        let service = self.service.clone();
        let idle_timeout = Duration::from_secs(self.config.service.stream_idle_timeout_secs);
        let settings = self.config.chat.clone();
        Box::new(move || {
            let dispatcher = RequestDispatcher::new(service.clone(), idle_timeout);
            ChatSession::new(dispatcher, &settings).with_observer(Box::new(TerminalView::new()))
        })
    }

    async fn handle_one_shot_mode(&self, context: Option<String>) -> Result<ExitCode, DocChatError> {
        let query = match (self.args.query.as_deref(), context) {
            (Some(query), Some(piped)) => format!("{}\n\n{}", piped.trim(), query),
            (None, Some(piped)) => piped,
            (Some(query), None) => query.to_string(),
            (None, None) => {
                return Err(DocChatError::Input(
                    "No query provided; pass one as an argument or use --chat".to_string(),
                ));
            }
        };

        let mut session = (self.session_factory())();
        session.compose_draft(query);
        let outcome = until_interrupted(session.send()).await?;
        if let Interrupted::Yes = outcome {
            cancel_turn(&mut session);
            return Ok(ExitCode::FAILURE);
        }

        let failed = session
            .messages()
            .last()
            .is_none_or(|reply| reply.sender != Sender::Assistant || reply.is_error);
        Ok(if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }

    async fn handle_continuous_chat_mode(&mut self) -> Result<(), DocChatError> {
        let mut state = ChatState::new(
            self.session_factory(),
            self.service.clone(),
            self.service.clone(),
        );

        println!(
            "Chatting with {} ({} mode, category {}). Type '/help' for available commands. Press Ctrl+D or type /quit to exit.",
            style(&self.config.service.base_url).cyan(),
            state.session.mode(),
            state.session.category()
        );

        let mut editor = input::create_editor(&self.command_dispatcher)?;

        loop {
            let input = match input::read_input(&mut editor)? {
                Some(input) => input.trim().to_string(),
                None => break,
            };

            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                let result =
                    until_interrupted(self.command_dispatcher.execute_line(&input, &mut state))
                        .await;
                match result {
                    Ok(Interrupted::No(Some(output))) => println!("{}", output),
                    Ok(Interrupted::No(None)) => {}
                    Ok(Interrupted::Yes) => cancel_turn(&mut state.session),
                    Err(e) => display::display_error(&format!("Error executing command: {}", e)),
                }

                if !state.should_continue {
                    break;
                }
                continue;
            }

            state.session.compose_draft(input);
            match until_interrupted(state.session.send()).await {
                Ok(Interrupted::No(_)) => {}
                Ok(Interrupted::Yes) => cancel_turn(&mut state.session),
                Err(e) => display::display_error(&e.to_string()),
            }
        }

        state.session.cancel();
        input::save_history(&mut editor)?;

        Ok(())
    }
}

enum Interrupted<T> {
    No(T),
    Yes,
}

/// Runs `work` until it finishes or the user presses Ctrl-C, whichever comes first.
/// On Ctrl-C the future is dropped before this returns.
async fn until_interrupted<T, F>(work: F) -> Result<Interrupted<T>, DocChatError>
where
    F: Future<Output = Result<T, DocChatError>>,
{
    tokio::select! {
        result = work => result.map(Interrupted::No),
        _ = tokio::signal::ctrl_c() => Ok(Interrupted::Yes),
    }
}

fn cancel_turn(session: &mut ChatSession) {
    session.cancel();
    display::display_notice("Request cancelled.");
}
