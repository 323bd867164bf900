//! REPL commands and their handling.

use std::io::{self, Write};

use anyhow::Context;
use chatwire_client::{ChatSession, StreamError, StreamOutcome, KNOWN_AGENTS};
use chatwire_core::{Message, MessageId, Sender, SessionId};

use crate::render::{format_reply, has_think, LiveReply};

/// Help text for the REPL.
pub const HELP: &str = "\
Type a message and press Enter to send it.
Ctrl-C stops a streaming reply; when idle it quits.

Commands:
  /new             start a new conversation
  /sessions        list stored conversations
  /load <id>       continue a stored conversation
  /delete <id>     delete a stored conversation
  /models          list available models
  /model <name>    select a model
  /agents          list agents
  /agent <name>    select an agent
  /help            show this help
  /quit            exit";

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat message.
    Send(String),
    New,
    Sessions,
    Load(String),
    Delete(String),
    Models,
    Model(String),
    Agents,
    Agent(String),
    Help,
    Quit,
    /// A command that needs an argument was given none.
    MissingArgument(&'static str),
    /// Not a known command.
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(body) = line.strip_prefix('/') else {
        return Some(Command::Send(line.to_string()));
    };

    let (name, arg) = match body.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (body, ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    let command = match (name, arg) {
        ("new", _) => Command::New,
        ("sessions", _) => Command::Sessions,
        ("load", Some(id)) => Command::Load(id),
        ("load", None) => Command::MissingArgument("/load <id>"),
        ("delete", Some(id)) => Command::Delete(id),
        ("delete", None) => Command::MissingArgument("/delete <id>"),
        ("models", _) => Command::Models,
        ("model", Some(name)) => Command::Model(name),
        ("model", None) => Command::MissingArgument("/model <name>"),
        ("agents", _) => Command::Agents,
        ("agent", Some(name)) => Command::Agent(name),
        ("agent", None) => Command::MissingArgument("/agent <name>"),
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        (other, _) => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// Whether the REPL keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// REPL state.
#[derive(Debug)]
pub struct App {
    session: ChatSession,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }

    /// Prompt showing the current selection.
    pub fn prompt(&self) -> String {
        format!("{}/{}> ", self.session.agent(), self.session.model())
    }

    /// Fetch the model list at startup; failures are reported, not fatal.
    pub async fn load_models(&mut self) {
        match self.session.refresh_models().await {
            Ok(models) => tracing::debug!(count = models.len(), "Loaded models"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load models");
                eprintln!("warning: could not load models ({e}); using {}", self.session.model());
            }
        }
    }

    /// Run one command.
    ///
    /// # Errors
    ///
    /// Returns an error for failed backend calls or bad arguments; the REPL
    /// reports it and goes on.
    pub async fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Send(text) => self.send(&text).await?,
            Command::New => {
                self.session.new_chat();
                println!("Started a new conversation.");
            }
            Command::Sessions => self.list_sessions().await?,
            Command::Load(id) => {
                let id = SessionId::new(id).context("invalid session id")?;
                self.session.load_session(&id).await?;
                self.print_transcript();
            }
            Command::Delete(id) => {
                let id = SessionId::new(id).context("invalid session id")?;
                self.session.delete_session(&id).await?;
                println!("Deleted {id}.");
            }
            Command::Models => {
                self.session.refresh_models().await?;
                let current = self.session.model();
                for model in self.session.models() {
                    println!("{} {model}", marker(model == &current));
                }
            }
            Command::Model(name) => {
                self.session.select_model(&name)?;
                println!("Model: {}", self.session.model());
            }
            Command::Agents => {
                let current = self.session.agent();
                for agent in KNOWN_AGENTS {
                    println!("{} {agent}", marker(*agent == current));
                }
            }
            Command::Agent(name) => {
                self.session.select_agent(&name)?;
                println!("Agent: {}", self.session.agent());
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
            Command::MissingArgument(usage) => anyhow::bail!("usage: {usage}"),
            Command::Unknown(name) => anyhow::bail!("unknown command /{name} (try /help)"),
        }
        Ok(Flow::Continue)
    }

    /// Send a message and print the reply as it streams.
    ///
    /// Ctrl-C while streaming cancels the reply and keeps what arrived.
    async fn send(&mut self, text: &str) -> anyhow::Result<()> {
        let handle = self.session.send(text)?;
        let id = handle.message_id();
        let mut changes = self.session.conversation().subscribe();
        let mut live = LiveReply::new();
        let mut stdout = io::stdout();

        let outcome = handle.wait();
        tokio::pin!(outcome);

        let outcome = loop {
            tokio::select! {
                result = &mut outcome => break result,
                changed = changes.changed() => {
                    if changed.is_ok() {
                        self.print_update(id, &mut live, &mut stdout)?;
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl-C")?;
                    self.session.cancel();
                }
            }
        };

        self.print_update(id, &mut live, &mut stdout)?;
        if live.printed_text() {
            println!();
        }
        self.finish_reply(id, outcome);
        Ok(())
    }

    fn print_update(
        &self,
        id: MessageId,
        live: &mut LiveReply,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let message = self.session.conversation().read(|c| c.message(id).cloned());
        match message {
            Some(message) => live.update(&message, out),
            None => Ok(()),
        }
    }

    fn finish_reply(&self, id: MessageId, outcome: Result<StreamOutcome, StreamError>) {
        match outcome {
            Ok(StreamOutcome::Completed | StreamOutcome::Ended) => {}
            Ok(StreamOutcome::Cancelled) => eprintln!("[stopped]"),
            Err(e) => eprintln!("[{e}]"),
        }

        let text = self
            .session
            .conversation()
            .read(|c| c.message(id).map(|m| m.text.clone()))
            .unwrap_or_default();
        if has_think(&text) {
            println!("\n{}", format_reply(&text).trim_end());
        }
    }

    async fn list_sessions(&self) -> anyhow::Result<()> {
        let sessions = self.session.list_sessions().await?;
        if sessions.is_empty() {
            println!("No stored conversations.");
            return Ok(());
        }

        let current = self
            .session
            .conversation()
            .read(|c| c.session_id().cloned());
        for summary in sessions {
            let updated = summary
                .updated_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let selection = format!(
                "{}/{}",
                summary.agent_name.as_deref().unwrap_or("?"),
                summary.model.as_deref().unwrap_or("?")
            );
            println!(
                "{} {}  {:<16}  {:>3} msgs  {}  {}",
                marker(current.as_ref() == Some(&summary.session_id)),
                summary.session_id,
                selection,
                summary.message_count,
                updated,
                preview(&summary.first_message, 40),
            );
        }
        Ok(())
    }

    fn print_transcript(&self) {
        let conversation = self.session.conversation().snapshot();
        println!(
            "Loaded {} ({} messages, {}/{})",
            conversation
                .session_id()
                .map(SessionId::as_str)
                .unwrap_or_default(),
            conversation.messages().len(),
            conversation.agent(),
            conversation.model()
        );
        for message in conversation.messages() {
            println!("{}", transcript_entry(message, conversation.agent()));
        }
    }
}

fn marker(selected: bool) -> char {
    if selected {
        '*'
    } else {
        ' '
    }
}

fn transcript_entry(message: &Message, agent: &str) -> String {
    match message.sender {
        Sender::User => format!("you: {}", message.text),
        Sender::Assistant => format!("{agent}: {}", format_reply(&message.text).trim_end()),
    }
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
