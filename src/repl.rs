use crate::auth::AuthGate;
use crate::config::{ Model, Preferences };
use crate::dispatcher::{ MessageDispatcher, SendOutcome, SkipReason };
use crate::error::Result;
use crate::history::ChatGroup;
use crate::models::chat::{ Conversation, Role };
use chrono::Local;
use log::{ debug, error };
use std::io::Write;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt };

pub const WELCOME: &str = "How can I help you today?";

pub const SUGGESTIONS: [(&str, &str); 4] = [
    ("Write a story", "about a robot learning to paint"),
    ("Explain quantum computing", "in simple terms"),
    ("Help me debug", "my Python code"),
    ("Plan a trip", "to Tokyo for 5 days"),
];

const HELP: &str =
    "Commands: /new, /list, /open <id>, /delete <id>, /suggest <n>, /theme, /model [name], /logout, /help, /quit. Start a message with // to send a leading /";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Send(String),
    New,
    List,
    Open(i64),
    Delete(i64),
    Suggest(usize),
    Theme,
    Model(Option<String>),
    Logout,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if let Some(literal) = trimmed.strip_prefix("//") {
        return ReplCommand::Send(format!("/{}", literal));
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplCommand::Send(line.to_string());
    };
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let parse_id = |arg: Option<&str>| arg.and_then(|a| a.parse::<i64>().ok());
    match name {
        "new" => ReplCommand::New,
        "list" => ReplCommand::List,
        "open" =>
            parse_id(arg).map_or_else(
                || ReplCommand::Invalid("usage: /open <id>".into()),
                ReplCommand::Open
            ),
        "delete" =>
            parse_id(arg).map_or_else(
                || ReplCommand::Invalid("usage: /delete <id>".into()),
                ReplCommand::Delete
            ),
        "suggest" =>
            match arg.and_then(|a| a.parse::<usize>().ok()) {
                Some(n) if (1..=SUGGESTIONS.len()).contains(&n) => ReplCommand::Suggest(n),
                _ => ReplCommand::Invalid(format!("usage: /suggest <1-{}>", SUGGESTIONS.len())),
            }
        "theme" => ReplCommand::Theme,
        "model" => ReplCommand::Model(arg.map(str::to_string)),
        "logout" => ReplCommand::Logout,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command: /{}", other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    Quit,
    LoggedOut,
}

pub fn render_groups<W: Write>(out: &mut W, groups: &[ChatGroup<'_>], active_id: Option<i64>) -> Result<()> {
    if groups.is_empty() {
        writeln!(out, "No conversations yet.")?;
        return Ok(());
    }
    for group in groups {
        writeln!(out, "{}", group.group.label().to_uppercase())?;
        for conversation in &group.conversations {
            let marker = if Some(conversation.id) == active_id { '*' } else { ' ' };
            writeln!(out, "{} [{}] {}", marker, conversation.id, conversation.title)?;
        }
    }
    Ok(())
}

pub fn render_conversation<W: Write>(out: &mut W, conversation: &Conversation) -> Result<()> {
    writeln!(out, "# {}", conversation.title)?;
    for message in &conversation.messages {
        render_message(out, message.role, &message.content)?;
    }
    Ok(())
}

fn render_message<W: Write>(out: &mut W, role: Role, content: &str) -> Result<()> {
    let speaker = match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    writeln!(out, "{}: {}", speaker, content)?;
    Ok(())
}

pub fn render_welcome<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", WELCOME)?;
    for (i, (title, desc)) in SUGGESTIONS.iter().enumerate() {
        writeln!(out, "  {}. {} {}", i + 1, title, desc)?;
    }
    Ok(())
}

/// The dashboard view: one dispatcher, the auth gate and UI preferences.
pub struct Dashboard {
    dispatcher: MessageDispatcher,
    auth: AuthGate,
    preferences: Preferences,
}

impl Dashboard {
    pub fn new(dispatcher: MessageDispatcher, auth: AuthGate, preferences: Preferences) -> Self {
        Self { dispatcher, auth, preferences }
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<ReplExit>
        where R: AsyncBufRead + Unpin, W: Write
    {
        writeln!(
            out,
            "{} · signed in as {} · {} mode",
            self.preferences.model(),
            self.auth.user_label(),
            self.preferences.theme()
        )?;
        self.show_active(out).await?;
        writeln!(out, "{}", HELP)?;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let command = parse_command(&line);
            debug!("REPL command: {:?}", command);
            if let Some(exit) = self.handle(command, out).await? {
                return Ok(exit);
            }
            out.flush()?;
        }
        Ok(ReplExit::Quit)
    }

    async fn handle<W: Write>(&mut self, command: ReplCommand, out: &mut W) -> Result<Option<ReplExit>> {
        match command {
            ReplCommand::Send(text) => self.send(&text, out).await?,
            ReplCommand::Suggest(n) => {
                let (title, desc) = SUGGESTIONS[n - 1];
                let text = format!("{} {}", title, desc);
                writeln!(out, "You: {}", text)?;
                self.send(&text, out).await?;
            }
            ReplCommand::New => {
                let id = self.dispatcher.store().lock().await.add_conversation()?;
                writeln!(out, "Started conversation {}", id)?;
                render_welcome(out)?;
            }
            ReplCommand::List => {
                let store = self.dispatcher.store().lock().await;
                let groups = store.list_grouped_by_recency(&Local::now());
                render_groups(out, &groups, store.active_id())?;
            }
            ReplCommand::Open(id) => {
                let selected = self.dispatcher.store().lock().await.select(id);
                match selected {
                    Ok(()) => self.show_active(out).await?,
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
            ReplCommand::Delete(id) => {
                if self.dispatcher.store().lock().await.delete_conversation(id)? {
                    writeln!(out, "Deleted conversation {}", id)?;
                } else {
                    writeln!(out, "Conversation {} not found", id)?;
                }
            }
            ReplCommand::Theme => {
                let theme = self.preferences.toggle_theme()?;
                writeln!(out, "Switched to {} mode", theme)?;
            }
            ReplCommand::Model(None) => {
                for model in Model::ALL {
                    let marker = if model == self.preferences.model() { " ✓" } else { "" };
                    writeln!(out, "{}{}", model, marker)?;
                }
            }
            ReplCommand::Model(Some(name)) =>
                match name.parse::<Model>() {
                    Ok(model) => {
                        self.preferences.set_model(model);
                        writeln!(out, "Model: {}", model)?;
                    }
                    Err(e) => writeln!(out, "{}", e)?,
                }
            ReplCommand::Logout => {
                self.auth.clear()?;
                writeln!(out, "Logged out.")?;
                return Ok(Some(ReplExit::LoggedOut));
            }
            ReplCommand::Help => writeln!(out, "{}", HELP)?,
            ReplCommand::Quit => {
                return Ok(Some(ReplExit::Quit));
            }
            ReplCommand::Invalid(message) => writeln!(out, "{}", message)?,
        }
        Ok(None)
    }

    async fn send<W: Write>(&self, text: &str, out: &mut W) -> Result<()> {
        match self.dispatcher.send(text).await {
            Ok(SendOutcome::Replied { reply, .. }) => render_message(out, Role::Assistant, &reply)?,
            Ok(SendOutcome::Failed { error, .. }) => render_message(out, Role::Assistant, &error)?,
            Ok(SendOutcome::Skipped(SkipReason::SendInFlight)) => {
                writeln!(out, "Still waiting for the previous reply.")?;
            }
            Ok(SendOutcome::Skipped(SkipReason::EmptyInput)) => {}
            Err(e) => {
                error!("Could not record message: {}", e);
                writeln!(out, "Could not save the conversation: {}", e)?;
            }
        }
        Ok(())
    }

    async fn show_active<W: Write>(&self, out: &mut W) -> Result<()> {
        let store = self.dispatcher.store().lock().await;
        match store.active() {
            Some(conversation) if !conversation.messages.is_empty() => {
                render_conversation(out, conversation)
            }
            _ => render_welcome(out),
        }
    }
}
