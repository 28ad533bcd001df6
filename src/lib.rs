pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod models;
pub mod repl;
pub mod storage;

use api::ApiClient;
use auth::{ AuthGate, AuthService };
use chrono::Local;
use cli::{ Args, Command };
use config::Preferences;
use dispatcher::{ MessageDispatcher, SendOutcome };
use error::ChatError;
use history::SessionStore;
use log::info;
use repl::{ render_groups, Dashboard, ReplExit };
use std::error::Error;
use std::io::Write;
use std::sync::Arc;

const SIGNUP_SUCCESS: &str = "Account created! Redirecting to login...";

/// One-shot send. A failed exchange is still recorded in history but comes back as `Err`.
pub async fn ask_once(dispatcher: &MessageDispatcher, text: &str) -> error::Result<String> {
    match dispatcher.send(text).await? {
        SendOutcome::Replied { reply, .. } => Ok(reply),
        SendOutcome::Failed { error, .. } => Err(ChatError::Api(error)),
        SendOutcome::Skipped(_) => Err(ChatError::Validation("Nothing to send".to_string())),
    }
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("API Base URL: {}", args.api_base_url);
    info!("Storage Path: {}", args.storage_path().display());
    info!("-------------------------");

    let storage = storage::initialize_storage(&args)?;
    let api = ApiClient::new(&args.api_base_url)?;
    let gate = AuthGate::new(storage.clone());
    let auth = AuthService::new(api.clone(), gate.clone());

    match args.command {
        Command::Login { email, password } => {
            auth.login(&email, &password).await?;
            println!("Signed in as {}", gate.user_label());
        }
        Command::Signup { email, password, confirm_password } => {
            auth.signup(&email, &password, &confirm_password).await?;
            println!("{}", SIGNUP_SUCCESS);
        }
        Command::Logout => {
            auth.logout()?;
            println!("Logged out.");
        }
        Command::Refresh => {
            auth.refresh().await?;
            println!("Session refreshed.");
        }
        Command::Whoami => {
            gate.require_authenticated()?;
            println!("{}", gate.user_label());
        }
        Command::History => {
            gate.require_authenticated()?;
            let store = SessionStore::load(storage.clone());
            let groups = store.list_grouped_by_recency(&Local::now());
            let mut out = std::io::stdout().lock();
            render_groups(&mut out, &groups, None)?;
            out.flush()?;
        }
        Command::Delete { id } => {
            gate.require_authenticated()?;
            let mut store = SessionStore::load(storage.clone());
            if store.delete_conversation(id)? {
                println!("Deleted conversation {}", id);
            } else {
                println!("Conversation {} not found", id);
            }
        }
        Command::Ask { text } => {
            gate.require_authenticated()?;
            let store = SessionStore::load(storage.clone());
            let dispatcher = MessageDispatcher::new(Arc::new(api), gate.clone(), store);
            let reply = ask_once(&dispatcher, &text.join(" ")).await?;
            println!("{}", reply);
        }
        Command::Chat { id } => {
            gate.require_authenticated()?;
            let mut store = SessionStore::load(storage.clone());
            if let Some(id) = id {
                store.select(id)?;
            }
            let dispatcher = MessageDispatcher::new(Arc::new(api), gate.clone(), store);
            let preferences = Preferences::load(storage.clone());
            let mut dashboard = Dashboard::new(dispatcher, gate.clone(), preferences);

            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let mut out = std::io::stdout();
            if dashboard.run(input, &mut out).await? == ReplExit::LoggedOut {
                info!("Session ended by logout");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AskBackend;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct Refusing;

    #[async_trait]
    impl AskBackend for Refusing {
        async fn ask(&self, _message: &str, _access_token: Option<&str>) -> error::Result<String> {
            Err(ChatError::Api("Service unavailable".to_string()))
        }
    }

    fn dispatcher() -> MessageDispatcher {
        let storage = Arc::new(MemoryStorage::new());
        MessageDispatcher::new(
            Arc::new(Refusing),
            AuthGate::new(storage.clone()),
            SessionStore::load(storage)
        )
    }

    #[tokio::test]
    async fn test_ask_once_reports_failed_exchange_as_error() {
        let dispatcher = dispatcher();
        let err = ask_once(&dispatcher, "status?").await.unwrap_err();
        assert_eq!(err.to_string(), "Error: Service unavailable");

        let store = dispatcher.store().lock().await;
        assert_eq!(store.conversations()[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_ask_once_rejects_blank_text() {
        let err = ask_once(&dispatcher(), "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }
}
