use crate::api::DEFAULT_API_BASE_URL;
use clap::{ Parser, Subcommand };
use std::path::PathBuf;

const DEFAULT_STORAGE_DIR: &str = ".chat-dashboard";
const DEFAULT_STORAGE_FILE: &str = "storage.json";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Origin of the chat backend serving /login, /signup, /refresh and /ask
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// JSON file holding chat history, theme and credentials. Defaults to ~/.chat-dashboard/storage.json
    #[arg(long, env = "STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and store the returned tokens
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Forget the stored tokens
    Logout,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Show who the stored token belongs to
    Whoami,
    /// List conversations grouped by recency
    History,
    /// Delete a conversation
    Delete {
        id: i64,
    },
    /// Send one message in a new conversation and print the reply
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Interactive chat
    Chat {
        /// Resume an existing conversation
        #[arg(long)]
        id: Option<i64>,
    },
}

impl Args {
    pub fn storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage_path {
            return path.clone();
        }
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(DEFAULT_STORAGE_DIR).join(DEFAULT_STORAGE_FILE)
    }
}
