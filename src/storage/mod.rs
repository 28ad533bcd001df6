mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::cli::Args;
use crate::error::Result;
use log::info;
use std::sync::Arc;

pub const THEME_KEY: &str = "theme";
pub const CHAT_HISTORY_KEY: &str = "chatHistory";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// String key/value storage that survives restarts, shaped after the browser's `localStorage`.
///
/// Every write is applied synchronously; there is no batching.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

pub fn initialize_storage(args: &Args) -> Result<Arc<dyn LocalStorage>> {
    let path = args.storage_path();
    info!("Local storage file: {}", path.display());
    let storage = FileStorage::open(path)?;
    Ok(Arc::new(storage))
}
