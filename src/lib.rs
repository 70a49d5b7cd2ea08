pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileCredentialSource, GmailClient, InlineCredentialSource};
pub use config::NotifierConfig;
pub use core::{
    consumer::NotificationConsumer, credential_store::CredentialStore,
    mail_dispatcher::MailDispatcher, token_acquirer::TokenAcquirer,
};
pub use utils::error::{NotifierError, Result};
