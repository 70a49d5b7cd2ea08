// Adapters layer: concrete implementations for external systems (credential media, mail API, message streams).

pub mod credential_source;
pub mod gmail;
pub mod message_source;

pub use credential_source::{FileCredentialSource, InlineCredentialSource};
pub use gmail::GmailClient;
pub use message_source::{ChannelSource, JsonLinesSource};
