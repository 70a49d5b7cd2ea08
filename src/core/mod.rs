pub mod consumer;
pub mod credential_store;
pub mod mail_dispatcher;
pub mod oauth;
pub mod token_acquirer;

pub use crate::domain::model::{ClientConfig, NotificationPayload, OutboundEmail, Token};
pub use crate::domain::ports::{CredentialSource, InboundMessage, MailTransport, MessageSource};
pub use crate::utils::error::Result;
