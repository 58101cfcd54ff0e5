//! Email delivery through the notification API.

pub mod error;
pub mod gateway;

pub use error::MailError;
pub use gateway::{EmailGateway, NotificationConfig, NotificationGateway};
