pub mod gmail;
pub mod oauth;

pub use gmail::GmailClient;
