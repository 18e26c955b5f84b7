//! Out of office auto replies for a Gmail inbox.

pub mod cli;
pub mod core;
pub mod error;
pub mod google;
pub mod jobs;
pub mod mailbox;
pub mod reply;
