//! Live adapters talking to the real services.

pub mod bitbucket;
pub mod clock;
pub mod http;
pub mod jira;
pub mod llm;
pub mod oauth;
