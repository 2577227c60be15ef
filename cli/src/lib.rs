pub mod commands;
pub mod console;
pub mod logging;
pub mod oauth;
pub mod service;

pub use oauth::Credentials;
pub use service::Session;
