pub mod auth;
pub mod budget;
pub mod chat;
pub mod cli;
pub mod errors;
pub mod logging;
pub mod notify;
pub mod plaid;
pub mod settings;
pub mod store;
pub mod testing;
pub mod wizard;
