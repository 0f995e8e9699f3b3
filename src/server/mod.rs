pub mod config;
pub mod keys;
pub mod listener;

pub use config::ListenerConfig;
pub use keys::KeyStore;
pub use listener::{ReceivedVote, VoteListener};
