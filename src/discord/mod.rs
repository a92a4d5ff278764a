mod presence;

pub use presence::{DiscordConnection, DiscordTransport};
