pub mod voice;

use crate::{Data, Error};

/// Every slash command the bot registers: `say`, `connect` and `dc`.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![voice::say(), voice::connect(), voice::dc()]
}
