use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use crate::{Context, Error};

/// Where a handler's answers go, independent of whether the request came
/// from a slash command or a plain message.
#[async_trait]
pub trait ReplyTarget: Send + Sync {
    /// The primary answer to the request.
    async fn reply_once(&self, text: &str) -> Result<(), Error>;
    /// Any further message after the primary answer.
    async fn send_follow_up(&self, text: &str) -> Result<(), Error>;
}

/// A slash-command interaction. The answer fills in the (possibly deferred)
/// interaction response; follow-ups are posted to the invoking channel.
pub struct CommandReply<'a> {
    ctx: Context<'a>,
}

impl<'a> CommandReply<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ReplyTarget for CommandReply<'_> {
    async fn reply_once(&self, text: &str) -> Result<(), Error> {
        self.ctx.say(text).await?;
        Ok(())
    }

    async fn send_follow_up(&self, text: &str) -> Result<(), Error> {
        self.ctx.channel_id().say(self.ctx.http(), text).await?;
        Ok(())
    }
}

/// A plain channel message: replies quote it, follow-ups go to its channel.
pub struct MessageReply<'a> {
    http: &'a serenity::Http,
    message: &'a serenity::Message,
}

impl<'a> MessageReply<'a> {
    pub fn new(http: &'a serenity::Http, message: &'a serenity::Message) -> Self {
        Self { http, message }
    }
}

#[async_trait]
impl ReplyTarget for MessageReply<'_> {
    async fn reply_once(&self, text: &str) -> Result<(), Error> {
        self.message.reply(self.http, text).await?;
        Ok(())
    }

    async fn send_follow_up(&self, text: &str) -> Result<(), Error> {
        self.message.channel_id.say(self.http, text).await?;
        Ok(())
    }
}
