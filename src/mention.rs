use crate::discord_text::{split_for_discord, strip_bot_mentions};
use crate::history::PriorMessage;
use crate::reply::{MessageReply, ReplyTarget};
use crate::voice::{self, session};
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

/// Whether a gateway message should be answered as a chat mention.
pub fn is_chat_mention(message: &serenity::Message, bot_id: u64) -> bool {
    !message.author.bot && message.mentions_user_id(serenity::UserId::new(bot_id))
}

/// Handle a message where the bot is mentioned/tagged.
pub async fn handle_mention(
    ctx: &serenity::Context,
    new_message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    info!(
        "Handling mention from {} in channel {}",
        new_message.author.name, new_message.channel_id
    );

    let prompt = strip_bot_mentions(&new_message.content, data.bot_id);
    if prompt.is_empty() {
        return Ok(());
    }

    let typing = new_message.channel_id.start_typing(&ctx.http);

    let channel_id = new_message.channel_id;
    let http = ctx.http.clone();
    let response = data
        .chat
        .respond(channel_id.get(), data.bot_id, &prompt, |limit| async move {
            fetch_recent(&http, channel_id, limit).await
        })
        .await;

    drop(typing);

    for chunk in split_for_discord(&response) {
        new_message.channel_id.say(&ctx.http, chunk).await?;
    }

    if data.config.speak_mention_replies {
        speak_reply(ctx, new_message, data, &response).await;
    }

    Ok(())
}

/// Recent channel messages, oldest-first.
async fn fetch_recent(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    limit: usize,
) -> anyhow::Result<Vec<PriorMessage>> {
    let limit = u8::try_from(limit.min(100)).unwrap_or(100);
    let messages = channel_id
        .messages(http, serenity::GetMessages::new().limit(limit))
        .await?;
    Ok(messages.iter().rev().map(PriorMessage::from).collect())
}

/// Reads the reply aloud when the author is in a voice channel.
async fn speak_reply(
    ctx: &serenity::Context,
    new_message: &serenity::Message,
    data: &Data,
    response: &str,
) {
    let reply = MessageReply::new(&ctx.http, new_message);
    let Some(guild_id) = new_message.guild_id else {
        return;
    };
    let Some(channel_id) = session::voice_channel_of(&ctx.cache, guild_id, new_message.author.id)
    else {
        return;
    };

    let outcome = match session::voice_manager(ctx).await {
        Ok(manager) => {
            voice::speak(
                &manager,
                guild_id,
                channel_id,
                data.speech.as_ref(),
                &data.artifacts,
                response,
            )
            .await
        }
        Err(e) => Err(e.into()),
    };

    let notice = match outcome {
        Ok(()) => "Speaking...",
        Err(e) => {
            error!("Failed to speak mention reply in guild {}: {:?}", guild_id, e);
            crate::commands::voice::SPEAK_FAILED
        }
    };
    if let Err(e) = reply.send_follow_up(notice).await {
        error!("Failed to send voice notice: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(author_id: u64, bot: bool, mentions: &[u64]) -> serenity::Message {
        let mut msg = serenity::Message::default();
        msg.author = serenity::User::default();
        msg.author.id = serenity::UserId::new(author_id);
        msg.author.bot = bot;
        msg.mentions = mentions
            .iter()
            .map(|id| {
                let mut user = serenity::User::default();
                user.id = serenity::UserId::new(*id);
                user
            })
            .collect();
        msg
    }

    #[test]
    fn test_mention_detection() {
        assert!(is_chat_mention(&message(1, false, &[999]), 999));
        assert!(!is_chat_mention(&message(1, false, &[]), 999));
        assert!(!is_chat_mention(&message(1, false, &[2]), 999));
        assert!(!is_chat_mention(&message(2, true, &[999]), 999));
    }
}
