//! Command-line adapter over [`MonitorHub`]

pub mod output;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use tokio_stream::StreamExt;
use tracing::info;

use crate::config::MonitorConfig;
use crate::monitor::{ConnectInfo, MonitorHub, DEFAULT_MESSAGE_LIMIT};
use crate::preferences::SettingsPatch;
use output::{format_activity, format_event_line, format_json, format_message, format_starred};

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Workspace API token, falls back to SLACK_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the token and show the connected account
    Connect,
    /// List channels the account is a member of
    Channels,
    /// Show recent messages of a channel
    Messages {
        channel: String,
        #[arg(long, short, default_value_t = DEFAULT_MESSAGE_LIMIT)]
        limit: u32,
    },
    /// Show the replies of a thread
    Thread { channel: String, ts: String },
    /// Mentions, thread replies, reactions and DMs concerning the account
    Activity {
        #[arg(long, short, default_value_t = 50)]
        limit: usize,
    },
    /// Print new messages of one channel as they arrive until Ctrl-C
    Tail { channel: String },
    /// Monitor mentions and print each one as a JSON line until Ctrl-C
    Watch {
        /// Queue the three sample notifications first
        #[arg(long)]
        test_events: bool,
    },
    /// Manage the watched-user list
    #[command(subcommand)]
    Users(UsersCommand),
    /// Manage priority keywords
    #[command(subcommand)]
    Keywords(KeywordsCommand),
    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Manage starred messages
    #[command(subcommand)]
    Starred(StarredCommand),
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    List,
    Add { username: String },
    Remove { username: String },
}

#[derive(Debug, Subcommand)]
pub enum KeywordsCommand {
    List,
    /// Tier is one of critical, high, normal
    Add { tier: String, keyword: String },
    Remove { tier: String, keyword: String },
}

#[derive(Debug, Subcommand)]
pub enum StarredCommand {
    List,
    /// Star the message at `ts` in `channel`
    Add { channel: String, ts: String },
    /// Remove by id, `{channel}_{ts}`
    Remove { message_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        sound: Option<bool>,
        #[arg(long)]
        classifier: Option<bool>,
    },
}

fn resolve_token(token: Option<String>) -> Result<String> {
    token
        .or_else(|| std::env::var("SLACK_TOKEN").ok())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow!("No token: pass --token or set SLACK_TOKEN"))
}

fn print_list(json: bool, value: &[String]) {
    if json {
        println!("{}", format_json(&value));
    } else {
        for item in value {
            println!("{}", item);
        }
    }
}

pub async fn run(global: GlobalArgs, command: Command) -> Result<()> {
    let token = resolve_token(global.token)?;
    let config = MonitorConfig::auto_load()?;
    let hub = MonitorHub::from_config(config);

    let ConnectInfo {
        bot_id,
        team_name,
        workspace_url,
        ..
    } = hub.connect(&token).await?;
    let account = bot_id.clone();
    let json = global.json;

    match command {
        Command::Connect => {
            if json {
                let info = hub.account(&account)?;
                println!("{}", format_json(&*info));
            } else {
                println!("Connected to {} as {} ({})", team_name, bot_id, workspace_url);
                println!("Oracle stage: {}", if hub.has_oracle() { "available" } else { "off" });
            }
        }
        Command::Channels => {
            let channels = hub.list_channels(&account).await?;
            if json {
                println!("{}", format_json(&channels));
            } else {
                for channel in channels {
                    println!("{}  #{}", channel.id, channel.name);
                }
            }
        }
        Command::Messages { channel, limit } => {
            let messages = hub.list_messages(&account, &channel, limit).await?;
            if json {
                println!("{}", format_json(&messages));
            } else {
                messages.iter().rev().for_each(|m| println!("{}", format_message(m)));
            }
        }
        Command::Thread { channel, ts } => {
            let replies = hub.list_thread_replies(&account, &channel, &ts).await?;
            if json {
                println!("{}", format_json(&replies));
            } else {
                replies.iter().for_each(|m| println!("{}", format_message(m)));
            }
        }
        Command::Activity { limit } => {
            let items = hub.list_activity(&account, limit).await?;
            if json {
                println!("{}", format_json(&items));
            } else {
                items.iter().for_each(|item| println!("{}", format_activity(item)));
            }
        }
        Command::Tail { channel } => tail(&hub, &account, &channel, json).await?,
        Command::Watch { test_events } => watch(&hub, &account, test_events).await?,
        Command::Users(command) => {
            let users = match command {
                UsersCommand::List => hub.get_watched_users(&account)?,
                UsersCommand::Add { username } => hub.add_watched_user(&account, &username)?,
                UsersCommand::Remove { username } => hub.remove_watched_user(&account, &username)?,
            };
            print_list(json, &users);
        }
        Command::Keywords(command) => {
            let keywords = match command {
                KeywordsCommand::List => hub.get_priority_keywords(&account)?,
                KeywordsCommand::Add { tier, keyword } => hub.add_keyword(&account, &tier, &keyword)?,
                KeywordsCommand::Remove { tier, keyword } => hub.remove_keyword(&account, &tier, &keyword)?,
            };
            if json {
                println!("{}", format_json(&keywords));
            } else {
                println!("critical: {}", keywords.critical.join(", "));
                println!("high:     {}", keywords.high.join(", "));
                println!("normal:   {}", keywords.normal.join(", "));
            }
        }
        Command::Settings(command) => {
            let settings = match command {
                SettingsCommand::Show => hub.get_settings(&account)?,
                SettingsCommand::Set { sound, classifier } => hub.update_settings(
                    &account,
                    SettingsPatch {
                        notification_sound: sound,
                        classifier_enabled: classifier,
                    },
                )?,
            };
            println!("{}", format_json(&settings));
        }
        Command::Starred(command) => {
            let starred = match command {
                StarredCommand::List => hub.starred_messages(&account)?,
                StarredCommand::Add { channel, ts } => hub.star_message(&account, &channel, &ts).await?,
                StarredCommand::Remove { message_id } => hub.unstar_message(&account, &message_id)?,
            };
            if json {
                println!("{}", format_json(&starred));
            } else {
                starred.iter().for_each(|item| println!("{}", format_starred(item)));
            }
        }
    }

    hub.shutdown();
    Ok(())
}

async fn watch(hub: &MonitorHub, account: &str, test_events: bool) -> Result<()> {
    let mut events = hub.subscribe(account)?;
    if test_events {
        let queued = hub.inject_test_events(account)?;
        info!(queued, "Queued sample notifications");
    }
    hub.start_monitoring(account)?;
    info!(account = %account, "Watching for mentions, Ctrl-C to stop");

    loop {
        tokio::select! {
            next = events.next() => match next {
                Some(event) => println!("{}", format_event_line(&event)),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            }
        }
    }

    hub.stop_monitoring(account)?;
    hub.disconnect(account);
    Ok(())
}

async fn tail(hub: &MonitorHub, account: &str, channel: &str, json: bool) -> Result<()> {
    let mut messages = hub.subscribe_channel(account, channel)?;
    info!(account = %account, channel = %channel, "Tailing channel, Ctrl-C to stop");

    loop {
        tokio::select! {
            next = messages.next() => match next {
                Some(message) if json => println!("{}", serde_json::to_string(&message)?),
                Some(message) => println!("{}", format_message(&message)),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            }
        }
    }

    hub.disconnect(account);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_token_prefers_flag() {
        assert_eq!(resolve_token(Some("xoxb-flag".into())).unwrap(), "xoxb-flag");
    }
}
