//! Cache-first identity resolution
//!
//! Remote failures never propagate: a failed lookup yields an empty
//! identity (shown as "Unknown") and is not cached, so the next call
//! retries it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use super::display::{display_name_of, GROUP_PLACEHOLDER};
use super::tokens::replace_user_tokens;
use crate::cache::{scoped_key, CacheService};
use crate::error::Result;
use crate::infra::WorkerPool;
use crate::slack::{BotInfo, UserInfo, WorkspaceApi};

const DIRECTORY_KEY: &str = "members";
const GROUPS_KEY: &str = "usergroups";

/// Resolves user, bot and group identifiers for one account
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn WorkspaceApi>,
    cache: Arc<CacheService>,
    pool: WorkerPool,
    prefix: String,
}

impl IdentityResolver {
    pub fn new(
        api: Arc<dyn WorkspaceApi>,
        cache: Arc<CacheService>,
        pool: WorkerPool,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            cache,
            pool,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &str) -> String {
        scoped_key(&self.prefix, id)
    }

    /// Remote lookup and cache fill, without touching the pool
    async fn fetch_user(&self, user_id: &str) -> UserInfo {
        match self.api.user_info(user_id).await {
            Ok(user) => {
                self.cache.users().put(self.key(user_id), user.clone());
                user
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User lookup failed");
                UserInfo::default()
            }
        }
    }

    async fn fetch_bot(&self, bot_id: &str) -> BotInfo {
        match self.api.bot_info(bot_id).await {
            Ok(bot) => {
                self.cache.bots().put(self.key(bot_id), bot.clone());
                bot
            }
            Err(e) => {
                warn!(bot_id = %bot_id, error = %e, "Bot lookup failed");
                BotInfo::default()
            }
        }
    }

    pub async fn resolve_user(&self, user_id: &str) -> UserInfo {
        if let Some(user) = self.cache.users().get(&self.key(user_id)) {
            return user;
        }
        self.pool.run(self.fetch_user(user_id)).await
    }

    pub async fn resolve_bot(&self, bot_id: &str) -> BotInfo {
        if let Some(bot) = self.cache.bots().get(&self.key(bot_id)) {
            return bot;
        }
        self.pool.run(self.fetch_bot(bot_id)).await
    }

    /// Resolve many users at once
    ///
    /// Duplicate ids collapse before anything is fetched, cache hits are
    /// answered directly and the misses are fetched in parallel through the
    /// shared pool. The result has exactly one entry per unique id.
    pub async fn resolve_users_batch<I, S>(&self, user_ids: I) -> HashMap<String, UserInfo>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = user_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut resolved = HashMap::with_capacity(unique.len());
        let mut misses = Vec::new();
        for user_id in unique {
            match self.cache.users().get(&self.key(&user_id)) {
                Some(user) => {
                    resolved.insert(user_id, user);
                }
                None => misses.push(user_id),
            }
        }

        if !misses.is_empty() {
            debug!(hits = resolved.len(), misses = misses.len(), "Resolving user batch");
            let fetches = misses.into_iter().map(|user_id| {
                let resolver = self.clone();
                async move {
                    let user = resolver.fetch_user(&user_id).await;
                    (user_id, user)
                }
            });
            resolved.extend(self.pool.submit_all(fetches).await);
        }

        resolved
    }

    pub async fn resolve_bots_batch<I, S>(&self, bot_ids: I) -> HashMap<String, BotInfo>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = bot_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut resolved = HashMap::with_capacity(unique.len());
        let mut misses = Vec::new();
        for bot_id in unique {
            match self.cache.bots().get(&self.key(&bot_id)) {
                Some(bot) => {
                    resolved.insert(bot_id, bot);
                }
                None => misses.push(bot_id),
            }
        }

        let fetches = misses.into_iter().map(|bot_id| {
            let resolver = self.clone();
            async move {
                let bot = resolver.fetch_bot(&bot_id).await;
                (bot_id, bot)
            }
        });
        resolved.extend(self.pool.submit_all(fetches).await);
        resolved
    }

    /// Find a user id by handle, real name or display name
    ///
    /// The directory snapshot is fetched in one call and cached. `Ok(None)`
    /// means the directory has no such member; a failed directory fetch is
    /// an error so callers can tell the two apart and retry later.
    ///
    /// Each field is matched across the whole directory before the next is
    /// tried (handles, then real names, then display names), not member by
    /// member: a member whose handle is `sam` wins over an earlier member
    /// whose real name is `sam`.
    pub async fn resolve_username_to_id(&self, username: &str) -> Result<Option<String>> {
        let key = self.key(DIRECTORY_KEY);
        let members = match self.cache.directory().get(&key) {
            Some(members) => members,
            None => {
                let members = Arc::new(self.pool.run(self.api.list_members()).await.inspect_err(|e| {
                    warn!(username = %username, error = %e, "Member directory fetch failed");
                })?);
                self.cache.directory().put(key, members.clone());
                members
            }
        };

        let by_handle = members.iter().find(|m| m.name == username);
        let by_real_name = || members.iter().find(|m| m.real_name == username);
        let by_display_name = || members.iter().find(|m| m.profile.display_name == username);

        Ok(by_handle
            .or_else(by_real_name)
            .or_else(by_display_name)
            .map(|m| m.id.clone()))
    }

    /// Handle of a user group
    ///
    /// The whole group directory is refreshed together when its snapshot has
    /// expired. An unknown group or a failed refresh yields the placeholder.
    pub async fn resolve_group_handle(&self, group_id: &str) -> String {
        let key = self.key(GROUPS_KEY);
        let groups = match self.cache.group_handles().get(&key) {
            Some(groups) => groups,
            None => match self.pool.run(self.api.list_user_groups()).await {
                Ok(list) => {
                    let groups: HashMap<String, String> = list
                        .into_iter()
                        .map(|g| {
                            let handle = if g.handle.is_empty() {
                                GROUP_PLACEHOLDER.to_string()
                            } else {
                                g.handle
                            };
                            (g.id, handle)
                        })
                        .collect();
                    let groups = Arc::new(groups);
                    self.cache.group_handles().put(key, groups.clone());
                    groups
                }
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "User group list fetch failed");
                    return GROUP_PLACEHOLDER.to_string();
                }
            },
        };

        groups
            .get(group_id)
            .cloned()
            .unwrap_or_else(|| GROUP_PLACEHOLDER.to_string())
    }

    /// Member ids of a user group, fetched lazily per group
    pub async fn resolve_group_members(&self, group_id: &str) -> Arc<Vec<String>> {
        let key = self.key(&format!("subteam:{}", group_id));
        if let Some(members) = self.cache.group_members().get(&key) {
            return members;
        }

        match self.pool.run(self.api.user_group_members(group_id)).await {
            Ok(members) => {
                let members = Arc::new(members);
                self.cache.group_members().put(key, members.clone());
                members
            }
            Err(e) => {
                warn!(group_id = %group_id, error = %e, "User group members fetch failed");
                Arc::new(Vec::new())
            }
        }
    }

    /// Replace every `<@id>` token with `@{display name}`
    ///
    /// Ids missing from `resolved` are looked up on the spot (cache first),
    /// so every token in the input is rewritten.
    pub async fn rewrite_mentions(&self, text: &str, resolved: &HashMap<String, UserInfo>) -> String {
        let missing: Vec<String> = super::tokens::mentioned_user_ids(text)
            .into_iter()
            .filter(|id| !resolved.contains_key(id))
            .collect();

        let mut extra = HashMap::new();
        for user_id in missing {
            let user = self.resolve_user(&user_id).await;
            extra.insert(user_id, user);
        }

        replace_user_tokens(text, |id| {
            resolved
                .get(id)
                .or_else(|| extra.get(id))
                .map(display_name_of)
                .unwrap_or_else(|| super::display::UNKNOWN.to_string())
        })
    }
}
