pub mod browse;
pub mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use threadfold_core::config::EffectiveConfig;
use threadfold_core::{ConversationApi, MemoryApi, Paginator};
use tracing::info;

use crate::mastodon::{MastodonClient, looks_like_account_id};
use crate::output::OutputMode;

/// Settings shared by every subcommand.
#[derive(Debug)]
pub struct Session {
    pub config: EffectiveConfig,
    pub mode: OutputMode,
    pub replay: Option<PathBuf>,
    pub page_limit: Option<u32>,
}

/// A paginator over whichever collaborator the session picked. `Send`, so it
/// can sit behind a `Mutex` shared across threads.
pub type DynPaginator = Paginator<Box<dyn ConversationApi + Send>>;

impl Session {
    /// Page size: CLI flag, then config.
    pub fn page_limit(&self) -> Option<u32> {
        self.page_limit.or(self.config.user.paging.page_limit)
    }

    pub const fn threads_per_load(&self) -> usize {
        self.config.user.paging.threads_per_load
    }

    /// Build a paginator for `account` against either the replay file or
    /// the configured instance.
    ///
    /// In replay mode `account` is taken as the account id verbatim.
    pub fn open(&self, account: &str) -> Result<DynPaginator> {
        let (api, account_id): (Box<dyn ConversationApi + Send>, String) = match &self.replay {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read replay file {}", path.display()))?;
                let api = MemoryApi::from_json(&raw)
                    .with_context(|| format!("Failed to load replay file {}", path.display()))?;
                info!(path = %path.display(), "replaying statuses from file");
                (Box::new(api), account.to_string())
            }
            None => {
                let client = MastodonClient::new(
                    self.config.base_url.clone(),
                    self.config.access_token.clone(),
                );
                let account_id = if looks_like_account_id(account) {
                    account.to_string()
                } else {
                    let found = client
                        .lookup_account(account)
                        .with_context(|| format!("Failed to resolve account '{account}'"))?;
                    info!(handle = account, id = %found.id, "resolved account");
                    found.id
                };
                (Box::new(client), account_id)
            }
        };

        Ok(Paginator::new(api, account_id).with_page_limit(self.page_limit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const fn assert_send<T: Send>() {}

    #[test]
    fn session_paginator_can_be_shared_behind_a_mutex() {
        assert_send::<DynPaginator>();
        assert_send::<Mutex<DynPaginator>>();
        assert_send::<MastodonClient>();
    }

    #[test]
    fn replay_session_uses_the_argument_as_account_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("replay.json");
        std::fs::write(
            &path,
            r#"[{"id": "1", "account": {"id": "7"}, "in_reply_to_id": null}]"#,
        )
        .expect("write replay");

        let session = Session {
            config: threadfold_core::config::resolve_config(
                Some(dir.path().join("missing.toml").as_path()),
                None,
                false,
            )
            .expect("defaults"),
            mode: OutputMode::Text,
            replay: Some(path),
            page_limit: Some(5),
        };

        let mut pager = session.open("7").expect("open replay");
        assert_eq!(pager.account_id(), "7");
        pager.load_newest().expect("load");
        assert_eq!(pager.forest().threads_newest_first(), ["1"]);
    }
}
