//! Blocking client for the Mastodon-compatible REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use threadfold_core::api::{ApiError, ContextQuery, ConversationContext, PageQuery};
use threadfold_core::{Account, ConversationApi, Status};
use tracing::debug;

const USER_AGENT: &str = concat!("threadfold/", env!("CARGO_PKG_VERSION"));

pub struct MastodonClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl MastodonClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base_url: base_url.into(),
            token,
        }
    }

    /// Resolve `@user@domain`, `user@domain` or `user` to an account.
    pub fn lookup_account(&self, handle: &str) -> Result<Account, ApiError> {
        let acct = normalize_handle(handle);
        self.get_json("/api/v1/accounts/lookup", &[("acct", acct.to_string())])
            .map_err(|err| match err {
                ApiError::NotFound(_) => ApiError::AccountNotFound(acct.to_string()),
                other => other,
            })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.agent.get(&url).set("Accept", "application/json");
        for (key, value) in params {
            request = request.query(key, value);
        }
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        debug!(%url, ?params, "GET");

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Err(ApiError::NotFound(path.to_string())),
            Err(err) => {
                return Err(ApiError::Request {
                    endpoint: path.to_string(),
                    message: err.to_string(),
                });
            }
        };

        response.into_json::<T>().map_err(|err| ApiError::Decode {
            endpoint: path.to_string(),
            message: err.to_string(),
        })
    }
}

impl ConversationApi for MastodonClient {
    fn account_statuses(
        &self,
        account_id: &str,
        query: &PageQuery,
    ) -> Result<Vec<Status>, ApiError> {
        let path = format!("/api/v1/accounts/{account_id}/statuses");
        self.get_json(&path, &page_params(query))
    }

    fn conversation_context(
        &self,
        status_id: &str,
        query: &ContextQuery,
    ) -> Result<ConversationContext, ApiError> {
        let path = format!("/api/v1/statuses/{status_id}/context");
        let params: Vec<_> = query
            .max_id
            .iter()
            .map(|id| ("max_id", id.clone()))
            .collect();
        self.get_json(&path, &params)
    }
}

fn page_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(min_id) = &query.min_id {
        params.push(("min_id", min_id.clone()));
    }
    if let Some(max_id) = &query.max_id {
        params.push(("max_id", max_id.clone()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

fn normalize_handle(handle: &str) -> &str {
    handle.trim().trim_start_matches('@')
}

/// Numeric arguments are taken as account ids and skip the lookup request.
pub fn looks_like_account_id(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_carry_only_set_fields() {
        assert!(page_params(&PageQuery::newest()).is_empty());

        let params = page_params(&PageQuery::newer_than("42").with_limit(Some(40)));
        assert_eq!(
            params,
            [("min_id", "42".to_string()), ("limit", "40".to_string())]
        );

        let params = page_params(&PageQuery::older_than("7"));
        assert_eq!(params, [("max_id", "7".to_string())]);
    }

    #[test]
    fn handles_lose_leading_at() {
        assert_eq!(normalize_handle("@alice@example.social"), "alice@example.social");
        assert_eq!(normalize_handle(" bob "), "bob");
    }

    #[test]
    fn numeric_arguments_are_account_ids() {
        assert!(looks_like_account_id("109283746"));
        assert!(!looks_like_account_id("alice"));
        assert!(!looks_like_account_id(""));
    }
}
