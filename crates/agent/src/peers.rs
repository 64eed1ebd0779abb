// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of connected agents discovered at startup.
//!
//! Read-mostly after the initial parallel discovery pass; `refresh` exists
//! for manual re-discovery but nothing schedules it.

use crate::card::AgentCard;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;

/// URL-keyed cache of peer agent cards; `None` marks a failed discovery.
#[derive(Default)]
pub struct PeerRegistry {
    cards: RwLock<BTreeMap<String, Option<AgentCard>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every peer's card concurrently, bounded by `timeout` each.
    pub async fn discover_all(&self, client: &reqwest::Client, urls: &[String], timeout: Duration) {
        let fetches = urls.iter().map(|url| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let card = fetch_card(&client, &url, timeout).await;
                (url, card)
            }
        });
        let results = futures_util::future::join_all(fetches).await;

        let mut cards = self.cards.write();
        for (url, card) in results {
            match &card {
                Some(card) => {
                    tracing::info!(url = %url, peer = %card.name, "discovered connected agent");
                }
                None => {
                    tracing::warn!(url = %url, "could not discover connected agent");
                }
            }
            cards.insert(url, card);
        }
    }

    /// Re-fetch one peer on demand.
    pub async fn refresh(&self, client: &reqwest::Client, url: &str, timeout: Duration) {
        let card = fetch_card(client, url, timeout).await;
        self.cards.write().insert(url.to_string(), card);
    }

    pub fn by_url(&self, url: &str) -> Option<AgentCard> {
        self.cards.read().get(url).cloned().flatten()
    }

    pub fn known_urls(&self) -> Vec<String> {
        self.cards.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }

    /// Compose the effective system prompt: the class prompt plus a
    /// "Connected agents:" block. Omitted entirely when nothing is connected.
    pub fn render_prompt(&self, base: &str) -> String {
        let cards = self.cards.read();
        if cards.is_empty() {
            return base.to_string();
        }

        let mut prompt = String::from(base);
        prompt.push_str("\n\nConnected agents:\n");
        for (url, card) in cards.iter() {
            match card {
                Some(card) => {
                    prompt.push_str(&format!("- {}\n", card.summary()));
                    for skill in &card.skills {
                        prompt.push_str(&format!("    * {}: {}\n", skill.name, skill.description));
                    }
                }
                None => {
                    prompt.push_str(&format!(
                        "- {} (capabilities could not be retrieved)\n",
                        url
                    ));
                }
            }
        }
        prompt.push_str(
            "\nUse the query_agent tool to delegate questions to a connected agent, and \
             discover_agent to inspect one.",
        );
        prompt
    }

    /// Test seam: seed the cache without HTTP.
    pub fn insert(&self, url: &str, card: Option<AgentCard>) {
        self.cards.write().insert(url.to_string(), card);
    }
}

async fn fetch_card(client: &reqwest::Client, url: &str, timeout: Duration) -> Option<AgentCard> {
    let endpoint = format!(
        "{}/.well-known/agent-configuration",
        url.trim_end_matches('/')
    );
    let response = client.get(&endpoint).timeout(timeout).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.json::<AgentCard>().await.ok()
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod tests;
