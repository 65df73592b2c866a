//! Posts new commits of a GitHub repository to a channel.

use crate::{
    bot::Bot,
    client::ChatClient,
    config::Commits as CommitsConfig,
    context::EventContext,
    event::*,
    log_error, log_internal,
    model::ChannelId,
    plugin::*,
};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "NavalBot commit poller";

pub struct Commits;

#[derive(Clone, Debug, Deserialize)]
pub struct GithubCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    /// ISO 8601, used as `since` for the next poll
    pub date: String,
}

/// One chat line per commit: repository, short hash, subject and author
pub fn format_commit(repo: &str, commit: &GithubCommit) -> String {
    let short: String = commit.sha.chars().take(7).collect();
    let subject = commit.commit.message.lines().next().unwrap_or_default();
    format!(
        "**{}** `{}` {} - {}\n<{}>",
        repo, short, subject, commit.commit.author.name, commit.html_url
    )
}

/// Commits newer than `last_seen`, oldest first.  GitHub lists newest first.
fn new_commits(commits: Vec<GithubCommit>, last_seen: &str) -> Vec<GithubCommit> {
    let mut fresh: Vec<GithubCommit> = commits
        .into_iter()
        .take_while(|commit| commit.sha != last_seen)
        .collect();
    fresh.reverse();
    fresh
}

struct Poller {
    http: reqwest::Client,
    cfg: CommitsConfig,
    /// Newest commit seen so far, `None` before the first poll
    last: Option<GithubCommit>,
}

impl Poller {
    fn new(cfg: CommitsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cfg,
            last: None,
        }
    }

    async fn fetch(&self) -> Result<Vec<GithubCommit>> {
        let url = format!("{}/repos/{}/commits", GITHUB_API, self.cfg.repo);
        let mut request = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.cfg.token))
            .header("User-Agent", USER_AGENT);
        if let Some(last) = &self.last {
            request = request.query(&[("since", &last.commit.author.date)]);
        }

        request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GithubCommit>>()
            .await
            .map_err(|e| anyhow!("Could not decode commits of `{}`: {}", self.cfg.repo, e))
    }

    /// Commits to announce.  The first poll only remembers where the repository is.
    async fn poll(&mut self) -> Result<Vec<GithubCommit>> {
        let commits = self.fetch().await?;
        let Some(newest) = commits.first().cloned() else {
            return Ok(Vec::new());
        };

        let fresh = match &self.last {
            Some(last) => new_commits(commits, &last.sha),
            None => Vec::new(),
        };
        self.last = Some(newest);
        Ok(fresh)
    }

    async fn run(mut self, client: Arc<dyn ChatClient>) {
        let channel = ChannelId(self.cfg.channel_id);
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.cfg.poll_interval_seconds.max(1)));

        loop {
            interval.tick().await;
            let commits = match self.poll().await {
                Ok(commits) => commits,
                Err(err) => {
                    log_error!("Polling commits of `{}` failed: {:#}", self.cfg.repo, err);
                    continue;
                }
            };
            for commit in commits {
                let text = format_commit(&self.cfg.repo, &commit);
                if let Err(err) = client.send_message(channel, &text).await {
                    log_error!("Could not post commit {}: {:#}", commit.sha, err);
                }
            }
        }
    }
}

/// (Re)start the poller with the current configuration.  Stops it when disabled.
async fn start(bot: &Arc<Bot>, owner: &'static str) {
    let cfg = bot.cfg.read().await.commits.clone();
    if !cfg.enabled {
        bot.stop_task(owner).await;
        return;
    }
    if cfg.token.is_empty() || cfg.repo.is_empty() || cfg.channel_id == 0 {
        log_error!("Commit poller needs `token`, `repo` and `channel_id`");
        bot.stop_task(owner).await;
        return;
    }
    // Started again from the ready hook once connected
    let Some(client) = bot.client().await else {
        return;
    };

    log_internal!("Polling commits of `{}`", cfg.repo);
    let task = tokio::spawn(Poller::new(cfg).run(client));
    bot.replace_task(owner, task).await;
}

async fn start_on_ready(ctx: Arc<EventContext>) -> Result<EventHandled> {
    start(&ctx.bot, "commits").await;
    Ok(EventHandled::No)
}

#[serenity::async_trait]
impl Plugin for Commits {
    fn name(&self) -> &'static str {
        "commits"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.hooks
            .register_fn(EventName::Ready, self.name(), start_on_ready)
            .await;
        start(bot, self.name()).await;
        Ok(())
    }
}
