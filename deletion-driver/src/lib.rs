//! Walks an account's history and carries out the retention decisions.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use shreddit_core::{
    decide, select_source, truncate_for_display, CoreError, Decision, ErrorExt, ErrorReporter,
    Item, RemoteAccount, RetentionConfig, SentenceSource, Settings, DISPLAY_WIDTH,
};
use std::fmt;
use tracing::{debug, info};

/// Counts for one pass over the history.
///
/// In a dry run `edited`, `deleted` and `votes_cleared` count what would
/// have been done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub examined: usize,
    pub kept: usize,
    pub edited: usize,
    pub deleted: usize,
    pub votes_cleared: usize,
    pub failed: usize,
    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "Trial run: ")?;
        }
        write!(
            f,
            "examined {} items, kept {}, edited {}, deleted {}, cleared {} votes",
            self.examined, self.kept, self.edited, self.deleted, self.votes_cleared
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

fn action_label(decision: &Decision, dry_run: bool) -> &'static str {
    match (decision, dry_run) {
        (Decision::EditOnly(_), false) => "Editing",
        (Decision::EditOnly(_), true) => "Would edit",
        (Decision::EditAndDelete(_), false) => "Editing and deleting",
        (Decision::EditAndDelete(_), true) => "Would edit and delete",
        (_, false) => "Deleting",
        (_, true) => "Would delete",
    }
}

/// `/r/rust/ #abc123 with: "old" to "new"` for comments, `submission: #abc123 url` for posts.
fn describe(item: &Item, replacement: Option<&str>) -> String {
    match (item, replacement) {
        (Item::Comment(comment), Some(text)) => format!(
            "/r/{}/ #{} with: \"{}\" to \"{}\"",
            comment.subreddit,
            comment.id,
            truncate_for_display(&comment.body, DISPLAY_WIDTH),
            truncate_for_display(text, DISPLAY_WIDTH)
        ),
        (Item::Comment(comment), None) => format!("/r/{}/ #{}", comment.subreddit, comment.id),
        (Item::Post(post), _) => format!("submission: #{} {}", post.id, post.url),
    }
}

/// Drives one run against a logged-in account.
///
/// Items are handled strictly in stream order, each one finished before the
/// next is pulled.
pub struct DeletionDriver<'a> {
    account: &'a dyn RemoteAccount,
    config: &'a RetentionConfig,
    text: &'a dyn SentenceSource,
    reporter: ErrorReporter,
}

impl<'a> DeletionDriver<'a> {
    pub fn new(
        account: &'a dyn RemoteAccount,
        config: &'a RetentionConfig,
        text: &'a dyn SentenceSource,
    ) -> Self {
        Self {
            account,
            config,
            text,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Processes the whole history using `now` as the reference time for every item.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, CoreError> {
        let mut summary = RunSummary {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        self.log_session_start(now);

        let mut items = self
            .account
            .items(self.config.item_category, &self.config.sort_order);

        while let Some(item) = items.try_next().await? {
            summary.examined += 1;

            let decision = decide(&item, self.config, now, self.text);
            if let Decision::Keep(reason) = &decision {
                debug!("Keeping {} in r/{}: {}", item.fullname(), item.subreddit(), reason);
                summary.kept += 1;
                continue;
            }

            if self.config.dry_run {
                self.record_planned(&item, &decision, &mut summary);
                continue;
            }

            if let Err(e) = self.execute(&item, &decision, &mut summary).await {
                if self.config.continue_on_error && !e.is_fatal() {
                    self.reporter.report_warning(&e);
                    summary.failed += 1;
                } else {
                    return Err(e);
                }
            }
        }

        info!("{}", summary);
        Ok(summary)
    }

    fn log_session_start(&self, now: DateTime<Utc>) {
        if !self.config.verbose {
            return;
        }

        info!("Logged in as {}", self.account.username());
        info!("Deleting messages before {}", self.config.cutoff(now));
        if !self.config.whitelist_subreddits.is_empty() {
            let subs: Vec<&str> = self
                .config
                .whitelist_subreddits
                .iter()
                .map(String::as_str)
                .collect();
            info!("Keeping messages from subreddits {}", subs.join(", "));
        }
        if !self.config.whitelist_ids.is_empty() {
            let ids: Vec<&str> = self.config.whitelist_ids.iter().map(String::as_str).collect();
            info!("Keeping messages with ids {}", ids.join(", "));
        }
        debug!("Replacement text from the {} source", self.text.name());
    }

    fn record_planned(&self, item: &Item, decision: &Decision, summary: &mut RunSummary) {
        info!(
            "{} {}",
            action_label(decision, true),
            describe(item, decision.replacement_text())
        );

        if self.config.clear_vote_before_delete {
            summary.votes_cleared += 1;
        }
        if decision.replacement_text().is_some() {
            summary.edited += 1;
        }
        if decision.deletes() {
            summary.deleted += 1;
        }
    }

    /// Clear vote, then edit, then delete.
    async fn execute(
        &self,
        item: &Item,
        decision: &Decision,
        summary: &mut RunSummary,
    ) -> Result<(), CoreError> {
        if self.config.verbose {
            info!(
                "{} {}",
                action_label(decision, false),
                describe(item, decision.replacement_text())
            );
        }

        if self.config.clear_vote_before_delete {
            self.account.clear_vote(item).await?;
            summary.votes_cleared += 1;
        }

        if let Some(text) = decision.replacement_text() {
            self.account.edit(item, text).await?;
            summary.edited += 1;
        }

        if decision.deletes() {
            self.account.delete(item).await?;
            summary.deleted += 1;
        }

        Ok(())
    }
}

/// Logs in with the configured credentials and runs one pass.
pub async fn shred(settings: &Settings) -> Result<RunSummary, CoreError> {
    let session = reddit_client::connect(&settings.credentials).await?;
    let text = select_source(&settings.text);
    let now = Utc::now();

    DeletionDriver::new(&session, &settings.retention, text.as_ref())
        .run(now)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shreddit_core::{Comment, Post, VoteState};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn comment(body: &str) -> Item {
        Item::Comment(Comment {
            id: "c1".to_string(),
            subreddit: "rust".to_string(),
            body: body.to_string(),
            created_utc: created(),
            vote: VoteState::None,
        })
    }

    #[test]
    fn test_describe_comment_truncates_and_flattens() {
        let body = format!("line one\nline two\t{}", "x".repeat(200));
        let described = describe(&comment(&body), Some("replacement"));

        assert!(described.starts_with("/r/rust/ #c1 with: \"line one line two "));
        assert!(!described.contains('\n'));
        assert!(described.ends_with("to \"replacement\""));
    }

    #[test]
    fn test_describe_post() {
        let post = Item::Post(Post {
            id: "p1".to_string(),
            subreddit: "rust".to_string(),
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            created_utc: created(),
            vote: VoteState::Upvoted,
        });
        assert_eq!(describe(&post, None), "submission: #p1 https://example.com");
    }

    #[test]
    fn test_action_labels() {
        let edit = Decision::EditAndDelete("x".to_string());
        assert_eq!(action_label(&edit, false), "Editing and deleting");
        assert_eq!(action_label(&edit, true), "Would edit and delete");
        assert_eq!(action_label(&Decision::EditOnly("x".to_string()), false), "Editing");
        assert_eq!(action_label(&Decision::DeleteOnly, true), "Would delete");
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            examined: 5,
            kept: 2,
            edited: 2,
            deleted: 3,
            votes_cleared: 0,
            failed: 1,
            dry_run: true,
        };
        let shown = summary.to_string();
        assert!(shown.starts_with("Trial run: examined 5 items"));
        assert!(shown.ends_with("1 failed"));
    }
}
