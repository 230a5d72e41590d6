use chrono::{DateTime, Utc};

use crate::config::RetentionConfig;
use crate::sentence::SentenceSource;
use crate::types::{Decision, Item, KeepReason};

/// Decides what to do with one item.
///
/// Checks run in a fixed order: age, the edit-only window, the whitelists,
/// and finally the item kind. Comments that are acted on carry a fresh
/// replacement text drawn from `text`.
pub fn decide(
    item: &Item,
    config: &RetentionConfig,
    now: DateTime<Utc>,
    text: &dyn SentenceSource,
) -> Decision {
    let created = item.created_at();

    if created > config.cutoff(now) {
        return Decision::Keep(KeepReason::TooRecent);
    }

    // Edit-only runs assume the same `hours` on every run, so anything older
    // than two windows was already overwritten by an earlier run.
    if config.edit_only && created < config.edit_window_end(now) {
        return Decision::Keep(KeepReason::PastEditWindow);
    }

    if config.is_whitelisted_subreddit(item.subreddit()) {
        return Decision::Keep(KeepReason::WhitelistedSubreddit);
    }
    if config.is_whitelisted_id(item.id()) {
        return Decision::Keep(KeepReason::WhitelistedId);
    }

    match (item, config.edit_only) {
        (Item::Comment(_), true) => Decision::EditOnly(text.next_sentence()),
        (Item::Comment(_), false) => Decision::EditAndDelete(text.next_sentence()),
        (Item::Post(_), true) => Decision::Keep(KeepReason::NotEditable),
        (Item::Post(_), false) => Decision::DeleteOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::FixedSource;
    use crate::types::{Comment, Post, VoteState};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn config(hours: i64) -> RetentionConfig {
        RetentionConfig {
            max_age: Duration::hours(hours),
            ..Default::default()
        }
    }

    fn comment_aged(hours: i64) -> Item {
        Item::Comment(Comment {
            id: "c1".to_string(),
            subreddit: "Rust".to_string(),
            body: "original".to_string(),
            created_utc: now() - Duration::hours(hours),
            vote: VoteState::Upvoted,
        })
    }

    fn post_aged(hours: i64) -> Item {
        Item::Post(Post {
            id: "p1".to_string(),
            subreddit: "rust".to_string(),
            title: "title".to_string(),
            url: "https://example.com".to_string(),
            created_utc: now() - Duration::hours(hours),
            vote: VoteState::None,
        })
    }

    #[test]
    fn test_item_exactly_at_cutoff_is_processed() {
        let decision = decide(&comment_aged(72), &config(72), now(), &FixedSource);
        assert!(matches!(decision, Decision::EditAndDelete(_)));
    }

    #[test]
    fn test_recent_item_is_kept_before_whitelist_check() {
        let mut config = config(72);
        config.whitelist_subreddits.insert("rust".to_string());
        let decision = decide(&comment_aged(1), &config, now(), &FixedSource);
        assert_eq!(decision, Decision::Keep(KeepReason::TooRecent));
    }

    #[test]
    fn test_edit_only_window_bounds() {
        let mut config = config(72);
        config.edit_only = true;

        // Inside [now - 144h, now - 72h]
        let decision = decide(&comment_aged(100), &config, now(), &FixedSource);
        assert!(matches!(decision, Decision::EditOnly(_)));

        // Exactly at the far edge is still inside the window.
        let decision = decide(&comment_aged(144), &config, now(), &FixedSource);
        assert!(matches!(decision, Decision::EditOnly(_)));

        let decision = decide(&comment_aged(145), &config, now(), &FixedSource);
        assert_eq!(decision, Decision::Keep(KeepReason::PastEditWindow));
    }

    #[test]
    fn test_id_whitelist() {
        let mut config = config(72);
        config.whitelist_ids.insert("p1".to_string());
        let decision = decide(&post_aged(500), &config, now(), &FixedSource);
        assert_eq!(decision, Decision::Keep(KeepReason::WhitelistedId));
    }

    #[test]
    fn test_old_post_without_edit_only_is_deleted() {
        let decision = decide(&post_aged(500), &config(72), now(), &FixedSource);
        assert_eq!(decision, Decision::DeleteOnly);
    }
}
