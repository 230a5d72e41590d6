//! Filler text written over comments before they are deleted.
//!
//! Sources are tried in priority order and the first one that can be built
//! wins; the chain always ends with [`FixedSource`], so selection never fails.

use std::path::Path;
use tracing::debug;

use crate::config::TextSourceOptions;

/// Width that logged text is cut to.
pub const DISPLAY_WIDTH: usize = 78;

const MIN_WORDS: usize = 50;
const MAX_WORDS: usize = 150;

pub const ATTRIBUTION_TEXT: &str =
    "I have been Shreddited for privacy!\n\nhttps://github.com/x89/Shreddit/";

pub trait SentenceSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn next_sentence(&self) -> String;
}

/// Lorem ipsum generator, available when built with the `lorem` feature.
#[cfg(feature = "lorem")]
pub struct LoremIpsumSource;

#[cfg(feature = "lorem")]
impl SentenceSource for LoremIpsumSource {
    fn name(&self) -> &'static str {
        "lorem ipsum"
    }

    fn next_sentence(&self) -> String {
        lipsum::lipsum_words(fastrand::usize(MIN_WORDS..=MAX_WORDS))
    }
}

fn lorem_source() -> Option<Box<dyn SentenceSource>> {
    #[cfg(feature = "lorem")]
    {
        Some(Box::new(LoremIpsumSource))
    }
    #[cfg(not(feature = "lorem"))]
    {
        None
    }
}

/// Random runs of words from a newline-separated word list.
pub struct WordListSource {
    words: Vec<String>,
}

impl WordListSource {
    /// Loads and shuffles the list once. `None` if it is unreadable or empty.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("Word list {} unavailable: {}", path.display(), e);
                return None;
            }
        };
        Self::from_words(contents.lines().map(str::to_string).collect())
    }

    pub fn from_words(words: Vec<String>) -> Option<Self> {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return None;
        }
        fastrand::shuffle(&mut words);
        Some(Self { words })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.words.len()
    }
}

impl SentenceSource for WordListSource {
    fn name(&self) -> &'static str {
        "word list"
    }

    fn next_sentence(&self) -> String {
        let count = fastrand::usize(MIN_WORDS..=MAX_WORDS).min(self.words.len());
        let start = fastrand::usize(0..=self.words.len() - count);
        self.words[start..start + count].join(" ")
    }
}

/// Constant attribution text; the last resort.
pub struct FixedSource;

impl SentenceSource for FixedSource {
    fn name(&self) -> &'static str {
        "fixed text"
    }

    fn next_sentence(&self) -> String {
        ATTRIBUTION_TEXT.to_string()
    }
}

type SourceBuilder<'a> = Box<dyn Fn() -> Option<Box<dyn SentenceSource>> + 'a>;

/// Picks the first available source: lorem ipsum, then the word list, then fixed text.
pub fn select_source(options: &TextSourceOptions) -> Box<dyn SentenceSource> {
    let candidates: Vec<SourceBuilder<'_>> = vec![
        Box::new(lorem_source) as SourceBuilder<'_>,
        Box::new(|| {
            WordListSource::load(&options.word_list).map(|s| Box::new(s) as Box<dyn SentenceSource>)
        }) as SourceBuilder<'_>,
        Box::new(|| Some(Box::new(FixedSource) as Box<dyn SentenceSource>)) as SourceBuilder<'_>,
    ];

    let source = candidates
        .iter()
        .find_map(|build| build())
        .unwrap_or_else(|| Box::new(FixedSource));
    debug!("Using {} for replacement text", source.name());
    source
}

/// Cuts `text` to `width` characters and flattens newlines and tabs for one-line logs.
pub fn truncate_for_display(text: &str, width: usize) -> String {
    text.chars()
        .take(width)
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect()
}
