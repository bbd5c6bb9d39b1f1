// jokko/src/notes.rs

//! Extracts `Liked:` / `Watch:` tags from free-text recommendation notes.
//!
//! A note such as `"Great work | Liked: Fast, Cheap | Watch: Late"` carries
//! two optional comma-separated segments, each ending at `|` or end of text.
//! Markers match case-insensitively and in either order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

pub const TOP_LIKES_CAP: usize = 3;
pub const TOP_WATCH_CAP: usize = 2;

static LIKED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Liked:\s*([^|]+)").expect("valid liked marker pattern"));
static WATCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Watch:\s*([^|]+)").expect("valid watch marker pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteTags {
  pub liked: Vec<String>,
  pub watch: Vec<String>,
}

fn segment(marker: &Regex, note: &str) -> Vec<String> {
  marker
    .captures(note)
    .and_then(|caps| caps.get(1))
    .map(|run| {
      run
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default()
}

pub fn parse_note(note: &str) -> NoteTags {
  NoteTags {
    liked: segment(&LIKED, note),
    watch: segment(&WATCH, note),
  }
}

/// Counts labels by exact (case-sensitive) identity, remembering first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TagTally {
  counts: Vec<(String, usize)>,
  index: HashMap<String, usize>,
}

impl TagTally {
  pub fn add(&mut self, label: &str) {
    match self.index.get(label) {
      Some(&slot) => self.counts[slot].1 += 1,
      None => {
        self.index.insert(label.to_string(), self.counts.len());
        self.counts.push((label.to_string(), 1));
      }
    }
  }

  pub fn count(&self, label: &str) -> usize {
    self.index.get(label).map_or(0, |&slot| self.counts[slot].1)
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// Labels by descending count, ties in first-seen order, at most `cap`.
  pub fn ranked(&self, cap: usize) -> Vec<String> {
    let mut ordered: Vec<&(String, usize)> = self.counts.iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered.into_iter().take(cap).map(|(label, _)| label.clone()).collect()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedTags {
  pub top_likes: Vec<String>,
  pub top_watch: Vec<String>,
}

/// Tallies the tags of every note of one provider.
pub fn aggregate_tags<'a>(notes: impl IntoIterator<Item = &'a str>) -> AggregatedTags {
  let mut liked = TagTally::default();
  let mut watch = TagTally::default();
  for note in notes {
    let tags = parse_note(note);
    tags.liked.iter().for_each(|l| liked.add(l));
    tags.watch.iter().for_each(|w| watch.add(w));
  }
  AggregatedTags {
    top_likes: liked.ranked(TOP_LIKES_CAP),
    top_watch: watch.ranked(TOP_WATCH_CAP),
  }
}
