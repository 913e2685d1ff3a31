//! # Playback source selection
//!
//! A title's play-list field packs several alternative mirrors ("groups")
//! into one string:
//!
//! ```text
//! 第01集$https://a/1.m3u8#第02集$https://a/2.m3u8$$$第01集$http://b/1.mp4#...
//! ```
//!
//! - groups are separated by `$$$`,
//! - episodes inside a group by `#`,
//! - name and URL inside an episode by the first `$`.
//!
//! Each playable group (one mentioning `.m3u8` or `.mp4`) is scored as a
//! whole; the best one wins, equal scores are broken by an injectable
//! [`TieBreak`] so production can spread load across equally good mirrors.
//! When nothing is playable the first raw group is used as a last resort.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const GROUP_DELIMITER: &str = "$$$";
pub const EPISODE_DELIMITER: char = '#';
pub const NAME_URL_DELIMITER: char = '$';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub url: String,
}

impl Episode {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// One mirror: the ordered episode list parsed from a single group segment.
/// Never holds an episode with an empty URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeGroup {
    pub episodes: Vec<Episode>,
}

impl EpisodeGroup {
    /// Entries without a name/URL delimiter, or with an empty URL, are skipped.
    pub fn parse(segment: &str) -> Self {
        let episodes = segment
            .split(EPISODE_DELIMITER)
            .filter_map(|entry| {
                let (name, url) = entry.split_once(NAME_URL_DELIMITER)?;
                let url = url.trim();
                if url.is_empty() {
                    return None;
                }
                Some(Episode::new(name.trim(), url))
            })
            .collect();
        Self { episodes }
    }

    /// Inverse of [`EpisodeGroup::parse`] for delimiter-free names and URLs.
    pub fn to_segment(&self) -> String {
        self.episodes
            .iter()
            .map(|e| format!("{}{}{}", e.name, NAME_URL_DELIMITER, e.url))
            .collect::<Vec<_>>()
            .join(&EPISODE_DELIMITER.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }
}

/// Raw groups of a play-list field, blank segments dropped.
pub fn split_groups(raw: &str) -> Vec<&str> {
    raw.split(GROUP_DELIMITER)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Score adjustments. Defaults mirror the long-standing heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub m3u8_bonus: i32,
    pub resolution_bonus: i32,
    pub hd_bonus: i32,
    pub plain_http_penalty: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            m3u8_bonus: 10,
            resolution_bonus: 5,
            hd_bonus: 3,
            plain_http_penalty: 2,
        }
    }
}

impl ScoreWeights {
    /// Score a raw group segment together with its parsed episodes.
    pub fn score(&self, segment: &str, group: &EpisodeGroup) -> i32 {
        let mut score = 0;

        let (m3u8, mp4) = group.episodes.iter().fold((0usize, 0usize), |(h, m), e| {
            let u = e.url.to_ascii_lowercase();
            (
                h + usize::from(u.contains(".m3u8")),
                m + usize::from(u.contains(".mp4")),
            )
        });
        if m3u8 > 0 && m3u8 > mp4 {
            score += self.m3u8_bonus;
        }
        if segment.contains("1080P") || segment.contains("1080p") {
            score += self.resolution_bonus;
        }
        if segment.contains("HD") || segment.contains("高清") {
            score += self.hd_bonus;
        }
        if group
            .episodes
            .iter()
            .any(|e| e.url.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("http://")))
        {
            score -= self.plain_http_penalty;
        }
        score
    }
}

/// Picks an index in `0..len` among equally scored groups. `len >= 1`.
pub trait TieBreak: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random choice; spreads viewers over equally good mirrors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTieBreak;

impl TieBreak for RandomTieBreak {
    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

/// Always the first of the top tier (original order). For tests and
/// reproducible output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTieBreak;

impl TieBreak for FirstTieBreak {
    fn pick(&self, _len: usize) -> usize {
        0
    }
}

/// A candidate group with its position in the raw field and its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredGroup {
    pub index: usize,
    pub group: EpisodeGroup,
    pub score: i32,
}

pub struct PlaybackSourceSelector {
    weights: ScoreWeights,
    tie_break: Box<dyn TieBreak>,
}

impl Default for PlaybackSourceSelector {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

impl PlaybackSourceSelector {
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            weights,
            tie_break: Box::new(RandomTieBreak),
        }
    }

    pub fn with_tie_break<T: TieBreak + 'static>(mut self, tie_break: T) -> Self {
        self.tie_break = Box::new(tie_break);
        self
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Playable groups with scores, highest first; ties keep original order.
    /// A group whose entries all fail to parse is not a candidate, whatever
    /// its text mentions.
    pub fn rank_groups(&self, raw: &str) -> Vec<ScoredGroup> {
        let mut scored: Vec<ScoredGroup> = split_groups(raw)
            .into_iter()
            .enumerate()
            .filter(|(_, seg)| seg.contains(".m3u8") || seg.contains(".mp4"))
            .filter_map(|(index, seg)| {
                let group = EpisodeGroup::parse(seg);
                if group.is_empty() {
                    tracing::debug!(group = index, "candidate has no parsable episode; skipped");
                    return None;
                }
                let score = self.weights.score(seg, &group);
                Some(ScoredGroup {
                    index,
                    group,
                    score,
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Episode list of the chosen group, in original order. Empty or absent
    /// input gives an empty list ("nothing to play").
    pub fn select_episodes(&self, raw: Option<&str>) -> Vec<Episode> {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Vec::new();
        };

        let mut ranked = self.rank_groups(raw);
        if ranked.is_empty() {
            tracing::debug!("no playable m3u8/mp4 group; falling back to first parsable group");
            return split_groups(raw)
                .into_iter()
                .map(EpisodeGroup::parse)
                .find(|g| !g.is_empty())
                .map(|g| g.episodes)
                .unwrap_or_default();
        }

        let top = ranked[0].score;
        let tier = ranked.iter().take_while(|g| g.score == top).count();
        let pick = self.tie_break.pick(tier).min(tier - 1);
        let chosen = ranked.swap_remove(pick);
        tracing::debug!(
            group = chosen.index,
            score = chosen.score,
            tier,
            "selected playback group"
        );
        chosen.group.episodes
    }
}
