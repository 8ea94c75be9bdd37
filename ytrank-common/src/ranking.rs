//! Ranking engine
//!
//! Selects the "top" videos of a playlist by combining popularity (views) and
//! engagement (like percentage).
//!
//! # Algorithm
//! 1. Normalize views against the playlist maximum and like percentage to 0..1
//! 2. Percentile-rank views and like percentage independently (ties share the
//!    average rank)
//! 3. Candidates are at or above the median on both axes
//! 4. `combined_score = views_normalized × like_percentage_normalized`
//! 5. The threshold is the lowest score among the top-N candidates; candidates
//!    scoring at or above it are flagged top

use crate::models::VideoDetails;
use crate::{Error, Result};

/// Share of the ranked videos used to decide between the two top-N formulas
pub const TOP_N_FRACTION: f64 = 0.11;

/// Percentile a video must reach on both axes to be a candidate
pub const MEDIAN_PERCENTILE: f64 = 0.5;

/// Inputs the ranking needs from a video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoStats {
    pub views: i64,
    pub like_percentage: f64,
}

impl From<&VideoDetails> for VideoStats {
    fn from(video: &VideoDetails) -> Self {
        Self {
            views: video.views,
            like_percentage: video.like_percentage(),
        }
    }
}

/// Per-video ranking result, in input order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoScore {
    pub views_normalized: f64,
    pub like_percentage_normalized: f64,
    pub views_percentile: f64,
    pub likes_percentile: f64,
    pub combined_score: f64,
    pub is_candidate: bool,
    pub is_top: bool,
}

/// Outcome of one ranking pass
#[derive(Debug, Clone, PartialEq)]
pub struct RankingReport {
    pub scores: Vec<VideoScore>,
    /// Target top count N (0 when there were no candidates)
    pub top_count: usize,
    /// Lowest combined score still counted as top (None when there were no candidates)
    pub threshold: Option<f64>,
}

impl RankingReport {
    pub fn is_top(&self, index: usize) -> bool {
        self.scores.get(index).map(|s| s.is_top).unwrap_or(false)
    }

    pub fn top_indices(&self) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_top)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Rank videos and flag the top subset
///
/// `declared_count` is the item count the playlist declares, which feeds the
/// top-N formula.
///
/// # Errors
/// `Error::EmptyInput` when `videos` is empty.
pub fn rank_videos(videos: &[VideoStats], declared_count: i64) -> Result<RankingReport> {
    if videos.is_empty() {
        return Err(Error::EmptyInput("No videos found.".to_string()));
    }

    let max_views = videos.iter().map(|v| v.views).max().unwrap_or(0);
    let views: Vec<f64> = videos.iter().map(|v| v.views as f64).collect();
    let likes: Vec<f64> = videos.iter().map(|v| v.like_percentage).collect();
    let views_pct = percentile_ranks(&views);
    let likes_pct = percentile_ranks(&likes);

    let mut scores: Vec<VideoScore> = videos
        .iter()
        .enumerate()
        .map(|(i, video)| {
            let views_normalized = if max_views > 0 {
                video.views as f64 / max_views as f64
            } else {
                0.0
            };
            let like_percentage_normalized = video.like_percentage / 100.0;
            VideoScore {
                views_normalized,
                like_percentage_normalized,
                views_percentile: views_pct[i],
                likes_percentile: likes_pct[i],
                combined_score: views_normalized * like_percentage_normalized,
                is_candidate: views_pct[i] >= MEDIAN_PERCENTILE
                    && likes_pct[i] >= MEDIAN_PERCENTILE,
                is_top: false,
            }
        })
        .collect();

    let mut candidate_scores: Vec<f64> = scores
        .iter()
        .filter(|s| s.is_candidate)
        .map(|s| s.combined_score)
        .collect();

    if candidate_scores.is_empty() {
        return Ok(RankingReport {
            scores,
            top_count: 0,
            threshold: None,
        });
    }

    let top_count = target_top_count(videos.len(), declared_count);
    candidate_scores.sort_by(|a, b| b.total_cmp(a));
    let take = top_count.min(candidate_scores.len());
    let threshold = candidate_scores[take - 1];

    for score in scores.iter_mut() {
        score.is_top = score.is_candidate && score.combined_score >= threshold;
    }

    Ok(RankingReport {
        scores,
        top_count,
        threshold: Some(threshold),
    })
}

/// Target number of top videos
///
/// When `ranked_count × 11%` is below 5 and the playlist declares more than 5
/// items, half the declared count is used; otherwise the declared count minus
/// two. Never below 1.
pub fn target_top_count(ranked_count: usize, declared_count: i64) -> usize {
    let share = ranked_count as f64 * TOP_N_FRACTION;
    let count = if declared_count > 5 && share < 5.0 {
        declared_count / 2
    } else {
        declared_count - 2
    };
    count.max(1) as usize
}

/// Fractional percentile ranks: average 1-based rank for ties, divided by n
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = average_rank / n as f64;
        }
        start = end + 1;
    }
    ranks
}
