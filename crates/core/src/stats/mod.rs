//! Vote statistics
//!
//! Aggregates are derived on demand from the current participant set and
//! never stored.
//!
//! When at least one numeric vote exists, only numeric votes feed the
//! average, median, mode and outliers; label votes are listed in `votes`
//! but otherwise ignored. Only an all-label round computes a label mode.

use crate::models::{Room, RoomUser, VoteValue};

/// Deviation (in population standard deviations) beyond which a vote is an outlier
pub const OUTLIER_SIGMA: f64 = 2.0;

/// Outliers are only computed from this many numeric votes upward
pub const MIN_VOTES_FOR_OUTLIERS: usize = 3;

/// A revealed vote
#[derive(Debug, Clone, PartialEq)]
pub struct CastVote {
    pub user_id: String,
    pub name: String,
    pub vote: VoteValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteStatistics {
    pub average: Option<f64>,
    pub median: Option<f64>,
    /// Single most frequent value; `None` on a tie
    pub mode: Option<VoteValue>,
    pub votes: Vec<CastVote>,
    /// User ids of outlying numeric votes
    pub outliers: Vec<String>,
}

impl VoteStatistics {
    /// Everyone picked the same value
    pub fn is_consensus(&self) -> bool {
        match self.votes.split_first() {
            Some((first, rest)) => rest.iter().all(|v| v.vote == first.vote),
            None => false,
        }
    }

    /// Lowest and highest numeric vote
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let mut numbers = self.votes.iter().filter_map(|v| v.vote.as_number());
        let first = numbers.next()?;
        Some(numbers.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n))))
    }

    pub fn is_outlier(&self, user_id: &str) -> bool {
        self.outliers.iter().any(|id| id == user_id)
    }
}

/// Statistics for a room; nothing until its votes are revealed
pub fn for_room(room: &Room, users: &[RoomUser]) -> Option<VoteStatistics> {
    if !room.is_revealed {
        return None;
    }
    compute(users)
}

/// Statistics over everyone who voted; `None` when nobody has
pub fn compute(users: &[RoomUser]) -> Option<VoteStatistics> {
    let votes: Vec<CastVote> = users
        .iter()
        .filter_map(|u| {
            u.cast_vote().map(|vote| CastVote {
                user_id: u.user_id.clone(),
                name: u.name.clone(),
                vote: vote.clone(),
            })
        })
        .collect();

    if votes.is_empty() {
        return None;
    }

    let numbers: Vec<f64> = votes.iter().filter_map(|v| v.vote.as_number()).collect();

    if numbers.is_empty() {
        let labels: Vec<String> = votes.iter().map(|v| v.vote.to_string()).collect();
        let mode = single_mode(&labels).map(|label| VoteValue::Label(label.clone()));
        return Some(VoteStatistics {
            average: None,
            median: None,
            mode,
            votes,
            outliers: Vec::new(),
        });
    }

    let average = mean(&numbers);
    let median = median(&numbers);
    let mode = single_mode(&numbers).map(|n| VoteValue::Numeric(*n));

    let outliers = if numbers.len() >= MIN_VOTES_FOR_OUTLIERS {
        let sigma = population_std_dev(&numbers, average);
        votes
            .iter()
            .filter(|v| {
                v.vote
                    .as_number()
                    .map(|n| (n - average).abs() > OUTLIER_SIGMA * sigma)
                    .unwrap_or(false)
            })
            .map(|v| v.user_id.clone())
            .collect()
    } else {
        Vec::new()
    };

    Some(VoteStatistics {
        average: Some(average),
        median: Some(median),
        mode,
        votes,
        outliers,
    })
}

fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

fn median(numbers: &[f64]) -> f64 {
    let mut sorted = numbers.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

// Divisor is the count, not count - 1
fn population_std_dev(numbers: &[f64], mean: f64) -> f64 {
    let variance =
        numbers.iter().map(|n| (n - mean).powi(2)).sum::<f64>() / numbers.len() as f64;
    variance.sqrt()
}

/// The unique most frequent item, or `None` when several share the top count
fn single_mode<T: PartialEq>(items: &[T]) -> Option<&T> {
    let mut counts: Vec<(&T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }

    let max = counts.iter().map(|(_, c)| *c).max()?;
    let mut winners = counts.iter().filter(|(_, c)| *c == max);
    match (winners.next(), winners.next()) {
        (Some((item, _)), None) => Some(*item),
        _ => None,
    }
}
