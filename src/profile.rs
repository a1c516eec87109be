//! Per-author aggregation of correlation results.
//!
//! The profile is always recomputed from the full set of live results. There
//! is no incremental merge state: replacing a unit's result and recomputing
//! is what keeps a re-analyzed block from being counted twice.
//!
//! Hosts persisting profiles must serialize read-all/recompute/write per
//! author; two analyses finishing concurrently would otherwise race.

use crate::output::{AuthorProfile, CorrelationResult, QuestionFormats, TestedTopic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Laplace-smoothed confidence for `n` analyzed pairs: `n / (n + 2)`.
pub fn laplace_confidence(n: usize) -> f64 {
    let n = n as f64;
    n / (n + 2.0)
}

impl AuthorProfile {
    /// Aggregate every result attributed to one author.
    ///
    /// Topic counts and format counts are summed. Every topic carries the
    /// same confidence. Topics are ranked by summed frequency, descending;
    /// ties stay alphabetical.
    pub fn recompute<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a CorrelationResult>,
    {
        let mut topics: BTreeMap<&str, u32> = BTreeMap::new();
        let mut formats = QuestionFormats::default();
        let mut n = 0usize;

        for r in results {
            n += 1;
            for (topic, count) in &r.topic_frequency {
                let slot = topics.entry(topic.as_str()).or_insert(0);
                *slot = slot.saturating_add(*count);
            }
            formats.merge(&r.question_formats);
        }

        let confidence = laplace_confidence(n);
        let mut tested_topics: Vec<TestedTopic> = topics
            .into_iter()
            .map(|(topic, frequency)| TestedTopic {
                topic: topic.to_string(),
                frequency,
                confidence,
            })
            .collect();
        tested_topics.sort_by(|a, b| b.frequency.cmp(&a.frequency));

        AuthorProfile {
            tested_topics,
            preferred_formats: formats,
            pairs_analyzed: n,
        }
    }
}

/// Live correlation results for one author, at most one per analyzed unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorAnalyses {
    results: BTreeMap<String, CorrelationResult>,
}

impl AuthorAnalyses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` for `unit`, replacing any previous one, and return the
    /// freshly recomputed profile.
    pub fn record(&mut self, unit: impl Into<String>, result: CorrelationResult) -> AuthorProfile {
        let unit = unit.into();
        if self.results.insert(unit.clone(), result).is_some() {
            debug!("Replaced previous correlation result for unit '{unit}'");
        }
        self.profile()
    }

    /// Drop `unit`'s result. The caller should recompute via [`Self::profile`].
    pub fn remove(&mut self, unit: &str) -> Option<CorrelationResult> {
        self.results.remove(unit)
    }

    pub fn get(&self, unit: &str) -> Option<&CorrelationResult> {
        self.results.get(unit)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every live result, by unit id.
    pub fn results(&self) -> impl Iterator<Item = (&str, &CorrelationResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn profile(&self) -> AuthorProfile {
        AuthorProfile::recompute(self.results.values())
    }
}

impl FromIterator<(String, CorrelationResult)> for AuthorAnalyses {
    fn from_iter<T: IntoIterator<Item = (String, CorrelationResult)>>(iter: T) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}
