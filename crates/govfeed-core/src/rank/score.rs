use chrono::{DateTime, Duration, Utc};

use crate::config::ScoringConfig;
use crate::query::QuerySpec;

/// Deterministic relevance heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPolicy {
    pub base: i64,
    pub phrase_bonus: i64,
    pub length_bonus_per_1000: i64,
    pub recent_bonus: i64,
    pub recent_window: Duration,
    pub week_bonus: i64,
    pub week_window: Duration,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for ScoringPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            base: config.base,
            phrase_bonus: config.phrase_bonus,
            length_bonus_per_1000: config.length_bonus_per_1000,
            recent_bonus: config.recent_bonus,
            recent_window: Duration::hours(config.recent_hours),
            week_bonus: config.week_bonus,
            week_window: Duration::hours(config.week_hours),
        }
    }
}

impl ScoringPolicy {
    /// Score an item that already passed the query filter
    pub fn score(
        &self,
        title: &str,
        published: Option<DateTime<Utc>>,
        spec: &QuerySpec,
        now: DateTime<Utc>,
    ) -> i64 {
        let mut score = self.base;

        // A one-term phrase is the term itself and would lift every result equally
        if spec.groups().len() > 1 && spec.phrase_matches(title) {
            score += self.phrase_bonus;
        }

        let title_chars = title.chars().count() as i64;
        score += self.length_bonus_per_1000 * title_chars / 1000;

        score + self.recency_bonus(published, now)
    }

    /// Bonus for items published inside the recent or week windows
    pub fn recency_bonus(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
        let Some(published) = published else {
            return 0;
        };

        let age = now - published;
        if age <= self.recent_window {
            self.recent_bonus
        } else if age <= self.week_window {
            self.week_bonus
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{normalize, NormalizedQuery};

    fn spec(raw: &str) -> QuerySpec {
        match normalize(raw) {
            NormalizedQuery::Terms(spec) => spec,
            other => panic!("expected terms, got {:?}", other),
        }
    }

    #[test]
    fn test_single_term_recent_item() {
        let now = Utc::now();
        let policy = ScoringPolicy::default();
        let score = policy.score(
            "Pentagon Cyber Defence Initiative Launched",
            Some(now - Duration::hours(2)),
            &spec("cyber"),
            now,
        );
        // base + recency; a 42-char title adds nothing
        assert_eq!(score, 10);
    }

    #[test]
    fn test_phrase_bonus_for_multi_term_queries() {
        let now = Utc::now();
        let policy = ScoringPolicy::default();
        let q = spec("cyber defence");

        assert_eq!(policy.score("Pentagon Cyber Defence Initiative", None, &q, now), 45);
        assert_eq!(policy.score("Defence chiefs discuss cyber", None, &q, now), 5);
    }

    #[test]
    fn test_recency_windows() {
        let now = Utc::now();
        let policy = ScoringPolicy::default();

        assert_eq!(policy.recency_bonus(None, now), 0);
        assert_eq!(policy.recency_bonus(Some(now - Duration::hours(24)), now), 5);
        assert_eq!(policy.recency_bonus(Some(now - Duration::hours(25)), now), 2);
        assert_eq!(policy.recency_bonus(Some(now - Duration::hours(72)), now), 2);
        assert_eq!(policy.recency_bonus(Some(now - Duration::hours(73)), now), 0);
        // clock skew: future dates count as fresh
        assert_eq!(policy.recency_bonus(Some(now + Duration::hours(3)), now), 5);
    }

    #[test]
    fn test_length_tie_breaker() {
        let now = Utc::now();
        let policy = ScoringPolicy::default();
        let q = spec("report");
        let long_title = format!("report {}", "x".repeat(1993));

        assert_eq!(policy.score(&long_title, None, &q, now), 5 + 20);
    }

    #[test]
    fn test_policy_from_config() {
        let config = ScoringConfig {
            recent_bonus: 9,
            recent_hours: 1,
            ..ScoringConfig::default()
        };
        let policy = ScoringPolicy::from(&config);
        let now = Utc::now();

        assert_eq!(policy.recency_bonus(Some(now - Duration::minutes(30)), now), 9);
        assert_eq!(policy.recency_bonus(Some(now - Duration::hours(2)), now), 2);
    }
}
