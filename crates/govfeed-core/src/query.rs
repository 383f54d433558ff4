//! Turns a free-text query into whole-word matchers.
//!
//! A comma anywhere in the query switches to match-any (OR) mode and is
//! treated as a separator; otherwise every term must match (AND).

use std::collections::HashMap;

use regex::Regex;

/// Outcome of normalizing a raw query
#[derive(Debug, Clone)]
pub enum NormalizedQuery {
    /// Blank query: return every item unfiltered
    Everything,
    /// Non-blank query that produced no terms (e.g. `","`): return nothing
    Nothing,
    Terms(QuerySpec),
}

/// One query term plus any related terms that count as a match for it
#[derive(Debug, Clone)]
pub struct TermGroup {
    term: String,
    alternates: Vec<String>,
    matcher: Regex,
}

impl TermGroup {
    fn new(term: String, alternates: Vec<String>) -> Option<Self> {
        let matcher = whole_word(std::iter::once(term.as_str()).chain(alternates.iter().map(String::as_str)))?;
        Some(Self {
            term,
            alternates,
            matcher,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn alternates(&self) -> &[String] {
        &self.alternates
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// Compiled match terms for one search
#[derive(Debug, Clone)]
pub struct QuerySpec {
    groups: Vec<TermGroup>,
    match_any: bool,
    phrase: Regex,
}

/// Case-insensitive, word-boundary anchored alternation of literal phrases
fn whole_word<'a>(alternatives: impl Iterator<Item = &'a str>) -> Option<Regex> {
    let body = alternatives
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");

    match Regex::new(&format!(r"(?i)\b(?:{})\b", body)) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to compile query matcher");
            None
        }
    }
}

/// Normalize raw query text
pub fn normalize(raw: &str) -> NormalizedQuery {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return NormalizedQuery::Everything;
    }

    let match_any = lowered.contains(',');
    let terms: Vec<String> = lowered
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if terms.is_empty() {
        tracing::debug!(query = raw, "No terms after normalizing query");
        return NormalizedQuery::Nothing;
    }

    match QuerySpec::build(terms, match_any) {
        Some(spec) => NormalizedQuery::Terms(spec),
        None => NormalizedQuery::Nothing,
    }
}

impl QuerySpec {
    fn build(terms: Vec<String>, match_any: bool) -> Option<Self> {
        let phrase = terms.join(" ");
        let phrase = whole_word(std::iter::once(phrase.as_str()))?;
        let groups = terms
            .into_iter()
            .map(|t| TermGroup::new(t, Vec::new()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            groups,
            match_any,
            phrase,
        })
    }

    pub fn groups(&self) -> &[TermGroup] {
        &self.groups
    }

    /// The normalized query terms, in query order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(TermGroup::term)
    }

    pub fn match_any(&self) -> bool {
        self.match_any
    }

    /// Inclusion test: AND mode needs every group, OR mode any group
    pub fn matches(&self, text: &str) -> bool {
        if self.match_any {
            self.groups.iter().any(|g| g.is_match(text))
        } else {
            self.groups.iter().all(|g| g.is_match(text))
        }
    }

    /// Whether the full term sequence appears as a phrase; used for boosting only
    pub fn phrase_matches(&self, text: &str) -> bool {
        self.phrase.is_match(text)
    }

    /// Attach related terms to each group
    ///
    /// `expansions` maps a query term to its related terms. Blank and
    /// duplicate alternates are dropped. The phrase matcher is unchanged.
    pub fn with_expansions(&self, expansions: &HashMap<String, Vec<String>>) -> Self {
        let groups = self
            .groups
            .iter()
            .map(|group| {
                let mut alternates = group.alternates.clone();
                for related in expansions.get(&group.term).into_iter().flatten() {
                    let related = related.trim().to_lowercase();
                    if related.is_empty() || related == group.term || alternates.contains(&related) {
                        continue;
                    }
                    alternates.push(related);
                }

                TermGroup::new(group.term.clone(), alternates).unwrap_or_else(|| group.clone())
            })
            .collect();

        Self {
            groups,
            match_any: self.match_any,
            phrase: self.phrase.clone(),
        }
    }
}
