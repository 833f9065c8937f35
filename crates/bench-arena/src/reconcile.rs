//! Mapping free-text move candidates onto the legal move list.
//!
//! Agents answer with prose, markdown and stray suffixes. [`FuzzyMatch`]
//! tries four rules in order and stops at the first that yields a move:
//!
//! 1. exact match,
//! 2. case-insensitive match,
//! 3. a legal move contained in the candidate (earliest position wins,
//!    then the longest move at that position),
//! 4. match after stripping `+`/`#` from both sides.

use std::fmt;

use thiserror::Error;

/// The candidate did not map onto any legal move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not resolve {candidate:?} to a legal move (legal: {})", .legal.join(", "))]
pub struct ResolutionFailure {
    pub candidate: String,
    pub legal: Vec<String>,
}

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    CaseInsensitive,
    Contained,
    SuffixInsensitive,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchRule::Exact => "exact",
            MatchRule::CaseInsensitive => "case-insensitive",
            MatchRule::Contained => "contained",
            MatchRule::SuffixInsensitive => "suffix-insensitive",
        };
        f.write_str(name)
    }
}

/// A legal move chosen for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mv: String,
    pub rule: MatchRule,
}

/// Strategy that maps candidate text to one of the legal moves.
pub trait MovePolicy: Send + Sync {
    fn resolve(&self, candidate: &str, legal: &[String]) -> Result<Resolution, ResolutionFailure>;
}

/// The default four-rule policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatch;

impl MovePolicy for FuzzyMatch {
    fn resolve(&self, candidate: &str, legal: &[String]) -> Result<Resolution, ResolutionFailure> {
        resolve(candidate, legal)
    }
}

fn strip_check_suffix(s: &str) -> &str {
    s.trim_end_matches(|c: char| c == '+' || c == '#')
}

fn found(mv: &str, rule: MatchRule) -> Option<Resolution> {
    Some(Resolution {
        mv: mv.to_string(),
        rule,
    })
}

/// Earliest-starting legal move inside `candidate`, longest on ties.
fn contained_move<'a>(candidate: &str, legal: &'a [String]) -> Option<&'a String> {
    legal
        .iter()
        .filter(|m| !m.is_empty())
        .filter_map(|m| candidate.find(m.as_str()).map(|pos| (pos, m)))
        .min_by(|(pos_a, a), (pos_b, b)| pos_a.cmp(pos_b).then(b.len().cmp(&a.len())))
        .map(|(_, m)| m)
}

/// Resolves `candidate` against `legal` with the four fuzzy rules.
pub fn resolve(candidate: &str, legal: &[String]) -> Result<Resolution, ResolutionFailure> {
    let hit = if let Some(m) = legal.iter().find(|m| *m == candidate) {
        found(m, MatchRule::Exact)
    } else if let Some(m) = legal.iter().find(|m| m.eq_ignore_ascii_case(candidate)) {
        found(m, MatchRule::CaseInsensitive)
    } else if let Some(m) = contained_move(candidate, legal) {
        found(m, MatchRule::Contained)
    } else {
        let stripped = strip_check_suffix(candidate);
        legal
            .iter()
            .find(|m| !stripped.is_empty() && strip_check_suffix(m) == stripped)
            .and_then(|m| found(m, MatchRule::SuffixInsensitive))
    };

    hit.ok_or_else(|| ResolutionFailure {
        candidate: candidate.to_string(),
        legal: legal.to_vec(),
    })
}

/// Strips markdown fences and bold markers and keeps the first non-empty
/// line, trimmed.
pub fn clean_response(text: &str) -> String {
    let without_markup = text.replace("```", "").replace("**", "");
    without_markup
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn start_moves() -> Vec<String> {
        crate::board::ChessGame::new().legal_moves()
    }

    #[test]
    fn test_exact_match() {
        let legal = moves(&["e4", "Nf3", "d4"]);
        let r = resolve("Nf3", &legal).unwrap();
        assert_eq!(r.mv, "Nf3");
        assert_eq!(r.rule, MatchRule::Exact);
    }

    #[test]
    fn test_case_insensitive_match() {
        let legal = moves(&["e4", "Nf3", "O-O"]);
        let r = resolve("nf3", &legal).unwrap();
        assert_eq!(r.mv, "Nf3");
        assert_eq!(r.rule, MatchRule::CaseInsensitive);
        assert_eq!(resolve("o-o", &legal).unwrap().mv, "O-O");
    }

    #[test]
    fn test_exact_preferred_over_case_variant() {
        let legal = moves(&["bxc3", "Bxc3"]);
        assert_eq!(resolve("Bxc3", &legal).unwrap().mv, "Bxc3");
        assert_eq!(resolve("bxc3", &legal).unwrap().mv, "bxc3");
    }

    #[test]
    fn test_contained_with_commentary() {
        let legal = moves(&["e4", "Nf3", "d4"]);
        let r = resolve("Nf3 develops a piece", &legal).unwrap();
        assert_eq!(r.mv, "Nf3");
        assert_eq!(r.rule, MatchRule::Contained);
    }

    #[test]
    fn test_contained_prefers_earliest_then_longest() {
        let legal = moves(&["O-O", "O-O-O", "d4"]);
        assert_eq!(resolve("O-O-O then d4", &legal).unwrap().mv, "O-O-O");
        assert_eq!(resolve("I play d4, not O-O", &legal).unwrap().mv, "d4");
    }

    #[test]
    fn test_suffix_insensitive() {
        let legal = moves(&["Qxf7#", "Bb5+", "e4"]);
        let r = resolve("Qxf7", &legal).unwrap();
        assert_eq!(r.mv, "Qxf7#");

        // Candidate carries a check marker the move does not have.
        let legal = moves(&["Nf3", "e4"]);
        let r = resolve("Nf3+", &legal);
        // "Nf3" is contained in "Nf3+", so rule 3 fires first.
        assert_eq!(r.unwrap().rule, MatchRule::Contained);

        let legal = moves(&["Kd1"]);
        let r = resolve("Kd1#", &legal).unwrap();
        assert_eq!(r.mv, "Kd1");
    }

    #[test]
    fn test_failure_lists_legal_moves() {
        let legal = moves(&["e4", "d4"]);
        let err = resolve("Qh5", &legal).unwrap_err();
        assert_eq!(err.candidate, "Qh5");
        assert_eq!(err.legal, legal);
        assert!(err.to_string().contains("e4, d4"));
    }

    #[test]
    fn test_empty_candidate_fails() {
        let legal = moves(&["e4"]);
        assert!(resolve("", &legal).is_err());
        assert!(resolve("+", &legal).is_err());
        assert!(resolve("e4", &[]).is_err());
    }

    #[test]
    fn test_bold_markdown_resolves() {
        let legal = moves(&["e4", "Nf3", "d4"]);
        let cleaned = clean_response("**Nf3**");
        assert_eq!(cleaned, "Nf3");
        assert_eq!(FuzzyMatch.resolve(&cleaned, &legal).unwrap().mv, "Nf3");
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(clean_response("```\ne4\n```"), "e4");
        assert_eq!(clean_response("\n\n  Nf3  \nbecause it develops"), "Nf3");
        assert_eq!(clean_response("   "), "");
        assert_eq!(clean_response("**O-O** is safest"), "O-O is safest");
    }

    proptest! {
        #[test]
        fn prop_legal_move_in_any_case_resolves(idx in 0usize..20, upper in any::<bool>()) {
            let legal = start_moves();
            let mv = &legal[idx];
            let candidate = if upper { mv.to_uppercase() } else { mv.to_lowercase() };
            prop_assert_eq!(&resolve(&candidate, &legal).unwrap().mv, mv);
        }

        #[test]
        fn prop_trailing_commentary_resolves(idx in 0usize..20, tail in " [a-z!?.,]{0,20}") {
            let legal = start_moves();
            let mv = &legal[idx];
            let candidate = format!("{mv}{tail}");
            prop_assert_eq!(&resolve(&candidate, &legal).unwrap().mv, mv);
        }

        #[test]
        fn prop_unrelated_text_fails(text in "[i-z0-9 ]{0,16}") {
            let legal = start_moves();
            prop_assert!(resolve(&text, &legal).is_err());
        }
    }
}
