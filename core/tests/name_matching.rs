//! Name matching across scripts, aliases and partial containment.

use duediligence_core::{
    config::EngineConfig,
    finding::MatchKind,
    name_matcher::NameMatcher,
};

const NO_ALIASES: [&str; 0] = [];

fn matcher() -> NameMatcher {
    NameMatcher::new(EngineConfig::default().matcher)
}

/// Subject alias equal to the candidate's primary name is still an exact hit.
#[test]
fn subject_alias_hits_candidate_primary_exactly() {
    let found = matcher()
        .match_names(["Bob Jones", "Viktor Volkov"], "Viktor Volkov", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Exact);
    assert_eq!(found.score, 1.0);
}

/// A subject name equal to one of the candidate's aliases scores 0.95.
#[test]
fn candidate_alias_is_alias_exact() {
    let found = matcher()
        .match_names(["J. Smith"], "Jonathan Smith", ["j smith"])
        .unwrap();
    assert_eq!(found.kind, MatchKind::AliasExact);
    assert!((found.score - 0.95).abs() < 1e-12);
}

#[test]
fn surname_inside_full_name_is_partial() {
    let found = matcher()
        .match_names(["Petrov"], "Viktor Petrov Volkov", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Partial);
    assert!((found.score - 0.7).abs() < 1e-12);
}

#[test]
fn unrelated_names_do_not_match() {
    assert!(matcher()
        .match_names(["Maria Garcia"], "Nikolai Petrov", ["N. Petrov"])
        .is_none());
}

/// One letter is contained in almost every name; it must not count.
#[test]
fn single_character_never_matches_partially() {
    assert!(matcher().match_names(["A"], "Anna Karenina", NO_ALIASES).is_none());
}

#[test]
fn japanese_names_match_regardless_of_spacing() {
    let found = matcher()
        .match_names(["山田 花子"], "山田花子", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Exact);
}

#[test]
fn latin_candidate_never_matches_japanese_subject() {
    assert!(matcher()
        .match_names(["山田花子"], "Hanako Yamada", ["H. Yamada"])
        .is_none());
}

#[test]
fn best_match_over_all_subject_names_wins() {
    let found = matcher()
        .match_names(["Petrov", "Nikolai Petrov"], "Nikolai Petrov", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Exact);
}

/// Only the second of two short aliases matches, and only as an alias.
#[test]
fn second_subject_alias_matching_candidate_alias() {
    let found = matcher()
        .match_names(["John Doe", "A", "B"], "Robert Roe", ["B", "Bobby"])
        .unwrap();
    assert_eq!(found.kind, MatchKind::AliasExact);
    assert!((found.score - 0.95).abs() < 1e-12);
}

/// A listed name stored with combining accents still hits the precomposed query.
#[test]
fn decomposed_accents_match_precomposed() {
    let found = matcher()
        .match_names(["Jos\u{e9} Garc\u{ed}a"], "Jose\u{301} Garci\u{301}a", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Exact);
    assert_eq!(
        NameMatcher::normalize("Jose\u{301}"),
        NameMatcher::normalize("Jos\u{e9}")
    );
}

#[test]
fn full_width_latin_matches_ascii() {
    let found = matcher()
        .match_names(["John Smith"], "ＪＯＨＮ　ＳＭＩＴＨ", NO_ALIASES)
        .unwrap();
    assert_eq!(found.kind, MatchKind::Exact);
}

#[test]
fn full_width_alias_is_alias_exact() {
    let found = matcher()
        .match_names(["J. Smith"], "Jonathan Smith", ["Ｊ．Ｓｍｉｔｈ"])
        .unwrap();
    assert_eq!(found.kind, MatchKind::AliasExact);
}
