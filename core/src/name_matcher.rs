//! Name matching — decides whether a candidate record refers to the subject.
//!
//! Normalisation folds to NFKC, then lowercases and strips separators.
//! Letters and marks of every script survive, so "山田 花子" and "山田花子"
//! compare equal while Devanagari vowel signs or Arabic diacritics are
//! preserved. Precomposed and decomposed accents fold to one form, and so
//! do full-width Latin letters.

use crate::config::MatcherConfig;
use crate::finding::MatchKind;
use unicode_normalization::UnicodeNormalization;

/// Characters removed after NFKC folding: Latin punctuation plus the
/// ideographic and dash variants that play the same role.
const SEPARATORS: &[char] = &[
    '.', ',', '-', '\'', '_', '\u{2010}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2019}',
    '\u{3001}', '\u{3002}', '\u{30FB}',
];

/// Containment is only considered when the shorter side has at least
/// this many characters.
const MIN_PARTIAL_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameMatch {
    pub score: f64,
    pub kind: MatchKind,
}

impl NameMatch {
    fn beats(&self, other: &NameMatch) -> bool {
        self.score > other.score || (self.score == other.score && self.kind.rank() > other.kind.rank())
    }
}

#[derive(Debug, Clone)]
pub struct NameMatcher {
    config: MatcherConfig,
}

impl NameMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// NFKC-fold, lowercase and strip separators and whitespace of any script.
    pub fn normalize(name: &str) -> String {
        name.nfkc()
            .filter(|c| !c.is_whitespace() && !SEPARATORS.contains(c))
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Best match of any subject name against the candidate's name and
    /// aliases. `None` means the candidate must be dropped.
    pub fn match_names<'s, 'c, S, A>(
        &self,
        subject_names: S,
        candidate_name: &str,
        candidate_aliases: A,
    ) -> Option<NameMatch>
    where
        S: IntoIterator<Item = &'s str>,
        A: IntoIterator<Item = &'c str>,
    {
        let candidate = Self::normalize(candidate_name);
        let aliases: Vec<String> = candidate_aliases
            .into_iter()
            .map(Self::normalize)
            .filter(|a| !a.is_empty())
            .collect();

        let mut best: Option<NameMatch> = None;
        for name in subject_names {
            let query = Self::normalize(name);
            if query.is_empty() {
                continue;
            }
            if let Some(found) = self.match_one(&query, &candidate, &aliases) {
                if best.map_or(true, |b| found.beats(&b)) {
                    best = Some(found);
                }
            }
        }
        best
    }

    fn match_one(&self, query: &str, candidate: &str, aliases: &[String]) -> Option<NameMatch> {
        if !candidate.is_empty() && query == candidate {
            return Some(NameMatch {
                score: self.config.exact_score,
                kind: MatchKind::Exact,
            });
        }
        if aliases.iter().any(|a| a == query) {
            return Some(NameMatch {
                score: self.config.alias_exact_score,
                kind: MatchKind::AliasExact,
            });
        }
        let contains = std::iter::once(candidate)
            .chain(aliases.iter().map(String::as_str))
            .filter(|c| !c.is_empty())
            .any(|c| partially_contains(query, c));
        contains.then_some(NameMatch {
            score: self.config.partial_score,
            kind: MatchKind::Partial,
        })
    }
}

fn partially_contains(a: &str, b: &str) -> bool {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    short.chars().count() >= MIN_PARTIAL_CHARS && long.contains(short)
}
