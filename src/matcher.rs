// 🔍 Identity Matcher - Who is this (name, phone) pair?
// Two strategies: Exact Phone, plus fuzzy candidates (Similar Phone, Same Name)
//
// Fuzzy phone matching is deliberately narrow: equal length, exactly one
// differing position. No phonetic or edit-distance matching.

use crate::record::AttendeeRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// MATCH TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Stored name equals the input name exactly (wins when both apply)
    SameName,

    /// Stored phone is one character away from the input phone
    SimilarPhone,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::SameName => "same-name",
            MatchType::SimilarPhone => "similar-phone",
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            MatchType::SameName => "同名",
            MatchType::SimilarPhone => "号码相似",
        }
    }
}

// ============================================================================
// CANDIDATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,

    /// Raw phone, sent back as the override to claim this identity
    pub phone: String,

    /// Safe for display to the operator
    pub masked_phone: String,

    pub match_type: MatchType,
}

#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    /// First record whose phone equals the input phone
    pub exact: Option<&'a AttendeeRecord>,

    /// Ambiguous candidates, de-duplicated by phone
    pub fuzzy: Vec<Candidate>,
}

// ============================================================================
// MATCHING
// ============================================================================

/// Compute exact and fuzzy candidates for `(name, phone)` against `records`.
pub fn find_candidates<'a>(records: &'a [AttendeeRecord], name: &str, phone: &str) -> MatchResult<'a> {
    let exact = records.iter().find(|r| r.phone == phone);

    let phone_matches = records.iter().filter(|r| phone_distance(&r.phone, phone) == Some(1));
    let name_matches = records.iter().filter(|r| r.name == name && r.phone != phone);

    let mut fuzzy: Vec<Candidate> = Vec::new();
    for rec in phone_matches.chain(name_matches) {
        // first occurrence of a phone wins
        if fuzzy.iter().any(|c| c.phone == rec.phone) {
            continue;
        }

        let match_type = if rec.name == name {
            MatchType::SameName
        } else {
            MatchType::SimilarPhone
        };

        fuzzy.push(Candidate {
            name: rec.name.clone(),
            phone: rec.phone.clone(),
            masked_phone: mask_phone(&rec.phone),
            match_type,
        });
    }

    MatchResult { exact, fuzzy }
}

/// Hamming distance over characters. `None` when the lengths differ,
/// which makes the two phones incomparable rather than "far apart".
pub fn phone_distance(a: &str, b: &str) -> Option<usize> {
    if a.chars().count() != b.chars().count() {
        return None;
    }
    Some(a.chars().zip(b.chars()).filter(|(x, y)| x != y).count())
}

/// Keep the first 3 and last 4 characters, star out the middle.
/// Phones of 7 characters or fewer have no middle and are returned as is.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 7 {
        return phone.to_string();
    }

    let hidden = chars.len() - 7;
    let mut masked: String = chars[..3].iter().collect();
    masked.push_str(&"*".repeat(hidden));
    masked.extend(&chars[chars.len() - 4..]);
    masked
}

// ============================================================================
// TESTS
// ============================================================================
