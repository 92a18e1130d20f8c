//! Reserved sentinel characters and the character-set type used by
//! starter-set analysis.
//!
//! The alphabet of the engine is the set of Unicode scalar values extended
//! by three reserved non-characters. A matcher's starter set is expressed
//! over this extended alphabet: membership of [`EMPTY`] signals that the
//! matcher can succeed without consuming input.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Virtual character reported at the end-of-input position.
pub const EOI: char = '\u{FFFF}';
/// Matches any single real input character.
pub const ANY: char = '\u{FFFE}';
/// Matches without consuming input.
pub const EMPTY: char = '\u{FFFD}';

/// Returns true for the three reserved sentinel characters.
pub fn is_sentinel(c: char) -> bool {
    c == EOI || c == ANY || c == EMPTY
}

/// A finite or cofinite set of characters over the extended alphabet.
///
/// Cofinite sets arise from complementing: the starter set of a
/// not-predicate is "everything but the characters its subject starts
/// on". Both representations keep their members in a `BTreeSet` so that
/// rendering and comparison are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterSet {
    /// Exactly the listed characters.
    Of(BTreeSet<char>),
    /// Every character of the extended alphabet except the listed ones.
    AllBut(BTreeSet<char>),
}

impl CharacterSet {
    /// The empty set.
    pub fn none() -> Self {
        CharacterSet::Of(BTreeSet::new())
    }

    /// The full extended alphabet.
    pub fn all() -> Self {
        CharacterSet::AllBut(BTreeSet::new())
    }

    /// A singleton set.
    pub fn of(c: char) -> Self {
        let mut set = BTreeSet::new();
        set.insert(c);
        CharacterSet::Of(set)
    }

    /// A set over the listed characters.
    pub fn of_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        CharacterSet::Of(chars.into_iter().collect())
    }

    /// All characters in the inclusive range `lo..=hi`.
    pub fn of_range(lo: char, hi: char) -> Self {
        CharacterSet::Of((lo..=hi).collect())
    }

    pub fn contains(&self, c: char) -> bool {
        match self {
            CharacterSet::Of(set) => set.contains(&c),
            CharacterSet::AllBut(set) => !set.contains(&c),
        }
    }

    /// This set with `c` added.
    pub fn with(&self, c: char) -> Self {
        let mut result = self.clone();
        match &mut result {
            CharacterSet::Of(set) => {
                set.insert(c);
            }
            CharacterSet::AllBut(set) => {
                set.remove(&c);
            }
        }
        result
    }

    /// This set with `c` removed.
    pub fn without(&self, c: char) -> Self {
        let mut result = self.clone();
        match &mut result {
            CharacterSet::Of(set) => {
                set.remove(&c);
            }
            CharacterSet::AllBut(set) => {
                set.insert(c);
            }
        }
        result
    }

    pub fn union(&self, other: &CharacterSet) -> CharacterSet {
        use CharacterSet::{AllBut, Of};
        match (self, other) {
            (Of(a), Of(b)) => Of(a.union(b).copied().collect()),
            // all-but-B ∪ A  =  all but (B \ A)
            (Of(a), AllBut(b)) | (AllBut(b), Of(a)) => {
                AllBut(b.difference(a).copied().collect())
            }
            (AllBut(a), AllBut(b)) => AllBut(a.intersection(b).copied().collect()),
        }
    }

    pub fn intersect(&self, other: &CharacterSet) -> CharacterSet {
        use CharacterSet::{AllBut, Of};
        match (self, other) {
            (Of(a), Of(b)) => Of(a.intersection(b).copied().collect()),
            (Of(a), AllBut(b)) | (AllBut(b), Of(a)) => {
                Of(a.difference(b).copied().collect())
            }
            (AllBut(a), AllBut(b)) => AllBut(a.union(b).copied().collect()),
        }
    }

    pub fn complement(&self) -> CharacterSet {
        match self {
            CharacterSet::Of(set) => CharacterSet::AllBut(set.clone()),
            CharacterSet::AllBut(set) => CharacterSet::Of(set.clone()),
        }
    }

    pub fn is_subset_of(&self, other: &CharacterSet) -> bool {
        use CharacterSet::{AllBut, Of};
        match (self, other) {
            (Of(a), _) => a.iter().all(|c| other.contains(*c)),
            // A cofinite set can only be contained in another cofinite set.
            (AllBut(_), Of(_)) => false,
            (AllBut(a), AllBut(b)) => b.is_subset(a),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CharacterSet::Of(set) if set.is_empty())
    }
}

impl fmt::Display for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, set) = match self {
            CharacterSet::Of(set) => ("", set),
            CharacterSet::AllBut(set) => ("^", set),
        };
        write!(f, "[{}", prefix)?;
        for c in set {
            match *c {
                EOI => write!(f, "{{EOI}}")?,
                ANY => write!(f, "{{ANY}}")?,
                EMPTY => write!(f, "{{EMPTY}}")?,
                c => write!(f, "{}", c)?,
            }
        }
        write!(f, "]")
    }
}
