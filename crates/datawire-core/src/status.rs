//! Decode status lattice.
//!
//! Every [`DataItem`](crate::DataItem) carries a status describing how
//! cleanly it was produced. Statuses are totally ordered by a priority level
//! and aggregate through [`DecodeStatus::join`], which keeps the
//! least-strict (lowest priority) member. A compound item is therefore never
//! reported cleaner than its dirtiest child.

/// Decoding status associated with a data item.
///
/// The three failure statuses invalidate payload reads; the remaining five
/// describe progressively stronger guarantees, up to `Original` for items
/// built directly through the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStatus {
    /// The wire data violated the format specification.
    Invalid,
    /// The wire data was well formed but exceeds implementation limits.
    Unsupported,
    /// A schema operation rejected the item.
    FailedSchema,
    /// Parseable but semantically dubious (duplicate keys, unassigned
    /// simple values); not safely translatable between formats.
    WellFormed,
    /// Produced by a schema `tokenize` operation.
    Tokenized,
    /// Produced by a schema `expand` operation.
    Expanded,
    /// Decoded cleanly; translatable between CBOR and JSON.
    Translatable,
    /// Built by the application through the factory.
    Original,
}

impl DecodeStatus {
    /// Priority level: lower levels are less strict and win a [`join`].
    ///
    /// [`join`]: DecodeStatus::join
    pub const fn priority(self) -> u8 {
        match self {
            DecodeStatus::Invalid => 0,
            DecodeStatus::Unsupported => 1,
            DecodeStatus::FailedSchema => 2,
            DecodeStatus::WellFormed => 3,
            DecodeStatus::Tokenized => 4,
            DecodeStatus::Expanded => 5,
            DecodeStatus::Translatable => 6,
            DecodeStatus::Original => 7,
        }
    }

    /// Returns `true` for the statuses that invalidate payload reads.
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            DecodeStatus::Invalid | DecodeStatus::Unsupported | DecodeStatus::FailedSchema
        )
    }

    /// Combines two statuses, keeping the least strict of the pair.
    #[must_use]
    pub fn join(self, other: DecodeStatus) -> DecodeStatus {
        if other.priority() < self.priority() {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DecodeStatus::*;
    use super::*;

    const ALL: [DecodeStatus; 8] = [
        Invalid,
        Unsupported,
        FailedSchema,
        WellFormed,
        Tokenized,
        Expanded,
        Translatable,
        Original,
    ];

    #[test]
    fn priorities_are_distinct_and_ordered() {
        for w in ALL.windows(2) {
            assert!(w[0].priority() < w[1].priority());
        }
    }

    #[test]
    fn failure_statuses() {
        assert!(Invalid.is_failure());
        assert!(Unsupported.is_failure());
        assert!(FailedSchema.is_failure());
        assert!(!WellFormed.is_failure());
        assert!(!Tokenized.is_failure());
        assert!(!Expanded.is_failure());
        assert!(!Translatable.is_failure());
        assert!(!Original.is_failure());
    }

    #[test]
    fn join_keeps_least_strict() {
        assert_eq!(Translatable.join(WellFormed), WellFormed);
        assert_eq!(WellFormed.join(Translatable), WellFormed);
        assert_eq!(Original.join(Invalid), Invalid);
        assert_eq!(Tokenized.join(Tokenized), Tokenized);
    }

    #[test]
    fn join_is_commutative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.join(b), b.join(a));
            }
        }
    }

    #[test]
    fn join_is_associative() {
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    assert_eq!(a.join(b).join(c), a.join(b.join(c)));
                }
            }
        }
    }

    #[test]
    fn join_is_idempotent() {
        for a in ALL {
            assert_eq!(a.join(a), a);
        }
    }
}
