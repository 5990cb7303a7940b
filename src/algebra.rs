// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Set algebra with cost proportional to the smaller operand.
//!
//! All binary operations share one traversal strategy: of the two operands, the one with fewer
//! members is walked (in ascending key order) and each of its members is looked up exactly once in
//! the other one. Each requested operation starts from a *seed* operand and folds that walk into
//! it:
//!
//! | operation | seed | per member `x` of the smaller operand |
//! |---|---|---|
//! | union | larger | add `x` |
//! | intersection | smaller | drop `x` unless the larger has it |
//! | larger − smaller | larger | drop `x` if the larger has it |
//! | smaller − larger | smaller | drop `x` if the larger has it |
//!
//! [`SSet::difference`] and [`SSet::opposite_difference`] map onto the last two rows depending on
//! which of `self` and `other` turned out to be larger, so the choice of traversal never changes a
//! result. On equal sizes, `self` is treated as the larger operand.
//!
//! Since every operation consumes the same walk, any combination of them is computed in a single
//! pass with [`SSet::combine`].
//!
//! Results are new sets derived from their seed: they carry the seed's plugins, which observe each
//! member added or dropped during the fold.
use crate::SSet;
use smallvec::SmallVec;

/// A binary set operation, for use with [`SSet::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetOperation {
    /// Members of either set.
    Union,
    /// Members of `self` that are not members of `other`.
    Difference,
    /// Members of `other` that are not members of `self`.
    OppositeDifference,
    /// Members of both sets.
    Intersection,
}

/// The results of [`SSet::combine`]; operations that were not requested are `None`.
#[derive(Debug, Clone, Default)]
pub struct Combined {
    pub union: Option<SSet>,
    pub difference: Option<SSet>,
    pub opposite_difference: Option<SSet>,
    pub intersection: Option<SSet>,
}

impl Combined {
    /// The result for `operation`, if it was requested.
    pub fn get(&self, operation: SetOperation) -> Option<&SSet> {
        match operation {
            SetOperation::Union => self.union.as_ref(),
            SetOperation::Difference => self.difference.as_ref(),
            SetOperation::OppositeDifference => self.opposite_difference.as_ref(),
            SetOperation::Intersection => self.intersection.as_ref(),
        }
    }

    fn slot(&mut self, operation: SetOperation) -> &mut Option<SSet> {
        match operation {
            SetOperation::Union => &mut self.union,
            SetOperation::Difference => &mut self.difference,
            SetOperation::OppositeDifference => &mut self.opposite_difference,
            SetOperation::Intersection => &mut self.intersection,
        }
    }
}

/// The seed and fold step of each operation, once operands are ordered by size.
#[derive(Debug, Clone, Copy)]
enum Reducer {
    /// Seed at the larger operand, add every member of the smaller one.
    Union,
    /// Seed at the smaller operand, keep the members the larger has.
    Intersection,
    /// Seed at the larger operand, drop the members the smaller has.
    LargerMinusSmaller,
    /// Seed at the smaller operand, drop the members the larger has.
    SmallerMinusLarger,
}

struct Operands<'a> {
    smallest: &'a SSet,
    largest: &'a SSet,
    self_is_largest: bool,
}

impl<'a> Operands<'a> {
    fn new(this: &'a SSet, other: &'a SSet) -> Self {
        if this.len() < other.len() {
            Self {
                smallest: this,
                largest: other,
                self_is_largest: false,
            }
        } else {
            Self {
                smallest: other,
                largest: this,
                self_is_largest: true,
            }
        }
    }

    fn reducer(&self, operation: SetOperation) -> Reducer {
        match (operation, self.self_is_largest) {
            (SetOperation::Union, _) => Reducer::Union,
            (SetOperation::Intersection, _) => Reducer::Intersection,
            (SetOperation::Difference, true) | (SetOperation::OppositeDifference, false) => {
                Reducer::LargerMinusSmaller
            }
            (SetOperation::Difference, false) | (SetOperation::OppositeDifference, true) => {
                Reducer::SmallerMinusLarger
            }
        }
    }

    fn seed(&self, reducer: Reducer) -> SSet {
        match reducer {
            Reducer::Union | Reducer::LargerMinusSmaller => self.largest.clone(),
            Reducer::Intersection | Reducer::SmallerMinusLarger => self.smallest.clone(),
        }
    }

    /// Seeds an accumulator for `operation`.
    fn start(&self, operation: SetOperation) -> (Reducer, SSet) {
        let reducer = self.reducer(operation);
        (reducer, self.seed(reducer))
    }

    /// Walks the smaller operand once, folding every member into all accumulators.
    fn fold(&self, accumulators: &mut [(Reducer, SSet)]) {
        tracing::trace!(
            smallest = self.smallest.len(),
            largest = self.largest.len(),
            operations = accumulators.len(),
            "folding set operations"
        );
        for (key, value) in self.smallest.store.iter() {
            let largest_has_it = self.largest.store.contains(key);
            for (reducer, acc) in accumulators.iter_mut() {
                match reducer {
                    Reducer::Union => {
                        acc.insert_member(*key, value.clone());
                    }
                    Reducer::Intersection => {
                        if !largest_has_it {
                            acc.remove_member(key);
                        }
                    }
                    Reducer::LargerMinusSmaller | Reducer::SmallerMinusLarger => {
                        if largest_has_it {
                            acc.remove_member(key);
                        }
                    }
                }
            }
        }
    }

    fn single(&self, operation: SetOperation) -> SSet {
        let mut accumulators = [self.start(operation)];
        self.fold(&mut accumulators);
        let [(_, result)] = accumulators;
        result
    }
}

impl SSet {
    /// Members of either set.
    ///
    /// ```rust
    /// use sset::sset;
    ///
    /// assert_eq!(sset![1, 2, 3].union(&sset![2, 3, 4]), sset![1, 2, 3, 4]);
    /// ```
    pub fn union(&self, other: &SSet) -> SSet {
        Operands::new(self, other).single(SetOperation::Union)
    }

    /// Members of `self` that are not members of `other`.
    pub fn difference(&self, other: &SSet) -> SSet {
        Operands::new(self, other).single(SetOperation::Difference)
    }

    /// Members of `other` that are not members of `self`; that is, `other.difference(self)`.
    pub fn opposite_difference(&self, other: &SSet) -> SSet {
        Operands::new(self, other).single(SetOperation::OppositeDifference)
    }

    /// Members of both sets.
    pub fn intersection(&self, other: &SSet) -> SSet {
        Operands::new(self, other).single(SetOperation::Intersection)
    }

    /// Members of exactly one of the sets, computed as the union minus the intersection.
    pub fn symmetric_difference(&self, other: &SSet) -> SSet {
        let operands = Operands::new(self, other);
        let mut accumulators = [
            operands.start(SetOperation::Union),
            operands.start(SetOperation::Intersection),
        ];
        operands.fold(&mut accumulators);
        let [(_, union), (_, intersection)] = accumulators;
        union.difference(&intersection)
    }

    /// Computes `self − other` and `other − self` in a single traversal.
    pub(crate) fn both_differences(&self, other: &SSet) -> (SSet, SSet) {
        let operands = Operands::new(self, other);
        let mut accumulators = [
            operands.start(SetOperation::Difference),
            operands.start(SetOperation::OppositeDifference),
        ];
        operands.fold(&mut accumulators);
        let [(_, difference), (_, opposite)] = accumulators;
        (difference, opposite)
    }

    /// Computes several operations against `other` in a single traversal.
    ///
    /// Requesting an operation more than once computes it once.
    ///
    /// ```rust
    /// use sset::{SetOperation, sset};
    ///
    /// let a = sset![1, 2, 3];
    /// let b = sset![2, 3, 4];
    /// let combined = a.combine(&b, &[SetOperation::Difference, SetOperation::OppositeDifference]);
    /// assert_eq!(combined.difference, Some(sset![1]));
    /// assert_eq!(combined.opposite_difference, Some(sset![4]));
    /// assert_eq!(combined.union, None);
    /// ```
    pub fn combine(&self, other: &SSet, operations: &[SetOperation]) -> Combined {
        let operands = Operands::new(self, other);
        let mut requested: SmallVec<[SetOperation; 4]> = operations.iter().copied().collect();
        requested.sort_unstable();
        requested.dedup();

        let mut accumulators: SmallVec<[(Reducer, SSet); 4]> =
            requested.iter().map(|&op| operands.start(op)).collect();
        operands.fold(&mut accumulators);

        let mut combined = Combined::default();
        for (operation, (_, result)) in requested.into_iter().zip(accumulators) {
            *combined.slot(operation) = Some(result);
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Plugins, SSet, plugin::test::Counter, sset};
    use quickcheck::TestResult;
    use serde_json::Value;

    #[test]
    fn folding_into_a_large_set_does_not_copy_it() {
        let big: SSet = (0..50_000).map(Value::from).collect();

        let nothing_new = sset![7, 11].union(&big);
        assert!(nothing_new.store.ptr_eq(&big.store));
        assert!(big.difference(&sset!["absent"]).store.ptr_eq(&big.store));

        // one new member per round; each round only rebuilds the path to it
        let grown = (0..2_000).fold(big.clone(), |acc, i| sset![format!("n{i}")].union(&acc));
        assert_eq!(grown.len(), 52_000);
        assert_eq!(big.len(), 50_000);
        assert!(!big.has("n0").unwrap());
    }

    #[test]
    fn basic_operations() {
        let a = sset![1, 2, 3];
        let b = sset![2, 3, 4];
        assert_eq!(a.union(&b), sset![1, 2, 3, 4]);
        assert_eq!(a.difference(&b), sset![1]);
        assert_eq!(a.opposite_difference(&b), sset![4]);
        assert_eq!(a.intersection(&b), sset![2, 3]);
        assert_eq!(a.symmetric_difference(&b), sset![1, 4]);
    }

    #[test]
    fn direction_survives_operand_swap() {
        let small = sset!["a", "b"];
        let large = sset!["b", "c", "d"];
        assert_eq!(small.difference(&large), sset!["a"]);
        assert_eq!(large.difference(&small), sset!["c", "d"]);
        assert_eq!(small.opposite_difference(&large), sset!["c", "d"]);
        assert_eq!(large.opposite_difference(&small), sset!["a"]);
    }

    #[test]
    fn with_empty_and_self() {
        let a = sset![1, 2];
        let empty = SSet::new();
        assert_eq!(a.union(&empty), a);
        assert_eq!(empty.union(&a), a);
        assert!(a.intersection(&empty).is_empty());
        assert_eq!(a.difference(&empty), a);
        assert!(empty.difference(&a).is_empty());
        assert_eq!(a.union(&a), a);
        assert!(a.difference(&a).is_empty());
        assert!(a.symmetric_difference(&a).is_empty());
    }

    #[test]
    fn operands_are_untouched() {
        let a = sset![1, 2, 3];
        let b = sset![3, 4];
        let _ = a.combine(
            &b,
            &[
                SetOperation::Union,
                SetOperation::Difference,
                SetOperation::OppositeDifference,
                SetOperation::Intersection,
            ],
        );
        assert_eq!(a, sset![1, 2, 3]);
        assert_eq!(b, sset![3, 4]);
    }

    #[test]
    fn combine_deduplicates_requests() {
        let a = sset![1, 2];
        let b = sset![2];
        let combined = a.combine(&b, &[SetOperation::Intersection, SetOperation::Intersection]);
        assert_eq!(combined.get(SetOperation::Intersection), Some(&sset![2]));
        assert!(combined.get(SetOperation::Union).is_none());
    }

    #[test]
    fn results_carry_seed_plugins() {
        let large = sset![1, 2, 3]
            .add_plugins(Plugins::new().with("counter", Counter))
            .unwrap();
        let small = sset![3, 4];

        // union seeds at the larger operand and reports the one new member
        let union = small.union(&large);
        assert_eq!(union.query::<Counter>("counter").unwrap(), 1);

        // intersection seeds at the smaller operand, which has no plugins
        assert!(large.intersection(&small).active_plugins().is_empty());
    }

    #[quickcheck]
    fn union_is_at_least_as_large(a: SSet, b: SSet) -> bool {
        a.union(&b).len() >= a.len().max(b.len())
    }

    #[quickcheck]
    fn intersection_is_subset_of_both(a: SSet, b: SSet) -> bool {
        let i = a.intersection(&b);
        i.is_subset(&a) && i.is_subset(&b)
    }

    #[quickcheck]
    fn union_is_commutative(a: SSet, b: SSet) -> bool {
        a.union(&b) == b.union(&a)
    }

    #[quickcheck]
    fn combine_agrees_with_single_operations(a: SSet, b: SSet) -> bool {
        let c = a.combine(
            &b,
            &[
                SetOperation::Union,
                SetOperation::Difference,
                SetOperation::OppositeDifference,
                SetOperation::Intersection,
            ],
        );
        c.union == Some(a.union(&b))
            && c.difference == Some(a.difference(&b))
            && c.opposite_difference == Some(b.difference(&a))
            && c.intersection == Some(b.intersection(&a))
    }

    #[quickcheck]
    fn membership_matches_definition(a: SSet, b: SSet) -> TestResult {
        if a.is_empty() && b.is_empty() {
            return TestResult::discard();
        }
        let union = a.union(&b);
        let diff = a.difference(&b);
        let sym = a.symmetric_difference(&b);
        TestResult::from_bool(union.iter().all(|v| {
            let in_a = a.has(v).unwrap();
            let in_b = b.has(v).unwrap();
            (in_a || in_b)
                && diff.has(v).unwrap() == (in_a && !in_b)
                && sym.has(v).unwrap() == (in_a != in_b)
        }))
    }

    #[quickcheck]
    fn equals_iff_symmetric_difference_is_empty(a: SSet, b: SSet) -> bool {
        (a == b) == a.symmetric_difference(&b).is_empty() && a.equals(&a.clone())
    }
}
