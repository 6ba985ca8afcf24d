//! Binary search over sorted slices with lower-bound semantics.
//!
//! Every lookup in the tree goes through this module: locating a key inside a
//! node, locating a value inside a leaf bucket, and locating the first entry of
//! a range scan.

use core::borrow::Borrow;
use core::cmp::Ordering;

/// Outcome of searching a sorted slice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchResult {
    /// An equal element sits at this index. When the slice holds several equal
    /// elements this is the first of them.
    Found(usize),
    /// No equal element exists; this is the insertion point that keeps the slice
    /// sorted (the first element that is not less than the target).
    NotFound(usize),
}

impl SearchResult {
    /// Returns the matched index or the insertion point.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            SearchResult::Found(index) | SearchResult::NotFound(index) => index,
        }
    }

    /// Returns true if an equal element was found.
    #[inline]
    #[must_use]
    pub const fn is_found(self) -> bool {
        matches!(self, SearchResult::Found(_))
    }
}

/// Searches `slice` for `target` using its natural ordering.
///
/// # Examples
///
/// ```
/// use bucket_tree::search::{search, SearchResult};
///
/// let keys = [10, 20, 30];
/// assert_eq!(search(&keys, &20), SearchResult::Found(1));
/// assert_eq!(search(&keys, &25), SearchResult::NotFound(2));
/// assert_eq!(search::<i32, i32>(&[], &5), SearchResult::NotFound(0));
/// ```
#[inline]
pub fn search<T, Q>(slice: &[T], target: &Q) -> SearchResult
where
    T: Borrow<Q>,
    Q: ?Sized + Ord,
{
    search_by(slice, |element| element.borrow().cmp(target))
}

/// Searches `slice` with a comparator that orders each element against the target.
///
/// `compare` must return `Less` for elements that sort before the target, `Equal`
/// for matches, and `Greater` otherwise, consistently with the order of `slice`.
pub fn search_by<T, F>(slice: &[T], mut compare: F) -> SearchResult
where
    F: FnMut(&T) -> Ordering,
{
    let index = slice.partition_point(|element| compare(element) == Ordering::Less);
    match slice.get(index) {
        Some(element) if compare(element) == Ordering::Equal => SearchResult::Found(index),
        _ => SearchResult::NotFound(index),
    }
}

/// Returns the first index whose element is strictly greater than `target`.
///
/// Inserting at this position places `target` after any equal elements.
#[inline]
pub fn upper_bound<T, Q>(slice: &[T], target: &Q) -> usize
where
    T: Borrow<Q>,
    Q: ?Sized + Ord,
{
    slice.partition_point(|element| element.borrow() <= target)
}
