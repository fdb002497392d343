//! Strongly-typed index newtypes.
//!
//! These types prevent mixing up positions in the reach arena with
//! positions in the gauge list, and both with external reach ids.

/// Macro to generate index newtypes with common functionality.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Create a new index.
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Get the raw index value.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }

            /// Create an iterator over [0, n) indices.
            pub fn iter(n: usize) -> impl ExactSizeIterator<Item = $name> + DoubleEndedIterator {
                (0..n).map($name)
            }
        }

        // Allow using as array index
        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for [T] {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }
    };
}

define_index!(
    /// Position of a reach in the registry (input order).
    ///
    /// Every per-reach vector in the crate (inflow, discharge, correction
    /// factors) is laid out by `ReachIndex`.
    ///
    /// # Example
    ///
    /// ```
    /// use rivnet_rs::types::ReachIndex;
    ///
    /// let reach = ReachIndex::new(42);
    /// assert_eq!(reach.get(), 42);
    /// ```
    ReachIndex
);

define_index!(
    /// Position of a gauge in a selection (row of `S`).
    ///
    /// # Example
    ///
    /// ```
    /// use rivnet_rs::types::GaugeIndex;
    ///
    /// let gauge = GaugeIndex::new(3);
    /// assert_eq!(gauge.get(), 3);
    /// ```
    GaugeIndex
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reach_index() {
        let idx = ReachIndex::new(42);
        assert_eq!(idx.get(), 42);
    }

    #[test]
    fn test_array_indexing() {
        let mut data = vec![10.0, 20.0, 30.0];
        let idx = ReachIndex::new(1);
        assert_eq!(data[idx], 20.0);
        data[idx] = 25.0;
        assert_eq!(data[1], 25.0);
    }

    #[test]
    fn test_iter_reverses() {
        let forward: Vec<_> = GaugeIndex::iter(3).collect();
        let backward: Vec<_> = GaugeIndex::iter(3).rev().collect();
        assert_eq!(forward.len(), 3);
        assert_eq!(backward[0], GaugeIndex::new(2));
    }
}
