use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

use crate::index::NodeIndex;
use crate::interval::Interval;
use crate::iter::Iter;
use crate::node::Node;
use crate::point::Point;

/// An interval-value tree, balanced as an AVL tree and augmented with the
/// maximum upper bound of every subtree.
///
/// The tree is built once from a batch of intervals and queried afterwards;
/// it supports no removal.
#[derive(Debug)]
pub struct IntervalTree<T, V> {
    /// Vector that stores nodes
    pub(crate) nodes: Vec<Node<T, V>>,
    /// Root of the interval tree
    pub(crate) root: Option<NodeIndex>,
}

impl<T, V> IntervalTree<T, V>
where
    T: Ord,
{
    /// Create an empty `IntervalTree`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new `IntervalTree` with estimated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        IntervalTree {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    /// Insert an interval-value pair into the tree.
    ///
    /// If an equal interval is already stored the tree is left untouched and
    /// `false` is returned: the first value inserted for a key wins.
    ///
    /// # Panics
    ///
    /// This method panics when the tree is at the maximum number of nodes for its index
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalTree};
    ///
    /// let mut tree = IntervalTree::new();
    /// assert!(tree.insert(Interval::new(1, 3).unwrap(), 1));
    /// assert!(!tree.insert(Interval::new(1, 3).unwrap(), 2));
    /// assert_eq!(tree.get(&Interval::new(1, 3).unwrap()), Some(&1));
    /// ```
    pub fn insert(&mut self, interval: Interval<T>, value: V) -> bool {
        let mut parent = None;
        let mut as_left = false;
        let mut x = self.root;
        while let Some(xi) = x {
            parent = Some(xi);
            match interval.cmp(self.node_ref(xi, Node::interval)) {
                Ordering::Equal => return false,
                Ordering::Less => {
                    as_left = true;
                    x = self.node_ref(xi, Node::left);
                }
                Ordering::Greater => {
                    as_left = false;
                    x = self.node_ref(xi, Node::right);
                }
            }
        }

        assert!(self.nodes.len() < NodeIndex::MAX, "Reached maximum number of nodes");
        let z = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::new(interval, value, z));
        self.node_mut(z, Node::set_parent(parent));

        match parent {
            None => self.root = Some(z),
            Some(p) => {
                if as_left {
                    self.node_mut(p, Node::set_left(Some(z)));
                } else {
                    self.node_mut(p, Node::set_right(Some(z)));
                }
                self.update_max_bottom_up(p);
                self.insert_rebalance(z);
            }
        }
        true
    }

    /// Find all intervals in the tree that overlap with the given interval,
    /// sorted by interval.
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalTree};
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.insert(Interval::new(1, 3).unwrap(), ());
    /// tree.insert(Interval::new(2, 4).unwrap(), ());
    /// tree.insert(Interval::new(6, 7).unwrap(), ());
    /// tree.insert(Interval::new(7, 11).unwrap(), ());
    /// assert_eq!(tree.find_all_overlap(&Interval::new(2, 7).unwrap()).len(), 3);
    /// ```
    #[inline]
    pub fn find_all_overlap(&self, interval: &Interval<T>) -> Vec<(&Interval<T>, &V)> {
        let mut list = Vec::new();
        if let Some(root) = self.root {
            self.collect_overlap(root, &interval.lower, &interval.upper, &mut list);
        }
        list
    }

    /// Return the set of values whose interval overlaps `[lower, upper]`.
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalTree};
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.insert(Interval::new(1, 3).unwrap(), "a");
    /// tree.insert(Interval::new(5, 9).unwrap(), "b");
    /// let hits = tree.search_overlapping(&2, &6);
    /// assert!(hits.contains(&"a") && hits.contains(&"b"));
    /// assert!(tree.search_overlapping(&3, &5).is_empty());
    /// ```
    pub fn search_overlapping(&self, lower: &T, upper: &T) -> HashSet<&V>
    where
        V: Eq + Hash,
    {
        let mut list = Vec::new();
        if let Some(root) = self.root {
            self.collect_overlap(root, lower, upper, &mut list);
        }
        list.into_iter().map(|(_, v)| v).collect()
    }

    /// Find the greatest interval containing `point`.
    ///
    /// When several stored intervals contain the point, the one that starts
    /// last wins.
    #[inline]
    pub fn find_containing(&self, point: &T) -> Option<(&Interval<T>, &V)> {
        self.root
            .and_then(|root| self.containing(root, point))
            .map(|x| self.node_ref(x, |xn| (xn.interval(), xn.value())))
    }

    /// Return reference to the value corresponding to the key.
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalTree};
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.insert(Interval::new(1, 3).unwrap(), 1);
    /// tree.insert(Interval::new(7, 11).unwrap(), 4);
    /// assert_eq!(tree.get(&Interval::new(7, 11).unwrap()), Some(&4));
    /// assert_eq!(tree.get(&Interval::new(5, 17).unwrap()), None);
    /// ```
    #[inline]
    pub fn get(&self, interval: &Interval<T>) -> Option<&V> {
        let mut x = self.root;
        while let Some(xi) = x {
            x = match interval.cmp(self.node_ref(xi, Node::interval)) {
                Ordering::Equal => return Some(self.node_ref(xi, Node::value)),
                Ordering::Less => self.node_ref(xi, Node::left),
                Ordering::Greater => self.node_ref(xi, Node::right),
            };
        }
        None
    }

    /// Get an iterator over the entries of the tree, sorted by interval.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T, V> {
        Iter::new(self)
    }

    /// Return the number of elements in the tree.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` if the tree contains no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[must_use]
    pub fn height(&self) -> usize {
        fn height_of<T, V>(tree: &IntervalTree<T, V>, x: Option<NodeIndex>) -> usize {
            x.map_or(0, |xi| {
                let node = &tree.nodes[xi.index()];
                1 + height_of(tree, node.left).max(height_of(tree, node.right))
            })
        }
        height_of(self, self.root)
    }
}

impl<T, V> IntervalTree<T, V>
where
    T: Point,
{
    /// Return the value whose interval contains `point`, or else the value of
    /// the interval whose lower bound is closest to `point`.
    ///
    /// Ties in distance go to the interval starting before `point`.
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalTree};
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.insert(Interval::new(0, 10).unwrap(), "early");
    /// tree.insert(Interval::new(40, 50).unwrap(), "late");
    /// assert_eq!(tree.lookup_nearest(&5), Some(&"early"));
    /// assert_eq!(tree.lookup_nearest(&30), Some(&"late"));
    /// assert_eq!(tree.lookup_nearest(&15), Some(&"early"));
    /// ```
    pub fn lookup_nearest(&self, point: &T) -> Option<&V> {
        let root = self.root?;
        if let Some(x) = self.containing(root, point) {
            return Some(self.node_ref(x, Node::value));
        }

        let mut pred = None;
        let mut succ = None;
        let mut x = Some(root);
        while let Some(xi) = x {
            if &self.node_ref(xi, Node::interval).lower <= point {
                pred = Some(xi);
                x = self.node_ref(xi, Node::right);
            } else {
                succ = Some(xi);
                x = self.node_ref(xi, Node::left);
            }
        }

        let nearest = match (pred, succ) {
            (Some(p), Some(s)) => {
                let before = point.distance(&self.node_ref(p, Node::interval).lower);
                let after = self.node_ref(s, Node::interval).lower.distance(point);
                if before <= after {
                    p
                } else {
                    s
                }
            }
            (Some(p), None) => p,
            (None, Some(s)) => s,
            (None, None) => return None,
        };
        Some(self.node_ref(nearest, Node::value))
    }
}

impl<T, V> Default for IntervalTree<T, V>
where
    T: Ord,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> Extend<(Interval<T>, V)> for IntervalTree<T, V>
where
    T: Ord,
{
    fn extend<I: IntoIterator<Item = (Interval<T>, V)>>(&mut self, iter: I) {
        for (interval, value) in iter {
            let _ignore = self.insert(interval, value);
        }
    }
}

impl<T, V> FromIterator<(Interval<T>, V)> for IntervalTree<T, V>
where
    T: Ord,
{
    fn from_iter<I: IntoIterator<Item = (Interval<T>, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<T, V> IntervalTree<T, V>
where
    T: Ord,
{
    /// In-order walk collecting every node overlapping `[lower, upper]`.
    fn collect_overlap<'a>(
        &'a self,
        x: NodeIndex,
        lower: &T,
        upper: &T,
        list: &mut Vec<(&'a Interval<T>, &'a V)>,
    ) {
        if let Some(left) = self.node_ref(x, Node::left) {
            if self.max(left) >= lower {
                self.collect_overlap(left, lower, upper, list);
            }
        }
        let node = &self.nodes[x.index()];
        if upper < &node.interval.lower {
            return;
        }
        if &node.interval.lower < upper && lower < &node.interval.upper {
            list.push((node.interval(), node.value()));
        }
        if let Some(right) = node.right {
            if self.max(right) >= lower {
                self.collect_overlap(right, lower, upper, list);
            }
        }
    }

    /// Reverse in-order walk returning the greatest node containing `point`.
    fn containing(&self, x: NodeIndex, point: &T) -> Option<NodeIndex> {
        if self.max(x) < point {
            return None;
        }
        let node = &self.nodes[x.index()];
        if &node.interval.lower <= point {
            if let Some(hit) = node.right.and_then(|r| self.containing(r, point)) {
                return Some(hit);
            }
            if node.interval.contains(point) {
                return Some(x);
            }
        }
        node.left.and_then(|l| self.containing(l, point))
    }

    /// Restore AVL balance after attaching the leaf `z`.
    fn insert_rebalance(&mut self, z: NodeIndex) {
        let mut child = z;
        while let Some(p) = self.node_ref(child, Node::parent) {
            let delta = if self.node_ref(p, Node::left) == Some(child) {
                -1
            } else {
                1
            };
            match self.node_mut(p, Node::add_balance(delta)) {
                0 => break,
                -1 | 1 => child = p,
                -2 => {
                    if self.node_ref(child, Node::balance) < 0 {
                        self.right_rotate(p);
                        self.node_mut(p, Node::set_balance(0));
                        self.node_mut(child, Node::set_balance(0));
                    } else {
                        self.left_right_rotate(p);
                    }
                    break;
                }
                2 => {
                    if self.node_ref(child, Node::balance) > 0 {
                        self.left_rotate(p);
                        self.node_mut(p, Node::set_balance(0));
                        self.node_mut(child, Node::set_balance(0));
                    } else {
                        self.right_left_rotate(p);
                    }
                    break;
                }
                b => unreachable!("balance factor {b} after a single insertion"),
            }
        }
    }

    /// Rotate `x`'s left child left, then `x` right.
    fn left_right_rotate(&mut self, x: NodeIndex) {
        let Some(z) = self.node_ref(x, Node::left) else {
            return;
        };
        let Some(y) = self.node_ref(z, Node::right) else {
            return;
        };
        let y_balance = self.node_ref(y, Node::balance);
        self.left_rotate(z);
        self.right_rotate(x);
        let (z_balance, x_balance) = match y_balance.cmp(&0) {
            Ordering::Less => (0, 1),
            Ordering::Equal => (0, 0),
            Ordering::Greater => (-1, 0),
        };
        self.node_mut(z, Node::set_balance(z_balance));
        self.node_mut(x, Node::set_balance(x_balance));
        self.node_mut(y, Node::set_balance(0));
    }

    /// Rotate `x`'s right child right, then `x` left.
    fn right_left_rotate(&mut self, x: NodeIndex) {
        let Some(z) = self.node_ref(x, Node::right) else {
            return;
        };
        let Some(y) = self.node_ref(z, Node::left) else {
            return;
        };
        let y_balance = self.node_ref(y, Node::balance);
        self.right_rotate(z);
        self.left_rotate(x);
        let (x_balance, z_balance) = match y_balance.cmp(&0) {
            Ordering::Less => (0, 1),
            Ordering::Equal => (0, 0),
            Ordering::Greater => (-1, 0),
        };
        self.node_mut(x, Node::set_balance(x_balance));
        self.node_mut(z, Node::set_balance(z_balance));
        self.node_mut(y, Node::set_balance(0));
    }

    /// Binary tree left rotate.
    fn left_rotate(&mut self, x: NodeIndex) {
        let Some(y) = self.node_ref(x, Node::right) else {
            return;
        };
        let y_left = self.node_ref(y, Node::left);
        self.node_mut(x, Node::set_right(y_left));
        if let Some(b) = y_left {
            self.node_mut(b, Node::set_parent(Some(x)));
        }

        self.replace_parent(x, y);
        self.node_mut(y, Node::set_left(Some(x)));

        self.rotate_update_max(x, y);
    }

    /// Binary tree right rotate.
    fn right_rotate(&mut self, x: NodeIndex) {
        let Some(y) = self.node_ref(x, Node::left) else {
            return;
        };
        let y_right = self.node_ref(y, Node::right);
        self.node_mut(x, Node::set_left(y_right));
        if let Some(b) = y_right {
            self.node_mut(b, Node::set_parent(Some(x)));
        }

        self.replace_parent(x, y);
        self.node_mut(y, Node::set_right(Some(x)));

        self.rotate_update_max(x, y);
    }

    /// Hang `y` where `x` used to be and make `y` the parent of `x`.
    fn replace_parent(&mut self, x: NodeIndex, y: NodeIndex) {
        let parent = self.node_ref(x, Node::parent);
        self.node_mut(y, Node::set_parent(parent));
        match parent {
            None => self.root = Some(y),
            Some(p) if self.node_ref(p, Node::left) == Some(x) => {
                self.node_mut(p, Node::set_left(Some(y)));
            }
            Some(p) => self.node_mut(p, Node::set_right(Some(y))),
        }
        self.node_mut(x, Node::set_parent(Some(y)));
    }

    /// Update the max value after a rotation.
    ///
    /// `y` now spans exactly the nodes `x` spanned before, so it inherits
    /// `x`'s max; `x` lost a subtree and is recomputed.
    fn rotate_update_max(&mut self, x: NodeIndex, y: NodeIndex) {
        self.node_mut(y, Node::set_max_index(self.node_ref(x, Node::max_index)));
        self.recalculate_max(x);
    }

    /// Update the max value towards the root
    fn update_max_bottom_up(&mut self, x: NodeIndex) {
        let mut p = Some(x);
        while let Some(pi) = p {
            self.recalculate_max(pi);
            p = self.node_ref(pi, Node::parent);
        }
    }

    /// Recalculate max value from left and right children
    fn recalculate_max(&mut self, x: NodeIndex) {
        let mut max_index = x;
        for child in [self.node_ref(x, Node::left), self.node_ref(x, Node::right)]
            .into_iter()
            .flatten()
        {
            if self.max(child) > self.upper(max_index) {
                max_index = self.node_ref(child, Node::max_index);
            }
        }
        self.node_mut(x, Node::set_max_index(max_index));
    }
}

// Convenient methods for reference or mutate nodes
impl<'a, T, V> IntervalTree<T, V> {
    pub(crate) fn node_ref<F, R>(&'a self, node: NodeIndex, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<T, V>) -> R,
    {
        op(&self.nodes[node.index()])
    }

    pub(crate) fn node_mut<F, R>(&'a mut self, node: NodeIndex, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<T, V>) -> R,
    {
        op(&mut self.nodes[node.index()])
    }

    /// Upper bound of the node's own interval.
    fn upper(&self, node: NodeIndex) -> &T {
        &self.nodes[node.index()].interval.upper
    }

    /// Max upper bound over the subtree rooted at `node`.
    pub(crate) fn max(&self, node: NodeIndex) -> &T {
        self.upper(self.nodes[node.index()].max_index)
    }
}
