use crate::index::NodeIndex;
use crate::interval::Interval;
use crate::node::Node;
use crate::tree::IntervalTree;

/// Pushes a link of nodes on the left to stack.
fn left_link<T, V>(
    tree_ref: &IntervalTree<T, V>,
    mut x: Option<NodeIndex>,
    stack: &mut Vec<NodeIndex>,
) {
    while let Some(xi) = x {
        stack.push(xi);
        x = tree_ref.node_ref(xi, Node::left);
    }
}

/// An iterator over the entries of a `IntervalTree`, sorted by interval.
#[derive(Debug)]
pub struct Iter<'a, T, V> {
    /// Reference to the tree
    tree_ref: &'a IntervalTree<T, V>,
    /// Stack for iteration
    stack: Vec<NodeIndex>,
}

impl<'a, T, V> Iter<'a, T, V> {
    pub(crate) fn new(tree_ref: &'a IntervalTree<T, V>) -> Self {
        let mut stack = Vec::new();
        left_link(tree_ref, tree_ref.root, &mut stack);
        Iter { tree_ref, stack }
    }
}

impl<'a, T, V> Iterator for Iter<'a, T, V> {
    type Item = (&'a Interval<T>, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let x = self.stack.pop()?;
        left_link(
            self.tree_ref,
            self.tree_ref.node_ref(x, Node::right),
            &mut self.stack,
        );
        Some(self.tree_ref.node_ref(x, |xn| (xn.interval(), xn.value())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.stack.len(), Some(self.tree_ref.nodes.len()))
    }
}

impl<'a, T, V> IntoIterator for &'a IntervalTree<T, V>
where
    T: Ord,
{
    type Item = (&'a Interval<T>, &'a V);
    type IntoIter = Iter<'a, T, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
