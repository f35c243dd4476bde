use crate::index::NodeIndex;
use crate::interval::Interval;

/// Node of the interval tree
#[derive(Debug)]
pub struct Node<T, V> {
    /// Left child
    pub left: Option<NodeIndex>,
    /// Right child
    pub right: Option<NodeIndex>,
    /// Parent, `None` for the root
    pub parent: Option<NodeIndex>,
    /// height(right) - height(left)
    pub balance: i8,

    /// Interval of the node
    pub interval: Interval<T>,
    /// The index that points to the node with the max upper bound in this subtree
    pub max_index: NodeIndex,
    /// Value of the node
    pub value: V,
}

// Convenient getter/setter methods
impl<T, V> Node<T, V> {
    pub fn new(interval: Interval<T>, value: V, index: NodeIndex) -> Self {
        Node {
            left: None,
            right: None,
            parent: None,
            balance: 0,
            interval,
            max_index: index,
            value,
        }
    }

    pub fn interval(&self) -> &Interval<T> {
        &self.interval
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn left(&self) -> Option<NodeIndex> {
        self.left
    }

    pub fn right(&self) -> Option<NodeIndex> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn balance(&self) -> i8 {
        self.balance
    }

    pub fn max_index(&self) -> NodeIndex {
        self.max_index
    }

    pub fn set_left(left: Option<NodeIndex>) -> impl FnOnce(&mut Node<T, V>) {
        move |node: &mut Node<T, V>| node.left = left
    }

    pub fn set_right(right: Option<NodeIndex>) -> impl FnOnce(&mut Node<T, V>) {
        move |node: &mut Node<T, V>| node.right = right
    }

    pub fn set_parent(parent: Option<NodeIndex>) -> impl FnOnce(&mut Node<T, V>) {
        move |node: &mut Node<T, V>| node.parent = parent
    }

    pub fn set_balance(balance: i8) -> impl FnOnce(&mut Node<T, V>) {
        move |node: &mut Node<T, V>| node.balance = balance
    }

    pub fn add_balance(delta: i8) -> impl FnOnce(&mut Node<T, V>) -> i8 {
        move |node: &mut Node<T, V>| {
            node.balance += delta;
            node.balance
        }
    }

    pub fn set_max_index(max_index: NodeIndex) -> impl FnOnce(&mut Node<T, V>) {
        move |node: &mut Node<T, V>| node.max_index = max_index
    }
}
