//! An ordered key container implemented with an AVL tree.
//!
//! Nodes live in an arena and link to each other by index, so parent
//! back-references carry no ownership.

use std::cmp::{self, Ordering};
use std::collections::BTreeSet;
use std::fmt;
use std::iter::FromIterator;

use crate::error::{Error, Result};

/// An ordered set of unique keys kept in a height-balanced binary search tree.
///
/// ```
/// use arena_avl::Tree;
/// let mut tree = Tree::construct([5, 3, 3, 8, 1]);
/// assert_eq!(tree.len(), 4);
/// assert!(tree.search(&3).is_some());
/// assert!(tree.delete(&3));
/// assert!(tree.search(&3).is_none());
/// ```
#[derive(Clone)]
pub struct Tree<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<NodeId>,
    root: Link,
    num_nodes: usize,
}

/// A read-only handle to a node of a [`Tree`].
///
/// Handles borrow the tree, so they cannot outlive a mutation.
pub struct NodeRef<'a, K> {
    tree: &'a Tree<K>,
    id: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

type Link = Option<NodeId>;

#[derive(Clone)]
struct Node<K> {
    key: K,
    left: Link,
    right: Link,
    parent: Link,
    height: usize,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<K: Ord> Tree<K> {
    /// Creates an empty tree.
    /// No memory is allocated until the first key is inserted.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: None,
            num_nodes: 0,
        }
    }

    /// Builds a tree holding the distinct values of `values`.
    /// Duplicates are dropped and the remaining keys are inserted in ascending order.
    pub fn construct<I: IntoIterator<Item = K>>(values: I) -> Self {
        let unique: BTreeSet<K> = values.into_iter().collect();
        let mut tree = Self::with_capacity(unique.len());
        for key in unique {
            let inserted = tree.insert(key);
            debug_assert!(inserted.is_ok());
        }
        tree
    }

    /// Returns a handle to the node holding `key`.
    pub fn search(&self, key: &K) -> Option<NodeRef<'_, K>> {
        self.find(key).map(|id| NodeRef { tree: self, id })
    }

    /// Returns a reference to the key in the tree that is equal to the given key.
    pub fn get(&self, key: &K) -> Option<&K> {
        self.find(key).map(|id| &self.at(id).key)
    }

    /// Returns true if the tree holds the given key.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a key into the tree.
    /// Fails with [`Error::DuplicateKey`] and leaves the tree untouched if the key is present.
    pub fn insert(&mut self, key: K) -> Result<()> {
        let (parent, side) = self.find_insert_pos(&key).ok_or(Error::DuplicateKey)?;
        let id = self.alloc(Node::new(parent, key));
        match parent {
            None => self.root = Some(id),
            Some(parent_id) => self.set_child(parent_id, side, Some(id)),
        }
        self.num_nodes += 1;
        self.rebalance_once(parent);
        Ok(())
    }

    /// Removes a key from the tree.
    /// Returns whether the key was previously in the tree.
    pub fn delete(&mut self, key: &K) -> bool {
        // Find node to-be-removed
        if let Some(id) = self.find(key) {
            debug_assert!(self.num_nodes >= 1);
            self.unlink_node(id);
            debug_assert!(self.find(key).is_none());
            return true;
        }
        false
    }

    fn find(&self, key: &K) -> Link {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.at(id);
            current = match key.cmp(&node.key) {
                Ordering::Equal => break,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            }
        }
        current
    }

    fn find_insert_pos(&self, key: &K) -> Option<(Link, Side)> {
        let mut parent: Link = None;
        let mut side = Side::Left;
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.at(id);
            side = match key.cmp(&node.key) {
                Ordering::Equal => return None,
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            parent = current;
            current = match side {
                Side::Left => node.left,
                Side::Right => node.right,
            };
        }
        Some((parent, side))
    }
}

impl<K> Tree<K> {
    /// Returns true if the tree contains no keys.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of keys in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single node.
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// Returns a handle to the root node.
    pub fn root(&self) -> Option<NodeRef<'_, K>> {
        self.root.map(|id| NodeRef { tree: self, id })
    }

    /// Clears the tree, deallocating all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.num_nodes = 0;
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self)
    where
        K: Ord,
    {
        // Check root link
        if let Some(root_id) = self.root {
            assert!(self.at(root_id).parent.is_none());
        }

        // Check tree nodes
        let mut num_nodes = 0;
        let mut prev_key: Option<&K> = None;
        self.traverse(
            |id| {
                let node = self.at(id);
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node
                if let Some(left_id) = node.left {
                    assert_eq!(self.at(left_id).parent, Some(id));
                    assert!(self.at(left_id).key < node.key);
                    left_height = self.at(left_id).height;
                }

                // Check link for right child node
                if let Some(right_id) = node.right {
                    assert_eq!(self.at(right_id).parent, Some(id));
                    assert!(self.at(right_id).key > node.key);
                    right_height = self.at(right_id).height;
                }

                // Check height
                assert_eq!(node.height, 1 + cmp::max(left_height, right_height));

                // Check AVL condition (nearly balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
            },
            |id| {
                // Whole-subtree ordering and key uniqueness
                let key = &self.at(id).key;
                if let Some(prev) = prev_key {
                    assert!(prev < key);
                }
                prev_key = Some(key);
            },
            |_| {},
        );

        // Check number of nodes and arena bookkeeping
        assert_eq!(num_nodes, self.num_nodes);
        assert_eq!(self.nodes.len(), self.num_nodes + self.free.len());
        for id in &self.free {
            assert!(self.nodes[id.0].is_none());
        }
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.num_nodes);
        self.inorder(|id| keys.push(&self.at(id).key));
        keys
    }

    #[cfg(test)]
    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn at(&self, id: NodeId) -> &Node<K> {
        match &self.nodes[id.0] {
            Some(node) => node,
            None => dangling(id),
        }
    }

    fn at_mut(&mut self, id: NodeId) -> &mut Node<K> {
        match &mut self.nodes[id.0] {
            Some(node) => node,
            None => dangling(id),
        }
    }

    fn alloc(&mut self, node: Node<K>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<K> {
        match self.nodes[id.0].take() {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => dangling(id),
        }
    }

    fn set_child(&mut self, parent_id: NodeId, side: Side, child: Link) {
        let parent = self.at_mut(parent_id);
        match side {
            Side::Left => parent.left = child,
            Side::Right => parent.right = child,
        }
    }

    // Points the link that referenced `old` (a child slot of `parent`, or the root) at `new`.
    fn replace_child(&mut self, parent: Link, old: NodeId, new: Link) {
        match parent {
            None => self.root = new,
            Some(parent_id) => {
                let parent = self.at_mut(parent_id);
                if parent.left == Some(old) {
                    parent.left = new;
                } else {
                    debug_assert_eq!(parent.right, Some(old));
                    parent.right = new;
                }
            }
        }
    }

    fn min_node(&self, mut id: NodeId) -> NodeId {
        while let Some(left_id) = self.at(id).left {
            id = left_id;
        }
        id
    }

    fn unlink_node(&mut self, id: NodeId) {
        let node = self.at(id);
        if let (Some(_), Some(right_id)) = (node.left, node.right) {
            // Promote the in-order successor's key into this node, then remove the
            // successor, which has no left child.
            let successor_id = self.min_node(right_id);
            let successor = self.splice_out(successor_id);
            self.at_mut(id).key = successor.key;
        } else {
            self.splice_out(id);
        }
    }

    // Removes a node with at most one child and rebalances its former ancestors.
    fn splice_out(&mut self, id: NodeId) -> Node<K> {
        let node = self.at(id);
        debug_assert!(node.left.is_none() || node.right.is_none());
        let parent = node.parent;
        let child = node.left.or(node.right);

        if let Some(child_id) = child {
            self.at_mut(child_id).parent = parent;
        }
        self.replace_child(parent, id, child);
        self.num_nodes -= 1;
        let node = self.release(id);

        // Every ancestor might be out of balance now
        self.rebalance(parent);
        node
    }

    fn height_of(&self, link: Link) -> usize {
        match link {
            None => 0,
            Some(id) => self.at(id).height,
        }
    }

    fn left_height(&self, id: NodeId) -> usize {
        self.height_of(self.at(id).left)
    }

    fn right_height(&self, id: NodeId) -> usize {
        self.height_of(self.at(id).right)
    }

    fn balance(&self, id: NodeId) -> isize {
        self.left_height(id) as isize - self.right_height(id) as isize
    }

    fn adjust_height(&mut self, id: NodeId) {
        let height = 1 + cmp::max(self.left_height(id), self.right_height(id));
        self.at_mut(id).height = height;
    }

    fn rotate_left(&mut self, id: NodeId) {
        if let Some(right_id) = self.at(id).right {
            let right_left = self.at(right_id).left;
            self.at_mut(id).right = right_left;
            if let Some(right_left_id) = right_left {
                self.at_mut(right_left_id).parent = Some(id);
            }

            let parent = self.at(id).parent;
            self.at_mut(right_id).parent = parent;
            self.replace_child(parent, id, Some(right_id));

            self.at_mut(right_id).left = Some(id);
            self.at_mut(id).parent = Some(right_id);

            self.adjust_height(id);
            self.adjust_height(right_id);
        }
    }

    fn rotate_right(&mut self, id: NodeId) {
        if let Some(left_id) = self.at(id).left {
            let left_right = self.at(left_id).right;
            self.at_mut(id).left = left_right;
            if let Some(left_right_id) = left_right {
                self.at_mut(left_right_id).parent = Some(id);
            }

            let parent = self.at(id).parent;
            self.at_mut(left_id).parent = parent;
            self.replace_child(parent, id, Some(left_id));

            self.at_mut(left_id).right = Some(id);
            self.at_mut(id).parent = Some(left_id);

            self.adjust_height(id);
            self.adjust_height(left_id);
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link) {
        let mut current = start_from;
        while let Some(id) = current {
            let parent = self.at(id).parent;
            self.rebalance_node(id);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rotation.
    /// This is enough to restore balance after a single insert operation,
    /// since the rotated subtree regains its height from before the insert.
    fn rebalance_once(&mut self, start_from: Link) {
        let mut current = start_from;
        while let Some(id) = current {
            let parent = self.at(id).parent;
            if self.rebalance_node(id) {
                break;
            }
            current = parent;
        }
    }

    /// Adjusts height at given node and restores AVL condition (balance) if necessary.
    /// Resulting balance will be +1, 0 or -1 height difference between left and right subtree.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns whether a rotation had been necessary.
    fn rebalance_node(&mut self, id: NodeId) -> bool {
        self.adjust_height(id);
        let balance = self.balance(id);
        debug_assert!((-2..=2).contains(&balance));
        if balance > 1 {
            // Left heavy, left-right case needs a rotation of the left child first
            if let Some(left_id) = self.at(id).left {
                if self.balance(left_id) < 0 {
                    self.rotate_left(left_id);
                }
            }
            self.rotate_right(id);
            true
        } else if balance < -1 {
            // Right heavy, right-left case needs a rotation of the right child first
            if let Some(right_id) = self.at(id).right {
                if self.balance(right_id) > 0 {
                    self.rotate_right(right_id);
                }
            }
            self.rotate_left(id);
            true
        } else {
            false
        }
    }

    fn inorder<F: FnMut(NodeId)>(&self, f: F) {
        self.traverse(|_| {}, f, |_| {});
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodeId),
        In: FnMut(NodeId),
        Post: FnMut(NodeId),
    {
        if let Some(mut id) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(id);
                        if let Some(left_id) = self.at(id).left {
                            id = left_id;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(id);
                        if let Some(right_id) = self.at(id).right {
                            id = right_id;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        postorder(id);
                        if let Some(parent_id) = self.at(id).parent {
                            if self.at(parent_id).left == Some(id) {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            id = parent_id;
                        } else {
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord> Default for Tree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> FromIterator<K> for Tree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::construct(iter)
    }
}

impl<K: fmt::Debug> fmt::Debug for Tree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        self.inorder(|id| {
            set.entry(&self.at(id).key);
        });
        set.finish()
    }
}

impl<'a, K> NodeRef<'a, K> {
    /// Returns the key stored in this node.
    pub fn key(&self) -> &'a K {
        &self.tree.at(self.id).key
    }

    /// Returns the height of the subtree rooted at this node; a leaf has height 1.
    pub fn height(&self) -> usize {
        self.tree.at(self.id).height
    }

    /// Returns the height of the left subtree minus the height of the right subtree.
    pub fn balance(&self) -> isize {
        self.tree.balance(self.id)
    }

    pub fn left(&self) -> Option<NodeRef<'a, K>> {
        self.link(self.tree.at(self.id).left)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K>> {
        self.link(self.tree.at(self.id).right)
    }

    /// Returns the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'a, K>> {
        self.link(self.tree.at(self.id).parent)
    }

    fn link(&self, link: Link) -> Option<NodeRef<'a, K>> {
        link.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }
}

impl<K> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for NodeRef<'_, K> {}

impl<K> PartialEq for NodeRef<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<K> Eq for NodeRef<'_, K> {}

impl<K: fmt::Debug> fmt::Debug for NodeRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("height", &self.height())
            .finish()
    }
}

impl<K> Node<K> {
    fn new(parent: Link, key: K) -> Self {
        Node {
            key,
            left: None,
            right: None,
            parent,
            height: 1,
        }
    }
}

#[cold]
fn dangling(id: NodeId) -> ! {
    panic!("link to vacant arena slot {}", id.0)
}
