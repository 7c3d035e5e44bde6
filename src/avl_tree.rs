//! AVL tree machinery keeping each side's price levels in sorted order.
//!
//! Every node, including the per-side root sentinel, lives in the book's
//! limit arena; the linkage here is pure indices. The sentinel is a
//! non-data node above the real root: its single right-child slot holds
//! the root and participates in rotations like any other parent slot, so
//! rotating the actual root needs no special case.

use crate::types::Price;

/// Tree linkage embedded in every price level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AvlNode {
    /// Parent index; None only for sentinels
    pub(crate) parent: Option<usize>,
    /// Left child: strictly smaller prices
    pub(crate) left_child: Option<usize>,
    /// Right child: strictly greater prices
    pub(crate) right_child: Option<usize>,
    /// Height of the subtree rooted here
    pub(crate) height: i32,
    /// Set on the per-side root sentinel
    pub(crate) sentinel: bool,
}

impl AvlNode {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            left_child: None,
            right_child: None,
            height: 1,
            sentinel: false,
        }
    }

    pub(crate) fn sentinel() -> Self {
        Self {
            parent: None,
            left_child: None,
            right_child: None,
            height: 0,
            sentinel: true,
        }
    }
}

impl Default for AvlNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Tree operations over arena-resident nodes.
///
/// The implementor supplies node access; insertion, removal, rotations
/// and the ordered walks are provided on top of it.
pub(crate) trait AvlTree {
    /// Get the price keyed at an index.
    fn get_price(&self, index: usize) -> Price;

    /// Get the tree linkage at an index.
    fn get_node(&self, index: usize) -> &AvlNode;

    /// Get mutable tree linkage at an index.
    fn get_node_mut(&mut self, index: usize) -> &mut AvlNode;

    fn height_of(&self, index: Option<usize>) -> i32 {
        match index {
            Some(index) => self.get_node(index).height,
            None => 0,
        }
    }

    fn update_height(&mut self, index: usize) {
        let left = self.height_of(self.get_node(index).left_child);
        let right = self.height_of(self.get_node(index).right_child);
        self.get_node_mut(index).height = 1 + left.max(right);
    }

    /// Balance factor: `height(right) - height(left)`.
    fn balance_factor(&self, index: usize) -> i32 {
        let node = self.get_node(index);
        self.height_of(node.right_child) - self.height_of(node.left_child)
    }

    /// Leftmost node of the subtree rooted at `index`.
    fn subtree_min(&self, mut index: usize) -> usize {
        while let Some(left) = self.get_node(index).left_child {
            index = left;
        }
        index
    }

    /// Rightmost node of the subtree rooted at `index`.
    fn subtree_max(&self, mut index: usize) -> usize {
        while let Some(right) = self.get_node(index).right_child {
            index = right;
        }
        index
    }

    /// In-order predecessor: the node with the next smaller price.
    fn predecessor(&self, index: usize) -> Option<usize> {
        if let Some(left) = self.get_node(index).left_child {
            return Some(self.subtree_max(left));
        }
        let mut current = index;
        loop {
            let parent = self.get_node(current).parent?;
            if self.get_node(parent).sentinel {
                return None;
            }
            if self.get_node(parent).right_child == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
    }

    /// In-order successor: the node with the next greater price.
    fn successor(&self, index: usize) -> Option<usize> {
        if let Some(right) = self.get_node(index).right_child {
            return Some(self.subtree_min(right));
        }
        let mut current = index;
        loop {
            let parent = self.get_node(current).parent?;
            if self.get_node(parent).sentinel {
                return None;
            }
            if self.get_node(parent).left_child == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
    }

    /// Point `parent`'s slot holding `old` at `new` instead.
    ///
    /// A sentinel only ever populates its right slot, so the fallthrough
    /// treats it like any other parent.
    fn replace_child(&mut self, parent: usize, old: usize, new: Option<usize>) {
        let node = self.get_node_mut(parent);
        if node.left_child == Some(old) {
            node.left_child = new;
        } else {
            node.right_child = new;
        }
    }

    /// Insert a node by descending iteratively from the sentinel.
    ///
    /// At the sentinel, or whenever the new price is greater, descend
    /// right; when smaller, descend left. The caller guarantees the price
    /// is not already present on this side.
    fn insert(&mut self, sentinel: usize, new_index: usize) {
        let new_price = self.get_price(new_index);
        let mut current = sentinel;
        loop {
            if self.get_node(current).sentinel || new_price > self.get_price(current) {
                match self.get_node(current).right_child {
                    Some(right) => current = right,
                    None => {
                        self.get_node_mut(current).right_child = Some(new_index);
                        break;
                    }
                }
            } else if new_price < self.get_price(current) {
                match self.get_node(current).left_child {
                    Some(left) => current = left,
                    None => {
                        self.get_node_mut(current).left_child = Some(new_index);
                        break;
                    }
                }
            } else {
                debug_assert!(false, "duplicate price {} inserted", new_price);
                return;
            }
        }
        self.get_node_mut(new_index).parent = Some(current);
        self.rebalance_from(Some(current));
    }

    /// Remove a node from the tree.
    ///
    /// With two children the in-order successor is spliced into the
    /// node's position structurally, keeping both nodes' identities (and
    /// therefore every outstanding arena index) intact; the node is then
    /// removed from its new position, where it has at most one child.
    fn remove(&mut self, index: usize) {
        let node = *self.get_node(index);
        if node.left_child.is_some() && node.right_child.is_some() {
            let successor = self.subtree_min(node.right_child.unwrap());
            self.splice_successor(index, successor);
            self.remove(index);
        } else {
            let parent = node.parent.expect("tree nodes always have a parent");
            let child = node.left_child.or(node.right_child);
            self.replace_child(parent, index, child);
            if let Some(child) = child {
                self.get_node_mut(child).parent = Some(parent);
            }
            self.rebalance_from(Some(parent));
        }
    }

    /// Exchange the tree positions of `index` and its in-order successor.
    ///
    /// `successor` is the minimum of `index`'s right subtree, so it has no
    /// left child; `index` ends up with at most `successor`'s old right
    /// child. Heights travel with the positions.
    fn splice_successor(&mut self, index: usize, successor: usize) {
        let node = *self.get_node(index);
        let node_parent = node.parent.expect("tree nodes always have a parent");
        let succ = *self.get_node(successor);
        let succ_parent = succ.parent.expect("tree nodes always have a parent");

        self.replace_child(node_parent, index, Some(successor));
        self.get_node_mut(successor).parent = Some(node_parent);
        self.get_node_mut(successor).left_child = node.left_child;
        if let Some(left) = node.left_child {
            self.get_node_mut(left).parent = Some(successor);
        }

        if succ_parent == index {
            // The successor is the node's own right child; they swap
            // places directly.
            self.get_node_mut(successor).right_child = Some(index);
            self.get_node_mut(index).parent = Some(successor);
        } else {
            self.get_node_mut(successor).right_child = node.right_child;
            if let Some(right) = node.right_child {
                self.get_node_mut(right).parent = Some(successor);
            }
            // A deeper successor is always its parent's left child.
            self.get_node_mut(succ_parent).left_child = Some(index);
            self.get_node_mut(index).parent = Some(succ_parent);
        }

        self.get_node_mut(index).left_child = None;
        self.get_node_mut(index).right_child = succ.right_child;
        if let Some(right) = succ.right_child {
            self.get_node_mut(right).parent = Some(index);
        }

        self.get_node_mut(index).height = succ.height;
        self.get_node_mut(successor).height = node.height;
    }

    /// Walk parent links from `start` to the sentinel, refreshing heights
    /// and rotating wherever a node has gone out of balance.
    ///
    /// Covers both insertion and removal: removal can demand rotations at
    /// several ancestors, and the walk visits them all.
    fn rebalance_from(&mut self, start: Option<usize>) {
        let mut current = start;
        while let Some(index) = current {
            if self.get_node(index).sentinel {
                break;
            }
            self.update_height(index);
            let balance = self.balance_factor(index);

            let subtree_root = if balance > 1 {
                // Right heavy
                let right = self.get_node(index).right_child.unwrap();
                if self.balance_factor(right) < 0 {
                    // RL case
                    self.rotate_right(right);
                }
                // RR case
                self.rotate_left(index)
            } else if balance < -1 {
                // Left heavy
                let left = self.get_node(index).left_child.unwrap();
                if self.balance_factor(left) > 0 {
                    // LR case
                    self.rotate_left(left);
                }
                // LL case
                self.rotate_right(index)
            } else {
                index
            };

            current = self.get_node(subtree_root).parent;
        }
    }

    /// Left rotation: promote `index`'s right child over it.
    fn rotate_left(&mut self, index: usize) -> usize {
        let pivot = self
            .get_node(index)
            .right_child
            .expect("left rotation requires a right child");
        let parent = self.get_node(index).parent;
        let pivot_left = self.get_node(pivot).left_child;

        self.get_node_mut(index).right_child = pivot_left;
        if let Some(moved) = pivot_left {
            self.get_node_mut(moved).parent = Some(index);
        }

        self.get_node_mut(pivot).left_child = Some(index);
        self.get_node_mut(index).parent = Some(pivot);
        self.get_node_mut(pivot).parent = parent;
        if let Some(parent) = parent {
            self.replace_child(parent, index, Some(pivot));
        }

        self.update_height(index);
        self.update_height(pivot);
        pivot
    }

    /// Right rotation: promote `index`'s left child over it.
    fn rotate_right(&mut self, index: usize) -> usize {
        let pivot = self
            .get_node(index)
            .left_child
            .expect("right rotation requires a left child");
        let parent = self.get_node(index).parent;
        let pivot_right = self.get_node(pivot).right_child;

        self.get_node_mut(index).left_child = pivot_right;
        if let Some(moved) = pivot_right {
            self.get_node_mut(moved).parent = Some(index);
        }

        self.get_node_mut(pivot).right_child = Some(index);
        self.get_node_mut(index).parent = Some(pivot);
        self.get_node_mut(pivot).parent = parent;
        if let Some(parent) = parent {
            self.replace_child(parent, index, Some(pivot));
        }

        self.update_height(index);
        self.update_height(pivot);
        pivot
    }
}
