//! An ordered container of unique keys implemented with an AVL tree.
//!
//! Nodes are kept in an arena and linked by index, including a non-owning
//! parent link that drives bottom-up rebalancing after insertion and deletion.
//!
//! ```
//! use arena_avl::{Error, Tree};
//! let mut tree = Tree::new();
//! tree.insert(2).unwrap();
//! tree.insert(1).unwrap();
//! tree.insert(0).unwrap();
//! assert_eq!(tree.root().map(|root| *root.key()), Some(1));
//! assert_eq!(tree.insert(1), Err(Error::DuplicateKey));
//! assert!(tree.delete(&1));
//! assert!(!tree.delete(&1));
//! ```

mod error;
mod tree;

pub use error::{Error, Result};
pub use tree::{NodeRef, Tree};
