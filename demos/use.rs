use arena_avl::{Error, Tree};

fn main() {
    let mut tree = Tree::construct([5, 3, 3, 8, 1]);
    println!("constructed: {:?} (height {})", tree, tree.height());

    tree.insert(4).unwrap();
    assert_eq!(tree.insert(4), Err(Error::DuplicateKey));

    if let Some(node) = tree.search(&3) {
        println!(
            "found {} with height {} and balance {}",
            node.key(),
            node.height(),
            node.balance()
        );
    }

    assert!(tree.delete(&3));
    assert!(!tree.delete(&3));
    println!("after delete: {:?}", tree);

    if let Some(root) = tree.root() {
        println!(
            "root {} with children {:?} and {:?}",
            root.key(),
            root.left().map(|node| *node.key()),
            root.right().map(|node| *node.key())
        );
    }
}
