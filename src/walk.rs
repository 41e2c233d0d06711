// ============================================================================
// 语法树遍历 - 基于 TreeCursor 的迭代前序遍历
// ============================================================================
//
// 长表达式 (如 `1 + 1 + ... + 1`) 会生成很深的左嵌套树，
// 所有遍历都走这里，不使用递归。
//
// ============================================================================

use tree_sitter::Node;

/// 进入 / 离开事件
pub trait TreeVisitor<'t> {
    /// 返回 false 时跳过该节点的子树 (仍会收到 `leave`)
    fn enter(&mut self, node: Node<'t>) -> bool;

    fn leave(&mut self, _node: Node<'t>) {}
}

/// 从 `root` 开始的前序遍历，不会越过 `root` 的范围
pub fn walk_tree<'t, V: TreeVisitor<'t>>(root: Node<'t>, visitor: &mut V) {
    let mut cursor = root.walk();
    let mut descend = visitor.enter(root);

    loop {
        if descend && cursor.goto_first_child() {
            descend = visitor.enter(cursor.node());
            continue;
        }

        // 当前节点完成：离开，然后找下一个兄弟或回到父节点
        loop {
            let node = cursor.node();
            visitor.leave(node);
            if node == root {
                return;
            }
            if cursor.goto_next_sibling() {
                descend = visitor.enter(cursor.node());
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

struct Preorder<F>(F);

impl<'t, F: FnMut(Node<'t>) -> bool> TreeVisitor<'t> for Preorder<F> {
    fn enter(&mut self, node: Node<'t>) -> bool {
        (self.0)(node)
    }
}

/// 只关心进入事件的简化形式
pub fn preorder<'t>(root: Node<'t>, visit: impl FnMut(Node<'t>) -> bool) {
    walk_tree(root, &mut Preorder(visit));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaParser, TreeSitterJavaParser};

    struct Recorder {
        events: Vec<String>,
    }

    impl<'t> TreeVisitor<'t> for Recorder {
        fn enter(&mut self, node: Node<'t>) -> bool {
            if node.is_named() {
                self.events.push(format!("+{}", node.kind()));
            }
            node.kind() != "formal_parameters"
        }

        fn leave(&mut self, node: Node<'t>) {
            if node.is_named() {
                self.events.push(format!("-{}", node.kind()));
            }
        }
    }

    #[test]
    fn test_enter_leave_order_and_skip() {
        let code = "class A { void f(int x) { } }";
        let tree = TreeSitterJavaParser::new().parse(code).unwrap();
        let method = tree
            .root_node()
            .child(0)
            .and_then(|c| c.child_by_field_name("body"))
            .and_then(|b| b.named_child(0))
            .unwrap();

        let mut recorder = Recorder { events: Vec::new() };
        walk_tree(method, &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                "+method_declaration",
                "+void_type",
                "-void_type",
                "+identifier",
                "-identifier",
                "+formal_parameters",
                "-formal_parameters",
                "+block",
                "-block",
                "-method_declaration",
            ]
        );
    }

    #[test]
    fn test_walk_stays_inside_root() {
        let code = "class A { int a; int b; }";
        let tree = TreeSitterJavaParser::new().parse(code).unwrap();
        let first_field = tree
            .root_node()
            .child(0)
            .and_then(|c| c.child_by_field_name("body"))
            .and_then(|b| b.named_child(0))
            .unwrap();

        let mut identifiers = 0;
        preorder(first_field, |node| {
            if node.kind() == "identifier" {
                identifiers += 1;
            }
            true
        });
        assert_eq!(identifiers, 1);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let terms = vec!["1"; 100_000].join(" + ");
        let code = format!("class A {{ int x = {terms}; }}");
        let tree = TreeSitterJavaParser::new().parse(&code).unwrap();

        let mut literals = 0usize;
        preorder(tree.root_node(), |node| {
            if node.kind() == "decimal_integer_literal" {
                literals += 1;
            }
            true
        });
        assert_eq!(literals, 100_000);
    }
}
