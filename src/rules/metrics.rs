//! 方法长度与圈复杂度

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::report::Finding;
use crate::walk::preorder;

use super::{is_type_body, RuleContext};

const LENGTH_RULE: &str = "rule.methodLength";
const COMPLEXITY_RULE: &str = "rule.cyclomaticComplexity";

fn is_statement(kind: &str) -> bool {
    kind != "block"
        && (kind.ends_with("_statement")
            || matches!(
                kind,
                "local_variable_declaration" | "explicit_constructor_invocation"
            ))
}

/// 方法体内语句起始的不同行数
pub fn statement_lines(body: Node) -> usize {
    let mut lines = BTreeSet::new();
    preorder(body, |node| {
        if is_type_body(node.kind()) {
            return false;
        }
        if node != body && is_statement(node.kind()) {
            lines.insert(node.start_position().row + 1);
        }
        true
    });
    lines.len()
}

fn is_decision_point(node: Node) -> bool {
    match node.kind() {
        "if_statement" | "for_statement" | "enhanced_for_statement" | "while_statement"
        | "do_statement" | "catch_clause" | "ternary_expression" => true,
        "switch_label" => node.child(0).is_some_and(|c| c.kind() != "default"),
        "binary_expression" => node
            .child_by_field_name("operator")
            .is_some_and(|op| matches!(op.kind(), "&&" | "||")),
        _ => false,
    }
}

/// 1 + 判定点数
pub fn cyclomatic_complexity(body: Node) -> usize {
    let mut decisions = 0;
    preorder(body, |node| {
        if is_type_body(node.kind()) {
            return false;
        }
        if node != body && is_decision_point(node) {
            decisions += 1;
        }
        true
    });
    1 + decisions
}

pub fn check_method_length(ctx: &RuleContext, max_lines: usize, out: &mut Vec<Finding>) {
    let description = format!("Methods have at most {max_lines} statement lines");
    let before = out.len();

    for unit in &ctx.units {
        let Some(body) = unit.body else { continue };
        let lines = statement_lines(body);
        if lines > max_lines {
            out.push(
                Finding::failed(format!("{LENGTH_RULE}.{}", unit.qualified_name), description.clone())
                    .with_message(format!(
                        "Method '{}' has {lines} statement lines (max {max_lines})",
                        unit.qualified_name
                    ))
                    .at(unit.location),
            );
        }
    }

    if out.len() == before {
        out.push(Finding::passed(LENGTH_RULE, description));
    }
}

pub fn check_complexity(ctx: &RuleContext, max: usize, out: &mut Vec<Finding>) {
    let description = format!("Methods have a cyclomatic complexity of at most {max}");
    let before = out.len();

    for unit in &ctx.units {
        let Some(body) = unit.body else { continue };
        let complexity = cyclomatic_complexity(body);
        if complexity > max {
            out.push(
                Finding::failed(format!("{COMPLEXITY_RULE}.{}", unit.qualified_name), description.clone())
                    .with_message(format!(
                        "Method '{}' has cyclomatic complexity {complexity} (max {max})",
                        unit.qualified_name
                    ))
                    .at(unit.location),
            );
        }
    }

    if out.len() == before {
        out.push(Finding::passed(COMPLEXITY_RULE, description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rule;
    use crate::report::{FindingStatus, Location};
    use crate::rules::test_support::{parse, run};

    const BRANCHY: &str = r#"
class Grades {
    String grade(int score, boolean bonus) {
        if (score > 90 && bonus) {
            return "A+";
        } else if (score > 80 || bonus) {
            return "A";
        }
        for (int i = 0; i < 3; i++) {
            score += i;
        }
        switch (score) {
            case 1: return "one";
            case 2: return "two";
            default: return score > 50 ? "pass" : "fail";
        }
    }

    void small() {
        int x = 1; int y = 2;
        Runnable r = new Runnable() {
            public void run() { if (true) {} while (false) {} }
        };
    }
}
"#;

    fn body_of(tree: &tree_sitter::Tree, index: usize) -> Node<'_> {
        let root = tree.root_node();
        let class_body = root.child(0).unwrap().child_by_field_name("body").unwrap();
        let mut cursor = class_body.walk();
        let method = class_body
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "method_declaration")
            .nth(index)
            .unwrap();
        method.child_by_field_name("body").unwrap()
    }

    #[test]
    fn test_cyclomatic_complexity() {
        let tree = parse(BRANCHY);
        // if, else-if, &&, ||, for, case 1, case 2, ternary
        assert_eq!(cyclomatic_complexity(body_of(&tree, 0)), 9);
        // 匿名类体不计入
        assert_eq!(cyclomatic_complexity(body_of(&tree, 1)), 1);
    }

    #[test]
    fn test_statement_lines_counts_distinct_lines() {
        let tree = parse(BRANCHY);
        // int x / int y 同一行；匿名类中的语句不计入
        assert_eq!(statement_lines(body_of(&tree, 1)), 2);
    }

    #[test]
    fn test_complexity_threshold() {
        let findings = run(BRANCHY, &[Rule::CyclomaticComplexity { max: 5 }]);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "rule.cyclomaticComplexity.Grades.grade");
        assert_eq!(findings[0].status, FindingStatus::Failed);
        assert_eq!(findings[0].location, Some(Location::new(3, 12)));
        assert!(findings[0].message.as_ref().unwrap().contains("complexity 9"));

        let findings = run(BRANCHY, &[Rule::CyclomaticComplexity { max: 9 }]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "rule.cyclomaticComplexity");
        assert_eq!(findings[0].status, FindingStatus::Passed);
    }

    #[test]
    fn test_method_length_threshold() {
        let findings = run(BRANCHY, &[Rule::MethodLength { max_lines: 3 }]);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "rule.methodLength.Grades.grade");
        assert_eq!(findings[0].status, FindingStatus::Failed);

        let findings = run(BRANCHY, &[Rule::MethodLength { max_lines: 50 }]);
        assert_eq!(findings[0].rule_id, "rule.methodLength");
        assert_eq!(findings[0].status, FindingStatus::Passed);
    }

    #[test]
    fn test_abstract_methods_are_skipped() {
        let code = "abstract class A { abstract void f(); }";
        let findings = run(code, &[Rule::MethodLength { max_lines: 0 }]);
        assert_eq!(findings[0].status, FindingStatus::Passed);
    }
}
