//! 禁用语法元素检查

use tree_sitter::Node;

use crate::report::{Finding, Location};
use crate::walk::preorder;

use super::RuleContext;

/// 配置中的元素标识 -> 匹配方式
enum Matcher {
    Kinds(&'static [&'static str]),
    AnonymousClass,
    Raw(String),
}

impl Matcher {
    fn for_element(element: &str) -> Self {
        let kinds: &'static [&'static str] = match element.to_ascii_lowercase().as_str() {
            "for" => &["for_statement"],
            "foreach" | "enhancedfor" => &["enhanced_for_statement"],
            "while" => &["while_statement"],
            "do" | "dowhile" => &["do_statement"],
            "switch" => &["switch_expression", "switch_statement"],
            "break" => &["break_statement"],
            "continue" => &["continue_statement"],
            "ternary" => &["ternary_expression"],
            "lambda" => &["lambda_expression"],
            "try" => &["try_statement", "try_with_resources_statement"],
            "throw" => &["throw_statement"],
            "synchronized" => &["synchronized_statement"],
            "label" => &["labeled_statement"],
            "assert" => &["assert_statement"],
            "instanceof" => &["instanceof_expression"],
            "methodreference" => &["method_reference"],
            "array" => &["array_creation_expression", "array_initializer"],
            "anonymousclass" => return Matcher::AnonymousClass,
            _ => return Matcher::Raw(element.to_string()),
        };
        Matcher::Kinds(kinds)
    }

    fn matches(&self, node: Node) -> bool {
        match self {
            Matcher::Kinds(kinds) => kinds.contains(&node.kind()),
            Matcher::AnonymousClass => {
                node.kind() == "class_body"
                    && node.parent().is_some_and(|p| p.kind() == "object_creation_expression")
            }
            Matcher::Raw(kind) => node.kind() == kind.as_str(),
        }
    }
}

fn collect<'t>(root: Node<'t>, matcher: &Matcher) -> Vec<Node<'t>> {
    let mut hits = Vec::new();
    preorder(root, |node| {
        if matcher.matches(node) {
            hits.push(node);
        }
        true
    });
    hits
}

pub fn check_disallowed(ctx: &RuleContext, elements: &[String], out: &mut Vec<Finding>) {
    let mut seen: Vec<&str> = Vec::new();

    for element in elements {
        if seen.contains(&element.as_str()) {
            continue;
        }
        seen.push(element);

        let rule_id = format!("rule.disallowedElement.{element}");
        let description = format!("'{element}' is not used");
        let matcher = Matcher::for_element(element);

        let hits = collect(ctx.root, &matcher);

        if hits.is_empty() {
            out.push(Finding::passed(rule_id, description));
            continue;
        }

        for node in hits {
            let location = Location::from_point(node.start_position());
            out.push(
                Finding::failed(rule_id.clone(), description.clone())
                    .with_message(format!(
                        "Disallowed element '{element}' found at line {}",
                        location.line
                    ))
                    .at(location),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Rule;
    use crate::report::FindingStatus;
    use crate::rules::test_support::run;

    #[test]
    fn test_reports_each_occurrence_with_location() {
        let code = r#"
class Loops {
    void f() {
        while (true) { break; }
        int i = 0;
        while (i < 3) { i++; }
    }
}
"#;
        let findings = run(code, &[Rule::DisallowedElements(vec!["while".to_string()])]);

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.status == FindingStatus::Failed));
        assert!(findings.iter().all(|f| f.rule_id == "rule.disallowedElement.while"));
        assert_eq!(findings[0].location.unwrap().line, 4);
        assert_eq!(findings[1].location.unwrap().line, 6);
    }

    #[test]
    fn test_absent_element_passes() {
        let code = "class A { int f(int x) { return x > 0 ? x : -x; } }";
        let findings = run(
            code,
            &[Rule::DisallowedElements(vec!["for".to_string(), "ternary".to_string()])],
        );

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule_id, "rule.disallowedElement.for");
        assert_eq!(findings[0].status, FindingStatus::Passed);
        assert_eq!(findings[1].rule_id, "rule.disallowedElement.ternary");
        assert_eq!(findings[1].status, FindingStatus::Failed);
    }

    #[test]
    fn test_anonymous_class_and_raw_kind() {
        let code = r#"
class A {
    Runnable r = new Runnable() { public void run() {} };
    Object o = new Object();
    void g() { assert true; }
}
"#;
        let findings = run(
            code,
            &[Rule::DisallowedElements(vec![
                "anonymousClass".to_string(),
                "assert_statement".to_string(),
            ])],
        );

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].status, FindingStatus::Failed);
        assert_eq!(findings[0].location.unwrap().line, 3);
        assert_eq!(findings[1].rule_id, "rule.disallowedElement.assert_statement");
        assert_eq!(findings[1].status, FindingStatus::Failed);
    }

    #[test]
    fn test_duplicate_elements_are_checked_once() {
        let findings = run(
            "class A {}",
            &[Rule::DisallowedElements(vec!["for".to_string(), "for".to_string()])],
        );
        assert_eq!(findings.len(), 1);
    }
}
