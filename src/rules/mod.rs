// ============================================================================
// 规则引擎 - 按练习配置评估语法树
// ============================================================================
//
// 每种 `Rule` 变体对应一个评估函数，`evaluate` 中穷尽匹配。
// 结构信息 (符号表、方法单元) 在评估前一次性收集。
//
// ============================================================================

use anyhow::Result;
use tree_sitter::{Node, Tree};

use crate::config::Rule;
use crate::report::{Finding, Location};
use crate::symbol_table::{enclosing_type_name, node_text, SymbolExtractor, SymbolTable};
use crate::walk::preorder;

pub mod disallowed;
pub mod metrics;
pub mod scope;
pub mod structure;

/// 方法级单元的节点类型
const CALLABLE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

/// 嵌套类型体 (方法级遍历时不进入)
pub(crate) fn is_type_body(kind: &str) -> bool {
    matches!(
        kind,
        "class_body" | "interface_body" | "enum_body" | "annotation_type_body"
    )
}

/// 一个方法 / 构造器
#[derive(Debug, Clone)]
pub struct MethodUnit<'tree> {
    /// `Class.method`
    pub qualified_name: String,
    pub node: Node<'tree>,
    pub body: Option<Node<'tree>>,
    pub location: Location,
}

/// 评估上下文
pub struct RuleContext<'a> {
    pub code: &'a str,
    pub root: Node<'a>,
    pub symbols: SymbolTable,
    pub units: Vec<MethodUnit<'a>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(tree: &'a Tree, code: &'a str, extractor: &SymbolExtractor) -> Self {
        let root = tree.root_node();
        let mut units = Vec::new();
        collect_units(root, code, &mut units);

        Self {
            code,
            root,
            symbols: extractor.extract(tree, code),
            units,
        }
    }
}

fn collect_units<'t>(root: Node<'t>, code: &str, out: &mut Vec<MethodUnit<'t>>) {
    preorder(root, |node| {
        if CALLABLE_KINDS.contains(&node.kind()) {
            let name_node = node.child_by_field_name("name");
            let name = name_node.map(|n| node_text(n, code)).unwrap_or("<anonymous>");
            let qualified_name = match enclosing_type_name(node, code) {
                Some(class) => format!("{class}.{name}"),
                None => name.to_string(),
            };
            out.push(MethodUnit {
                qualified_name,
                node,
                body: node.child_by_field_name("body"),
                location: Location::from_point(name_node.unwrap_or(node).start_position()),
            });
        }
        true
    });
}

/// 规则引擎 (持有预编译查询，可跨线程共享)
pub struct RuleEngine {
    extractor: SymbolExtractor,
}

impl RuleEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: SymbolExtractor::new(&tree_sitter_java::language())?,
        })
    }

    /// 按规则序列顺序评估，返回累积的结果
    pub fn evaluate(&self, tree: &Tree, code: &str, rules: &[Rule]) -> Vec<Finding> {
        let ctx = RuleContext::new(tree, code, &self.extractor);
        let mut findings = Vec::new();

        for rule in rules {
            match rule {
                Rule::RequiredClasses(names) => structure::check_required_classes(&ctx, names, &mut findings),
                Rule::RequiredMethods(specs) => structure::check_required_methods(&ctx, specs, &mut findings),
                Rule::DisallowedElements(elements) => disallowed::check_disallowed(&ctx, elements, &mut findings),
                Rule::VariableScope => scope::check_variable_scope(&ctx, &mut findings),
                Rule::MethodLength { max_lines } => metrics::check_method_length(&ctx, *max_lines, &mut findings),
                Rule::CyclomaticComplexity { max } => metrics::check_complexity(&ctx, *max, &mut findings),
            }
        }

        findings
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::parser::{JavaParser, TreeSitterJavaParser};

    /// 解析并评估 (测试用)
    pub fn run(code: &str, rules: &[Rule]) -> Vec<Finding> {
        let tree = TreeSitterJavaParser::new().parse(code).unwrap();
        RuleEngine::new().unwrap().evaluate(&tree, code, rules)
    }

    pub fn parse(code: &str) -> Tree {
        TreeSitterJavaParser::new().parse(code).unwrap()
    }
}
