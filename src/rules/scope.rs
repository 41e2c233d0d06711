//! 变量作用域检查
//!
//! 在每个方法体内维护块作用域栈。某个简单名称在使用处不可见、
//! 也不是外层类型的字段，但在同一方法中已关闭的块里声明过，
//! 即视为"在声明块之外使用"。同一文件中父类声明的字段也算作字段。

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::report::{Finding, Location};
use crate::symbol_table::node_text;
use crate::walk::{preorder, walk_tree, TreeVisitor};

use super::{is_type_body, MethodUnit, RuleContext};

const RULE_ID: &str = "rule.variableScope";
const DESCRIPTION: &str = "Variables are only used inside the block that declares them";

/// 声明名称的节点 (父节点的 `name` 字段)
const DECLARING_PARENTS: &[&str] = &[
    "variable_declarator",
    "formal_parameter",
    "catch_formal_parameter",
    "enhanced_for_statement",
    "resource",
    "instanceof_expression",
];

/// 打开新作用域的节点
const SCOPE_KINDS: &[&str] = &[
    "block",
    "constructor_body",
    "for_statement",
    "enhanced_for_statement",
    "catch_clause",
    "lambda_expression",
    "try_with_resources_statement",
    "switch_block",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeViolation {
    pub name: String,
    pub declared_line: usize,
    pub location: Location,
}

struct ScopeTracker<'a, 't> {
    code: &'a str,
    fields: HashSet<String>,
    /// 从遍历起点到当前节点的路径
    path: Vec<Node<'t>>,
    active: Vec<Vec<(String, usize)>>,
    closed: HashMap<String, usize>,
    violations: Vec<ScopeViolation>,
}

impl<'a, 't> ScopeTracker<'a, 't> {
    fn new(code: &'a str, fields: HashSet<String>) -> Self {
        Self {
            code,
            fields,
            path: Vec::new(),
            active: vec![Vec::new()],
            closed: HashMap::new(),
            violations: Vec::new(),
        }
    }

    fn declare(&mut self, node: Node) {
        let name = node_text(node, self.code).to_string();
        let line = node.start_position().row + 1;
        if let Some(scope) = self.active.last_mut() {
            scope.push((name, line));
        }
    }

    fn is_visible(&self, name: &str) -> bool {
        self.active.iter().any(|scope| scope.iter().any(|(n, _)| n == name))
    }

    fn visit_identifier(&mut self, node: Node, parent: Node) {
        if is_declaration(node, parent) {
            self.declare(node);
            return;
        }
        if !is_variable_use(node, parent) {
            return;
        }

        let name = node_text(node, self.code);
        if self.is_visible(name) || self.fields.contains(name) {
            return;
        }
        if let Some(&declared_line) = self.closed.get(name) {
            self.violations.push(ScopeViolation {
                name: name.to_string(),
                declared_line,
                location: Location::from_point(node.start_position()),
            });
        }
    }
}

impl<'a, 't> TreeVisitor<'t> for ScopeTracker<'a, 't> {
    fn enter(&mut self, node: Node<'t>) -> bool {
        let parent = self.path.last().copied();
        self.path.push(node);

        let kind = node.kind();
        if is_type_body(kind) {
            return false;
        }
        if kind == "identifier" {
            if let Some(parent) = parent {
                self.visit_identifier(node, parent);
            }
            return false;
        }
        if SCOPE_KINDS.contains(&kind) {
            self.active.push(Vec::new());
        }
        true
    }

    fn leave(&mut self, node: Node<'t>) {
        self.path.pop();
        if !SCOPE_KINDS.contains(&node.kind()) {
            return;
        }
        if let Some(scope) = self.active.pop() {
            for (name, line) in scope {
                self.closed.insert(name, line);
            }
        }
    }
}

fn is_declaration(node: Node, parent: Node) -> bool {
    let kind = parent.kind();
    if DECLARING_PARENTS.contains(&kind) {
        return parent.child_by_field_name("name") == Some(node);
    }
    match kind {
        "lambda_expression" => parent.child_by_field_name("parameters") == Some(node),
        "inferred_parameters" => true,
        _ => false,
    }
}

/// 排除方法名、字段访问名、标签、类型/注解名等
fn is_variable_use(node: Node, parent: Node) -> bool {
    match parent.kind() {
        "method_invocation" => parent.child_by_field_name("name") != Some(node),
        "field_access" => parent.child_by_field_name("field") != Some(node),
        "method_reference" => parent.child(0) == Some(node),
        "labeled_statement" | "break_statement" | "continue_statement" => false,
        "scoped_identifier" | "import_declaration" | "package_declaration" => false,
        "annotation" | "marker_annotation" | "element_value_pair" => false,
        "enum_constant" | "method_declaration" | "constructor_declaration" => false,
        kind if crate::symbol_table::TYPE_DECLARATION_KINDS.contains(&kind) => false,
        _ => true,
    }
}

/// 同一文件中的类声明，按简单名称索引
pub fn class_declarations<'t>(root: Node<'t>, code: &str) -> HashMap<String, Node<'t>> {
    let mut classes = HashMap::new();
    preorder(root, |node| {
        if node.kind() == "class_declaration" {
            if let Some(name) = node.child_by_field_name("name") {
                classes.insert(node_text(name, code).to_string(), node);
            }
        }
        true
    });
    classes
}

/// `extends` 子句中的类名 (去掉包名与泛型参数)
fn superclass_name<'c>(decl: Node, code: &'c str) -> Option<&'c str> {
    let mut ty = decl.child_by_field_name("superclass")?.named_child(0)?;
    if ty.kind() == "generic_type" {
        ty = ty.named_child(0)?;
    }
    let name = node_text(ty, code);
    name.rsplit('.').next().map(str::trim)
}

/// 类型体中直接声明的字段与枚举常量
fn body_fields(body: Node, code: &str, fields: &mut HashSet<String>) {
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                let mut inner = member.walk();
                for decl in member.children_by_field_name("declarator", &mut inner) {
                    if let Some(name) = decl.child_by_field_name("name") {
                        fields.insert(node_text(name, code).to_string());
                    }
                }
            }
            "enum_constant" => {
                if let Some(name) = member.child_by_field_name("name") {
                    fields.insert(node_text(name, code).to_string());
                }
            }
            _ => {}
        }
    }
}

/// 沿同一文件中的父类链收集继承的字段
fn inherited_fields<'t>(
    decl: Node<'t>,
    classes: &HashMap<String, Node<'t>>,
    code: &str,
    fields: &mut HashSet<String>,
) {
    let mut seen = HashSet::from([decl.id()]);
    let mut current = decl;
    while let Some(&parent) = superclass_name(current, code).and_then(|name| classes.get(name)) {
        // 循环继承
        if !seen.insert(parent.id()) {
            break;
        }
        if let Some(body) = parent.child_by_field_name("body") {
            body_fields(body, code, fields);
        }
        current = parent;
    }
}

/// 外层类型声明的字段名 (包括枚举常量、record 组件与继承的字段)
fn enclosing_fields<'t>(
    node: Node<'t>,
    classes: &HashMap<String, Node<'t>>,
    code: &str,
) -> HashSet<String> {
    let mut fields = HashSet::new();
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "class_body" | "interface_body" | "enum_body" | "enum_body_declarations" => {
                body_fields(n, code, &mut fields);
            }
            "class_declaration" => inherited_fields(n, classes, code, &mut fields),
            "record_declaration" => {
                if let Some(params) = n.child_by_field_name("parameters") {
                    let mut cursor = params.walk();
                    for param in params.named_children(&mut cursor) {
                        if let Some(name) = param.child_by_field_name("name") {
                            fields.insert(node_text(name, code).to_string());
                        }
                    }
                }
            }
            _ => {}
        }
        current = n.parent();
    }
    fields
}

/// 检查单个方法单元
pub fn scope_violations<'t>(
    unit: &MethodUnit<'t>,
    classes: &HashMap<String, Node<'t>>,
    code: &str,
) -> Vec<ScopeViolation> {
    let Some(body) = unit.body else {
        return Vec::new();
    };

    let mut tracker = ScopeTracker::new(code, enclosing_fields(unit.node, classes, code));
    if let Some(params) = unit.node.child_by_field_name("parameters") {
        walk_tree(params, &mut tracker);
    }
    walk_tree(body, &mut tracker);
    tracker.violations
}

pub fn check_variable_scope(ctx: &RuleContext, out: &mut Vec<Finding>) {
    let before = out.len();
    let classes = class_declarations(ctx.root, ctx.code);

    for unit in &ctx.units {
        for v in scope_violations(unit, &classes, ctx.code) {
            out.push(
                Finding::failed(RULE_ID, DESCRIPTION)
                    .with_message(format!(
                        "Variable '{}' is used outside the block where it was declared (line {}) in {}",
                        v.name, v.declared_line, unit.qualified_name
                    ))
                    .at(v.location),
            );
        }
    }

    if out.len() == before {
        out.push(Finding::passed(RULE_ID, DESCRIPTION));
    }
}
