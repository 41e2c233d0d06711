// ============================================================================
// 符号表模块 - 声明的类型与方法
// ============================================================================
//
// 使用一个预编译的结构查询 (tree-sitter Query) 一次性提取：
// - 类型声明 (class / interface / enum / record / @interface)
// - 方法声明 (名称、参数类型、返回类型、所在类型)
//
// ============================================================================

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tree_sitter::{Language, Node, Query, QueryCursor, Tree};

use crate::report::Location;

/// 类型声明节点
pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const STRUCTURE_QUERY: &str = r#"
    (class_declaration name: (identifier) @type_name) @type_decl
    (interface_declaration name: (identifier) @type_name) @type_decl
    (enum_declaration name: (identifier) @type_name) @type_decl
    (record_declaration name: (identifier) @type_name) @type_decl
    (annotation_type_declaration name: (identifier) @type_name) @type_decl
    (method_declaration name: (identifier) @method_name) @method_decl
"#;

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    fn from_node_kind(kind: &str) -> Self {
        match kind {
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            "annotation_type_declaration" => TypeKind::Annotation,
            _ => TypeKind::Class,
        }
    }
}

/// 类型信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    pub location: Location,
}

/// 方法信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// 最近的具名外层类型
    pub class: Option<String>,
    /// 参数类型原文 (varargs 保留 `...`，C 风格数组维度已并入)
    pub params: Vec<String>,
    pub return_type: String,
    pub location: Location,
}

impl MethodInfo {
    pub fn signature(&self) -> String {
        format!("{} {}({})", self.return_type, self.name, self.params.join(", "))
    }
}

/// 符号表 - 一个文件中的声明
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub types: Vec<TypeInfo>,
    pub methods: Vec<MethodInfo>,
}

impl SymbolTable {
    pub fn find_type(&self, name: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn methods_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s MethodInfo> + 's {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// 预编译的结构查询
pub struct SymbolExtractor {
    query: Query,
    type_name_idx: u32,
    method_decl_idx: u32,
}

impl SymbolExtractor {
    pub fn new(language: &Language) -> Result<Self> {
        let query = Query::new(language, STRUCTURE_QUERY)
            .map_err(|e| anyhow!("Failed to compile structure query: {e}"))?;
        let type_name_idx = query
            .capture_index_for_name("type_name")
            .ok_or_else(|| anyhow!("structure query must have @type_name capture"))?;
        let method_decl_idx = query
            .capture_index_for_name("method_decl")
            .ok_or_else(|| anyhow!("structure query must have @method_decl capture"))?;

        Ok(Self {
            query,
            type_name_idx,
            method_decl_idx,
        })
    }

    pub fn extract(&self, tree: &Tree, code: &str) -> SymbolTable {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&self.query, tree.root_node(), code.as_bytes());
        let mut table = SymbolTable::default();

        for m in matches {
            for capture in m.captures {
                if capture.index == self.type_name_idx {
                    let decl_kind = capture.node.parent().map(|p| p.kind()).unwrap_or("");
                    table.types.push(TypeInfo {
                        name: node_text(capture.node, code).to_string(),
                        kind: TypeKind::from_node_kind(decl_kind),
                        location: Location::from_point(capture.node.start_position()),
                    });
                } else if capture.index == self.method_decl_idx {
                    if let Some(info) = method_info(capture.node, code) {
                        table.methods.push(info);
                    }
                }
            }
        }

        table.types.sort_by_key(|t| (t.location.line, t.location.column));
        table.methods.sort_by_key(|m| (m.location.line, m.location.column));
        table
    }
}

pub fn node_text<'a>(node: Node, code: &'a str) -> &'a str {
    node.utf8_text(code.as_bytes()).unwrap_or("")
}

/// 最近的具名外层类型名
pub fn enclosing_type_name(node: Node, code: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if TYPE_DECLARATION_KINDS.contains(&n.kind()) {
            return n
                .child_by_field_name("name")
                .map(|name| node_text(name, code).to_string());
        }
        current = n.parent();
    }
    None
}

fn method_info(method: Node, code: &str) -> Option<MethodInfo> {
    let name_node = method.child_by_field_name("name")?;
    let return_type = method
        .child_by_field_name("type")
        .map(|t| node_text(t, code).to_string())
        .unwrap_or_default();
    let params = method
        .child_by_field_name("parameters")
        .map(|p| parameter_types(p, code))
        .unwrap_or_default();

    Some(MethodInfo {
        name: node_text(name_node, code).to_string(),
        class: enclosing_type_name(method, code),
        params,
        return_type,
        location: Location::from_point(name_node.start_position()),
    })
}

/// `formal_parameters` -> 参数类型列表
pub fn parameter_types(params: Node, code: &str) -> Vec<String> {
    let mut types = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let mut ty = param
                    .child_by_field_name("type")
                    .map(|t| node_text(t, code).to_string())
                    .unwrap_or_default();
                // `String args[]`
                if let Some(dims) = param.child_by_field_name("dimensions") {
                    ty.push_str(node_text(dims, code));
                }
                types.push(ty);
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let ty = param
                    .named_children(&mut inner)
                    .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator")
                    .map(|t| node_text(t, code).to_string())
                    .unwrap_or_default();
                types.push(format!("{ty}..."));
            }
            _ => {}
        }
    }
    types
}
