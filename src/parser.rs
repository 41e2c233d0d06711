// ============================================================================
// Java 解析器 - 可插拔的解析能力
// ============================================================================
//
// 分析驱动只依赖 `JavaParser` trait，在构造时注入具体实现。
// 默认实现基于 tree-sitter-java。tree-sitter 本身会做错误恢复，
// 因此这里把树中第一个 ERROR / MISSING 节点视为解析失败，
// 并生成与解析器风格一致的原始错误文本 (含 `line:N,col:M`)。
//
// ============================================================================

use std::cell::RefCell;

use thiserror::Error;
use tracing::trace;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::walk::preorder;

/// 固定的解析器版本号 (写入报告元数据)
pub const PARSER_VERSION: &str = "tree-sitter-java 0.21";

/// 找到的 token 在消息中的最大长度
const MAX_TOKEN_LEN: usize = 30;

/// 原始解析错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 解析能力
pub trait JavaParser: Send + Sync {
    /// 成功时返回完整语法树；失败时返回第一个错误
    fn parse(&self, source: &str) -> Result<Tree, ParseError>;

    /// 写入报告的版本号
    fn version(&self) -> &str;
}

thread_local! {
    /// 线程本地 Parser 实例 (rayon 并行评分时每个线程只初始化一次)
    static JAVA_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn with_parser<F, R>(language: &Language, f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> Result<R, ParseError>,
{
    JAVA_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();

        if slot.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(language)
                .map_err(|e| ParseError::new(format!("Failed to set language: {e}")))?;
            *slot = Some(parser);
        }

        match slot.as_mut() {
            Some(parser) => f(parser),
            None => Err(ParseError::new("Java parser unavailable")),
        }
    })
}

/// tree-sitter-java 实现
pub struct TreeSitterJavaParser {
    language: Language,
}

impl TreeSitterJavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::language(),
        }
    }
}

impl Default for TreeSitterJavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaParser for TreeSitterJavaParser {
    fn parse(&self, source: &str) -> Result<Tree, ParseError> {
        let tree = with_parser(&self.language, |parser| {
            parser
                .parse(source, None)
                .ok_or_else(|| ParseError::new("Parser produced no syntax tree"))
        })?;

        if let Some(node) = first_error_node(tree.root_node()) {
            let err = describe_error(node, source);
            trace!(error = %err, "parse failed");
            return Err(err);
        }

        Ok(tree)
    }

    fn version(&self) -> &str {
        PARSER_VERSION
    }
}

/// 文档顺序中的第一个 ERROR / MISSING 节点
fn first_error_node(root: Node) -> Option<Node> {
    let mut found = None;
    preorder(root, |node| {
        if found.is_some() {
            return false;
        }
        if node.is_error() || node.is_missing() {
            found = Some(node);
            return false;
        }
        node.has_error()
    });
    found
}

fn describe_error(node: Node, source: &str) -> ParseError {
    let pos = node.start_position();
    let (expected, found) = if node.is_missing() {
        let found = next_token(node)
            .map(|t| token_text(t, source))
            .unwrap_or_else(|| "EOF".to_string());
        (describe_expected(node.kind()), found)
    } else {
        ("valid Java syntax".to_string(), token_text(first_leaf(node), source))
    };

    ParseError::new(format!(
        "Mismatch token: Expected: {expected} but found: '{found}' [line:{},col:{}]",
        pos.row + 1,
        pos.column + 1
    ))
}

/// 缺失 token 的文字描述
fn describe_expected(kind: &str) -> String {
    match kind {
        ";" => "semicolon ';'".to_string(),
        "{" => "left curly brace '{'".to_string(),
        "}" => "right curly brace '}'".to_string(),
        "(" => "left parenthesis '('".to_string(),
        ")" => "right parenthesis ')'".to_string(),
        "[" => "left bracket '['".to_string(),
        "]" => "right bracket ']'".to_string(),
        "identifier" | "type_identifier" => "identifier".to_string(),
        other => format!("'{other}'"),
    }
}

fn first_leaf(node: Node) -> Node {
    let mut current = node;
    while let Some(child) = current.child(0) {
        current = child;
    }
    current
}

fn next_token(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        if let Some(sibling) = current.next_sibling() {
            return Some(first_leaf(sibling));
        }
        current = current.parent()?;
    }
}

fn token_text(node: Node, source: &str) -> String {
    let text = node.utf8_text(source.as_bytes()).unwrap_or("");
    let text = text.lines().next().unwrap_or("").trim();
    if text.is_empty() {
        return if node.is_missing() { node.kind().to_string() } else { "EOF".to_string() };
    }
    if text.chars().count() > MAX_TOKEN_LEN {
        let truncated: String = text.chars().take(MAX_TOKEN_LEN).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::extract_location;

    #[test]
    fn test_valid_source_parses() {
        let parser = TreeSitterJavaParser::new();
        let tree = parser
            .parse("public class Hello { public static void main(String[] args) { System.out.println(\"hi\"); } }")
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn test_missing_semicolon_reported_with_position() {
        let code = "class A {\n    void f() {\n        int x = 1\n    }\n}\n";
        let err = TreeSitterJavaParser::new().parse(code).unwrap_err();

        assert!(err.message.starts_with("Mismatch token: Expected: semicolon"), "{}", err.message);
        let (line, column) = extract_location(&err.message);
        assert_eq!(line, 3);
        assert!(column > 0);
    }

    #[test]
    fn test_missing_closing_brace() {
        let code = "public class A {\n    void f() {\n    }\n";
        let err = TreeSitterJavaParser::new().parse(code).unwrap_err();
        assert!(err.message.contains("curly brace"), "{}", err.message);
    }

    #[test]
    fn test_parser_reused_across_calls() {
        let parser = TreeSitterJavaParser::new();
        for _ in 0..3 {
            assert!(parser.parse("class A {}").is_ok());
        }
        assert_eq!(parser.version(), PARSER_VERSION);
    }

    #[test]
    fn test_error_after_deep_expression_is_found() {
        let terms = vec!["1"; 100_000].join(" + ");
        let code = format!("class A {{\n    int x = {terms};\n    int y = 2\n}}\n");
        let err = TreeSitterJavaParser::new().parse(&code).unwrap_err();

        assert!(err.message.contains("semicolon"), "{}", err.message);
        assert_eq!(extract_location(&err.message).0, 3);
    }

    #[test]
    fn test_describe_expected() {
        assert_eq!(describe_expected(";"), "semicolon ';'");
        assert_eq!(describe_expected("identifier"), "identifier");
        assert_eq!(describe_expected("=>"), "'=>'");
    }
}
