// ============================================================================
// 报告模型 - 统一的分析结果结构
// ============================================================================

use serde::{Deserialize, Serialize};

/// 系统错误的规则 ID
pub const SYSTEM_ERROR_RULE: &str = "system.error";
/// 语法通过的规则 ID
pub const SYNTAX_VALID_RULE: &str = "syntax.valid";

/// 检查结果状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Passed,
    Failed,
    Warning,
    Info,
}

impl FindingStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            FindingStatus::Passed => "✅",
            FindingStatus::Failed => "❌",
            FindingStatus::Warning => "⚠️",
            FindingStatus::Info => "ℹ️",
        }
    }
}

/// 源码位置 (1-based)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// 从 tree-sitter 的 0-based Point 转换
    pub fn from_point(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

/// 一条检查结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub status: FindingStatus,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, status: FindingStatus, description: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            status,
            description: description.into(),
            message: None,
            location: None,
        }
    }

    pub fn passed(rule_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(rule_id, FindingStatus::Passed, description)
    }

    pub fn failed(rule_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(rule_id, FindingStatus::Failed, description)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// 语法错误记录 (只在解析失败时产生)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// 出错的源码行 (已 trim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub analysis_date: String,
    pub parser_version: String,
}

/// 单个文件的分析报告
///
/// 每次 `analyze` 调用新建，返回后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub exercise_id: String,
    pub findings: Vec<Finding>,
    pub syntax_errors: Vec<SyntaxError>,
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    pub fn has_syntax_errors(&self) -> bool {
        !self.syntax_errors.is_empty()
    }

    pub fn count(&self, status: FindingStatus) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    pub fn is_system_error(&self) -> bool {
        self.findings.iter().any(|f| f.rule_id == SYSTEM_ERROR_RULE)
    }

    /// 没有语法错误，也没有失败/警告
    pub fn is_clean(&self) -> bool {
        !self.has_syntax_errors()
            && self.count(FindingStatus::Failed) == 0
            && self.count(FindingStatus::Warning) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_serializes_camel_case_and_skips_empty() {
        let finding = Finding::failed("rule.requiredClass.Main", "Class 'Main' is declared")
            .with_message("missing");
        let value = serde_json::to_value(&finding).unwrap();

        assert_eq!(value["ruleId"], "rule.requiredClass.Main");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "missing");
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_location_from_point_is_one_based() {
        let loc = Location::from_point(tree_sitter::Point { row: 0, column: 4 });
        assert_eq!(loc, Location::new(1, 5));
    }

    #[test]
    fn test_report_counts() {
        let report = AnalysisReport {
            exercise_id: "ex".to_string(),
            findings: vec![
                Finding::passed(SYNTAX_VALID_RULE, "ok"),
                Finding::failed("rule.x", "x"),
                Finding::new(SYSTEM_ERROR_RULE, FindingStatus::Warning, "boom"),
            ],
            syntax_errors: vec![],
            metadata: ReportMetadata {
                analysis_date: "2026-01-01T00:00:00.000Z".to_string(),
                parser_version: "test".to_string(),
            },
        };

        assert_eq!(report.count(FindingStatus::Failed), 1);
        assert!(report.is_system_error());
        assert!(!report.is_clean());
        assert!(!report.has_syntax_errors());
    }
}
