// ============================================================================
// 分析驱动 - 配置加载 → 解析 → 规则评估 → 报告
// ============================================================================
//
// 每次调用独立构建报告，不保留可变状态；`Analyzer` 可在 rayon 线程池中共享。
// 任何输入都只返回报告，不向调用方抛出错误：
// - 配置失败 / 文件不可读 → 一条 `system.error` 警告
// - 解析失败 → 一条 `SyntaxError`，无 findings
//
// ============================================================================

use std::path::Path;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::config::ExerciseConfigLoader;
use crate::diagnostics::{translate_parse_error, Locale};
use crate::parser::{JavaParser, TreeSitterJavaParser};
use crate::report::{
    AnalysisReport, Finding, FindingStatus, ReportMetadata, SyntaxError, SYNTAX_VALID_RULE,
    SYSTEM_ERROR_RULE,
};
use crate::rules::RuleEngine;

pub struct Analyzer {
    parser: Box<dyn JavaParser>,
    loader: ExerciseConfigLoader,
    engine: RuleEngine,
    locale: Locale,
}

impl Analyzer {
    /// 使用默认的 tree-sitter 解析器
    pub fn new(loader: ExerciseConfigLoader) -> Result<Self> {
        Self::with_parser(loader, Box::new(TreeSitterJavaParser::new()))
    }

    pub fn with_parser(loader: ExerciseConfigLoader, parser: Box<dyn JavaParser>) -> Result<Self> {
        Ok(Self {
            parser,
            loader,
            engine: RuleEngine::new()?,
            locale: Locale::default(),
        })
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn loader(&self) -> &ExerciseConfigLoader {
        &self.loader
    }

    pub fn parser_version(&self) -> &str {
        self.parser.version()
    }

    /// 分析一段 Java 源码
    pub fn analyze(&self, exercise_id: &str, source: &str) -> AnalysisReport {
        let config = match self.loader.load(exercise_id) {
            Ok(config) => config,
            Err(e) => {
                warn!(exercise = exercise_id, error = %e, "cannot load exercise configuration");
                return self.system_error_report(exercise_id, e.to_string());
            }
        };

        let tree = match self.parser.parse(source) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(exercise = exercise_id, error = %e, "source does not parse");
                let syntax_error = translate_parse_error(&e.message, source, self.locale);
                return self.build_report(exercise_id, Vec::new(), vec![syntax_error]);
            }
        };

        let mut findings = vec![Finding::passed(SYNTAX_VALID_RULE, "Valid Java syntax")
            .with_message("The code was parsed without syntax errors")];
        findings.extend(self.engine.evaluate(&tree, source, &config.rules));

        info!(
            exercise = exercise_id,
            findings = findings.len(),
            failed = findings.iter().filter(|f| f.status == FindingStatus::Failed).count(),
            "analysis complete"
        );
        self.build_report(exercise_id, findings, Vec::new())
    }

    /// 读取并分析文件；读取失败视为系统错误
    pub fn analyze_file(&self, exercise_id: &str, path: &Path) -> AnalysisReport {
        match std::fs::read_to_string(path) {
            Ok(source) => self.analyze(exercise_id, &source),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "cannot read source file");
                self.system_error_report(exercise_id, format!("Cannot read {}: {e}", path.display()))
            }
        }
    }

    pub fn system_error_report(&self, exercise_id: &str, message: impl Into<String>) -> AnalysisReport {
        let finding = Finding::new(
            SYSTEM_ERROR_RULE,
            FindingStatus::Warning,
            "A system error occurred during analysis",
        )
        .with_message(message);
        self.build_report(exercise_id, vec![finding], Vec::new())
    }

    fn build_report(
        &self,
        exercise_id: &str,
        findings: Vec<Finding>,
        syntax_errors: Vec<SyntaxError>,
    ) -> AnalysisReport {
        AnalysisReport {
            exercise_id: exercise_id.to_string(),
            findings,
            syntax_errors,
            metadata: ReportMetadata {
                analysis_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                parser_version: self.parser.version().to_string(),
            },
        }
    }
}
