// ============================================================================
// Markdown 渲染 - 单文件报告与批量评分结果
// ============================================================================

use std::path::Path;

use crate::grading::StudentReport;
use crate::report::{AnalysisReport, FindingStatus};

fn status_line(report: &AnalysisReport) -> String {
    format!(
        "**Passed**: {} | **Failed**: {} | **Warnings**: {} | **Syntax errors**: {}\n\n",
        report.count(FindingStatus::Passed),
        report.count(FindingStatus::Failed),
        report.count(FindingStatus::Warning),
        report.syntax_errors.len()
    )
}

fn push_body(out: &mut String, report: &AnalysisReport) {
    if report.has_syntax_errors() {
        out.push_str("### 🔴 Syntax errors\n\n");
        for error in &report.syntax_errors {
            out.push_str(&format!(
                "- `{}:{}` - {}\n",
                error.line, error.column, error.message
            ));
            if let Some(code) = &error.code {
                out.push_str(&format!("  `{code}`\n"));
            }
        }
        out.push('\n');
    }

    for finding in &report.findings {
        out.push_str(&format!(
            "{} **{}** - {}",
            finding.status.icon(),
            finding.rule_id,
            finding.description
        ));
        if let Some(loc) = finding.location {
            out.push_str(&format!(" (line {})", loc.line));
        }
        if let Some(message) = &finding.message {
            out.push_str(&format!("\n  {message}"));
        }
        out.push('\n');
    }
}

/// 单文件报告
pub fn render_report(report: &AnalysisReport, file: &Path) -> String {
    let mut out = format!(
        "## 🔍 {} ({})\n\n",
        file.display(),
        report.exercise_id
    );
    out.push_str(&status_line(report));
    push_body(&mut out, report);
    out.push_str(&format!(
        "\n*{} | {}*\n",
        report.metadata.parser_version, report.metadata.analysis_date
    ));
    out
}

/// 批量评分：先汇总表，再逐个学生列出问题
pub fn render_grading(exercise_id: &str, reports: &[StudentReport]) -> String {
    let file_count: usize = reports.iter().map(|r| r.files.len()).sum();
    let mut out = format!(
        "## 📋 Grading: {exercise_id}\n\n**Students**: {} | **Files**: {file_count}\n\n",
        reports.len()
    );

    if reports.is_empty() {
        out.push_str("No submissions with Java files found\n");
        return out;
    }

    out.push_str("| Student | Files | Syntax errors | Failed | Warnings |\n");
    out.push_str("|---------|-------|---------------|--------|----------|\n");
    for student in reports {
        let s = student.summary();
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            student.student, s.files_analyzed, s.files_with_syntax_errors, s.failed_findings, s.warnings
        ));
    }
    out.push('\n');

    for student in reports {
        let problems: Vec<_> = student.files.iter().filter(|f| !f.report.is_clean()).collect();
        if problems.is_empty() {
            continue;
        }

        out.push_str(&format!("### {}\n\n", student.student));
        for file in problems {
            out.push_str(&format!("#### `{}`\n\n", file.path.display()));
            push_body(&mut out, &file.report);
            out.push('\n');
        }
    }

    out
}
