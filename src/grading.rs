// ============================================================================
// 批量评分 - 并行分析每个学生的全部 Java 文件
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::analyzer::Analyzer;
use crate::report::{AnalysisReport, FindingStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: String,
    pub files: Vec<FileReport>,
}

/// 单个学生的汇总
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    pub files_analyzed: usize,
    pub files_with_syntax_errors: usize,
    pub failed_findings: usize,
    pub warnings: usize,
}

impl StudentReport {
    pub fn summary(&self) -> GradeSummary {
        self.files.iter().fold(GradeSummary::default(), |mut acc, file| {
            acc.files_analyzed += 1;
            if file.report.has_syntax_errors() {
                acc.files_with_syntax_errors += 1;
            }
            acc.failed_findings += file.report.count(FindingStatus::Failed);
            acc.warnings += file.report.count(FindingStatus::Warning);
            acc
        })
    }
}

/// 并行分析；输出顺序与输入 (学生名、文件路径) 一致
pub fn grade_files(
    analyzer: &Analyzer,
    exercise_id: &str,
    files_by_student: &BTreeMap<String, Vec<PathBuf>>,
) -> Vec<StudentReport> {
    let jobs: Vec<(&String, &PathBuf)> = files_by_student
        .iter()
        .flat_map(|(student, files)| files.iter().map(move |f| (student, f)))
        .collect();

    let analyzed: Vec<(&String, FileReport)> = jobs
        .par_iter()
        .map(|(student, path)| {
            let report = analyzer.analyze_file(exercise_id, path);
            (*student, FileReport { path: (*path).clone(), report })
        })
        .collect();

    let mut reports: Vec<StudentReport> = Vec::with_capacity(files_by_student.len());
    for (student, file) in analyzed {
        match reports.last_mut() {
            Some(last) if &last.student == student => last.files.push(file),
            _ => reports.push(StudentReport {
                student: student.clone(),
                files: vec![file],
            }),
        }
    }

    info!(
        exercise = exercise_id,
        students = reports.len(),
        files = jobs.len(),
        "grading complete"
    );
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExerciseConfigLoader;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_grade_files_keeps_order_and_summarizes() {
        let dir = TempDir::new().unwrap();
        let configs = dir.path().join("configs");
        fs::create_dir_all(&configs).unwrap();
        fs::write(
            configs.join("ex1.json"),
            r#"{"id": "ex1", "name": "Ex 1", "description": "d",
                "rules": {"requiredClasses": ["Main"]}}"#,
        )
        .unwrap();

        let good = dir.path().join("Main.java");
        let broken = dir.path().join("Broken.java");
        let other = dir.path().join("Other.java");
        fs::write(&good, "public class Main { }").unwrap();
        fs::write(&broken, "public class Broken {").unwrap();
        fs::write(&other, "class Other { }").unwrap();
        let missing = dir.path().join("Missing.java");

        let mut by_student = BTreeMap::new();
        by_student.insert("bob".to_string(), vec![other.clone(), missing]);
        by_student.insert("alice".to_string(), vec![good.clone(), broken.clone()]);

        let analyzer = Analyzer::new(ExerciseConfigLoader::new(&configs)).unwrap();
        let reports = grade_files(&analyzer, "ex1", &by_student);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].student, "alice");
        assert_eq!(reports[0].files[0].path, good);
        assert_eq!(reports[0].files[1].path, broken);

        let alice = reports[0].summary();
        assert_eq!(alice.files_analyzed, 2);
        assert_eq!(alice.files_with_syntax_errors, 1);
        assert_eq!(alice.failed_findings, 0);

        let bob = reports[1].summary();
        assert_eq!(
            bob,
            GradeSummary {
                files_analyzed: 2,
                files_with_syntax_errors: 0,
                failed_findings: 1,
                warnings: 1,
            }
        );
    }
}
