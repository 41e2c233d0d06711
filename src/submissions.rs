// ============================================================================
// 学生提交 - 发现 ZIP、解压、定位 Java 源文件
// ============================================================================

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// 默认解压目录名 (位于提交目录下)
pub const EXTRACTION_DIR_NAME: &str = "extracted";

/// 一个学生的提交归档
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    /// 归档文件名去掉 `.zip`
    pub student_name: String,
    pub file_path: PathBuf,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// 递归查找 `*.zip` (忽略大小写)，跳过 `skip_dir`
pub fn detect_submissions(dir: &Path, skip_dir: Option<&Path>) -> Result<Vec<StudentSubmission>> {
    if !dir.is_dir() {
        bail!("Submission directory {} does not exist", dir.display());
    }

    let mut submissions: Vec<StudentSubmission> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| skip_dir.map_or(true, |skip| e.path() != skip))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), "zip"))
        .map(|e| {
            let path = e.path();
            let file_name = e.file_name().to_string_lossy().to_string();
            let student_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone());
            let submitted_at = e
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            StudentSubmission {
                student_name,
                file_path: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
                file_name,
                submitted_at,
            }
        })
        .collect();

    submissions.sort_by(|a, b| a.student_name.cmp(&b.student_name).then(a.file_path.cmp(&b.file_path)));
    info!(dir = %dir.display(), count = submissions.len(), "detected submissions");
    Ok(submissions)
}

fn extract_into(zip_path: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target)
            .with_context(|| format!("Failed to clear {}", target.display()))?;
    }
    fs::create_dir_all(target).with_context(|| format!("Failed to create {}", target.display()))?;

    let file = File::open(zip_path).with_context(|| format!("Failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file).context("Not a readable zip archive")?;
    archive.extract(target).context("Failed to extract archive")?;
    Ok(())
}

/// 解压到 `<out_root>/<stem>`，覆盖旧的解压结果；失败返回 `None`
pub fn extract_submission(zip_path: &Path, out_root: &Path) -> Option<PathBuf> {
    let stem = zip_path.file_stem()?.to_string_lossy().to_string();
    let target = out_root.join(stem);

    match extract_into(zip_path, &target) {
        Ok(()) => {
            debug!(zip = %zip_path.display(), to = %target.display(), "extracted submission");
            Some(target)
        }
        Err(e) => {
            warn!(zip = %zip_path.display(), error = %format!("{e:#}"), "cannot extract submission");
            None
        }
    }
}

/// 多个归档共用的学生名 (解压目录相同，后解压的覆盖先解压的)
pub fn duplicate_student_names(submissions: &[StudentSubmission]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in submissions {
        *counts.entry(s.student_name.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// 归档路径 -> 解压目录 (只包含成功解压的)
pub fn extract_all(submissions: &[StudentSubmission], out_root: &Path) -> BTreeMap<PathBuf, PathBuf> {
    for name in duplicate_student_names(submissions) {
        let archives: Vec<String> = submissions
            .iter()
            .filter(|s| s.student_name == name)
            .map(|s| s.file_path.display().to_string())
            .collect();
        warn!(
            student = %name,
            archives = ?archives,
            "duplicate submission name; later archive replaces earlier extraction"
        );
    }

    submissions
        .iter()
        .filter_map(|s| extract_submission(&s.file_path, out_root).map(|dir| (s.file_path.clone(), dir)))
        .collect()
}

/// 递归查找 `*.java` (忽略大小写)，按路径排序
pub fn find_java_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), "java"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// 学生名 -> Java 文件；没有 Java 文件的学生被忽略
pub fn locate_java_files(extractions: &BTreeMap<PathBuf, PathBuf>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut located = BTreeMap::new();

    for (zip_path, extract_dir) in extractions {
        let student = zip_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let files = find_java_files(extract_dir);

        if files.is_empty() {
            warn!(student = %student, "no Java files in submission");
            continue;
        }
        located.insert(student, files);
    }

    located
}
