// ============================================================================
// 命令处理 - 分析、批量评分、配置查看
// ============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use java_grader::analyzer::Analyzer;
use java_grader::config::ExerciseConfigLoader;
use java_grader::grading::grade_files;
use java_grader::render::{render_grading, render_report};
use java_grader::submissions::{
    detect_submissions, extract_all, locate_java_files, EXTRACTION_DIR_NAME,
};

use crate::{Command, Options};

pub fn handle_command(command: Command, options: &Options) -> Result<()> {
    let loader = ExerciseConfigLoader::new(&options.config_dir);

    match command {
        Command::Analyze { file, exercise } => analyze(loader, options, &file, &exercise),
        Command::Grade { path, exercise, out } => {
            let out = out.unwrap_or_else(|| path.join(EXTRACTION_DIR_NAME));
            grade(loader, options, &path, &exercise, &out)
        }
        Command::Exercises => exercises(&loader, options.json),
        Command::ShowConfig { exercise } => show_config(&loader, &exercise),
    }
}

fn build_analyzer(loader: ExerciseConfigLoader, options: &Options) -> Result<Analyzer> {
    Ok(Analyzer::new(loader)?.with_locale(options.locale))
}

fn analyze(loader: ExerciseConfigLoader, options: &Options, file: &Path, exercise: &str) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let analyzer = build_analyzer(loader, options)?;
    let report = analyzer.analyze(exercise, &source);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report, file));
    }
    Ok(())
}

fn grade(
    loader: ExerciseConfigLoader,
    options: &Options,
    dir: &Path,
    exercise: &str,
    out: &Path,
) -> Result<()> {
    let submissions = detect_submissions(dir, Some(out))?;
    let extractions = extract_all(&submissions, out);
    let files = locate_java_files(&extractions);
    info!(
        submissions = submissions.len(),
        extracted = extractions.len(),
        with_java = files.len(),
        "submissions ready"
    );

    let analyzer = build_analyzer(loader, options)?;
    let reports = grade_files(&analyzer, exercise, &files);

    if options.json {
        let students: Vec<_> = reports
            .iter()
            .map(|r| json!({ "student": r.student, "summary": r.summary(), "files": r.files }))
            .collect();
        let value = json!({ "exerciseId": exercise, "students": students });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", render_grading(exercise, &reports));
    }
    Ok(())
}

fn exercises(loader: &ExerciseConfigLoader, as_json: bool) -> Result<()> {
    let ids = loader
        .list()
        .with_context(|| format!("Failed to list exercises in {}", loader.config_dir().display()))?;

    let mut entries = Vec::with_capacity(ids.len());
    for id in ids {
        // 无效配置也列出，附带错误
        match loader.load(&id) {
            Ok(config) => entries.push(json!({ "id": id, "name": config.name })),
            Err(e) => entries.push(json!({ "id": id, "error": e.to_string() })),
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut report = format!("## 📚 Exercises ({})\n\n", entries.len());
    for entry in &entries {
        let id = entry["id"].as_str().unwrap_or_default();
        match entry["name"].as_str() {
            Some(name) => report.push_str(&format!("- `{id}` - {name}\n")),
            None => report.push_str(&format!(
                "- `{id}` - ⚠️ {}\n",
                entry["error"].as_str().unwrap_or_default()
            )),
        }
    }
    print!("{report}");
    Ok(())
}

fn show_config(loader: &ExerciseConfigLoader, exercise: &str) -> Result<()> {
    let config = loader.load(exercise)?;
    println!("{}", serde_json::to_string_pretty(&config.to_json_value())?);
    Ok(())
}
