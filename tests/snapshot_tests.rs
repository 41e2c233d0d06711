// ============================================================================
// 快照测试 - 验证规则结果不退化
// ============================================================================

use std::path::PathBuf;

use java_grader::analyzer::Analyzer;
use java_grader::config::ExerciseConfigLoader;

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn test_calculator_findings_snapshot() {
    let analyzer = Analyzer::new(ExerciseConfigLoader::new(root().join("configs/exercises"))).unwrap();
    let source = std::fs::read_to_string(root().join("tests/fixtures/Calculator.java")).unwrap();

    // 时间戳不参与快照
    let report = analyzer.analyze("calculator", &source);
    insta::assert_json_snapshot!("calculator_findings", report.findings);
}

#[test]
fn test_fixtures_exist() {
    let path = root().join("tests/fixtures");
    assert!(path.join("Calculator.java").is_file(), "Fixture should exist");
    assert!(path.join("HelloWorld.java").is_file(), "Fixture should exist");
}
