// ============================================================================
// 练习配置 - 每个练习一个 JSON 文档
// ============================================================================
//
// 存储格式保持松散的 `rules` 对象 (每种规则一个可选字段)，
// 加载后转换为封闭的 `Rule` 枚举序列，方便穷尽匹配。
//
// ============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// 默认配置目录
pub const DEFAULT_CONFIG_DIR: &str = "configs/exercises";

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found for exercise: {0}")]
    NotFound(String),

    #[error("Invalid JSON format in configuration file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration format for exercise {id}: missing required field(s): {}", .missing.join(", "))]
    Invalid { id: String, missing: Vec<&'static str> },

    #[error("Failed to load configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 必需方法的签名约束
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl MethodSpec {
    /// 人类可读的签名，如 `int add(int, int)`
    pub fn display_signature(&self) -> String {
        let params = match &self.params {
            Some(p) => format!("({})", p.join(", ")),
            None => "(..)".to_string(),
        };
        match &self.return_type {
            Some(ret) => format!("{} {}{}", ret, self.name, params),
            None => format!("{}{}", self.name, params),
        }
    }
}

/// 一种结构规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    RequiredClasses(Vec<String>),
    RequiredMethods(Vec<MethodSpec>),
    DisallowedElements(Vec<String>),
    VariableScope,
    MethodLength { max_lines: usize },
    CyclomaticComplexity { max: usize },
}

impl Rule {
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::RequiredClasses(_) => "requiredClasses",
            Rule::RequiredMethods(_) => "requiredMethods",
            Rule::DisallowedElements(_) => "disallowedElements",
            Rule::VariableScope => "checkVariableScope",
            Rule::MethodLength { .. } => "checkMethodLength",
            Rule::CyclomaticComplexity { .. } => "checkCyclomaticComplexity",
        }
    }
}

/// 练习配置 (加载后只读)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rules: Vec<Rule>,
}

/// 磁盘上的 `rules` 对象
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_methods: Option<Vec<MethodSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disallowed_elements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_variable_scope: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_method_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_cyclomatic_complexity: Option<usize>,
}

impl RawRules {
    /// 固定顺序，与文档中的键顺序无关
    fn into_rules(self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if let Some(classes) = self.required_classes {
            rules.push(Rule::RequiredClasses(classes));
        }
        if let Some(methods) = self.required_methods {
            rules.push(Rule::RequiredMethods(methods));
        }
        if let Some(elements) = self.disallowed_elements {
            rules.push(Rule::DisallowedElements(elements));
        }
        if self.check_variable_scope == Some(true) {
            rules.push(Rule::VariableScope);
        }
        if let Some(max_lines) = self.check_method_length {
            rules.push(Rule::MethodLength { max_lines });
        }
        if let Some(max) = self.check_cyclomatic_complexity {
            rules.push(Rule::CyclomaticComplexity { max });
        }
        rules
    }

    fn from_rules(rules: &[Rule]) -> Self {
        let mut raw = RawRules::default();
        for rule in rules {
            match rule {
                Rule::RequiredClasses(c) => raw.required_classes = Some(c.clone()),
                Rule::RequiredMethods(m) => raw.required_methods = Some(m.clone()),
                Rule::DisallowedElements(e) => raw.disallowed_elements = Some(e.clone()),
                Rule::VariableScope => raw.check_variable_scope = Some(true),
                Rule::MethodLength { max_lines } => raw.check_method_length = Some(*max_lines),
                Rule::CyclomaticComplexity { max } => raw.check_cyclomatic_complexity = Some(*max),
            }
        }
        raw
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RawExerciseConfig {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    rules: RawRules,
}

impl ExerciseConfig {
    /// 解析 JSON 文档 (`path` 仅用于错误信息)
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawExerciseConfig = serde_json::from_str(text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        let mut missing = Vec::new();
        if !present(&raw.id) {
            missing.push("id");
        }
        if !present(&raw.name) {
            missing.push("name");
        }
        if !present(&raw.description) {
            missing.push("description");
        }
        if !missing.is_empty() {
            let id = raw
                .id
                .filter(|v| !v.is_empty())
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().to_string()))
                .unwrap_or_default();
            return Err(ConfigError::Invalid { id, missing });
        }

        Ok(Self {
            id: raw.id.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            rules: raw.rules.into_rules(),
        })
    }

    /// 序列化回存储格式 (用于 show-config 输出)
    pub fn to_json_value(&self) -> serde_json::Value {
        let raw = RawExerciseConfig {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            rules: RawRules::from_rules(&self.rules),
        };
        serde_json::to_value(raw).unwrap_or(serde_json::Value::Null)
    }
}

/// 配置加载器：`<config_dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct ExerciseConfigLoader {
    config_dir: PathBuf,
}

impl ExerciseConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// 不能映射到单个文件的 ID 一律视为不存在
    fn config_path(&self, exercise_id: &str) -> Option<PathBuf> {
        let bad = exercise_id.is_empty()
            || exercise_id.contains(['/', '\\'])
            || exercise_id.contains("..");
        if bad {
            return None;
        }
        Some(self.config_dir.join(format!("{exercise_id}.json")))
    }

    pub fn exists(&self, exercise_id: &str) -> bool {
        self.config_path(exercise_id).is_some_and(|p| p.is_file())
    }

    pub fn load(&self, exercise_id: &str) -> Result<ExerciseConfig, ConfigError> {
        let path = self
            .config_path(exercise_id)
            .ok_or_else(|| ConfigError::NotFound(exercise_id.to_string()))?;

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(exercise_id.to_string()));
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let config = ExerciseConfig::from_json(&text, &path)?;
        debug!(exercise = exercise_id, rules = config.rules.len(), "loaded exercise config");
        Ok(config)
    }

    /// 列出所有练习 ID (按字母排序)
    pub fn list(&self) -> Result<Vec<String>, ConfigError> {
        if !self.config_dir.is_dir() {
            return Err(ConfigError::Io {
                path: self.config_dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "configuration directory does not exist"),
            });
        }

        let mut ids: Vec<String> = WalkDir::new(&self.config_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| e.path().file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, id: &str, body: &str) {
        fs::write(dir.path().join(format!("{id}.json")), body).unwrap();
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "ex1", r#"{
            "id": "ex1",
            "name": "Exercise 1",
            "description": "Write a Calculator",
            "rules": {
                "checkCyclomaticComplexity": 5,
                "requiredClasses": ["Calculator"],
                "checkVariableScope": true
            }
        }"#);

        let config = ExerciseConfigLoader::new(dir.path()).load("ex1").unwrap();
        assert_eq!(config.id, "ex1");
        assert_eq!(config.name, "Exercise 1");
        // 固定顺序: requiredClasses 在前
        assert_eq!(
            config.rules,
            vec![
                Rule::RequiredClasses(vec!["Calculator".to_string()]),
                Rule::VariableScope,
                Rule::CyclomaticComplexity { max: 5 },
            ]
        );
    }

    #[test]
    fn test_missing_rules_object_means_no_rules() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "bare", r#"{"id": "bare", "name": "Bare", "description": "d"}"#);

        let config = ExerciseConfigLoader::new(dir.path()).load("bare").unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_scope_false_is_not_a_rule() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "ex", r#"{"id": "ex", "name": "n", "description": "d",
            "rules": {"checkVariableScope": false}}"#);

        let config = ExerciseConfigLoader::new(dir.path()).load("ex").unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ExerciseConfigLoader::new(dir.path()).load("non-existent").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_path_like_ids_are_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = ExerciseConfigLoader::new(dir.path());
        for id in ["", "../secret", "a/b", "a\\b"] {
            assert!(matches!(loader.load(id), Err(ConfigError::NotFound(_))), "id {id:?}");
            assert!(!loader.exists(id));
        }
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "broken", "{ not json");

        let err = ExerciseConfigLoader::new(dir.path()).load("broken").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().contains("Invalid JSON format"));
    }

    #[test]
    fn test_wrong_rule_type_is_malformed() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "typed", r#"{"id": "typed", "name": "n", "description": "d",
            "rules": {"checkMethodLength": "long"}}"#);

        let err = ExerciseConfigLoader::new(dir.path()).load("typed").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_missing_required_fields_is_invalid() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "partial", r#"{"id": "partial", "name": ""}"#);

        let err = ExerciseConfigLoader::new(dir.path()).load("partial").unwrap_err();
        match err {
            ConfigError::Invalid { id, missing } => {
                assert_eq!(id, "partial");
                assert_eq!(missing, vec!["name", "description"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_list_and_exists() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "b", "{}");
        write_config(&dir, "a", "{}");
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let loader = ExerciseConfigLoader::new(dir.path());
        assert_eq!(loader.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(loader.exists("a"));
        assert!(!loader.exists("c"));
    }

    #[test]
    fn test_json_value_round_trips_rules() {
        let config = ExerciseConfig {
            id: "x".to_string(),
            name: "X".to_string(),
            description: "d".to_string(),
            rules: vec![Rule::MethodLength { max_lines: 20 }],
        };
        let value = config.to_json_value();
        assert_eq!(value["rules"]["checkMethodLength"], 20);
        assert!(value["rules"].get("requiredClasses").is_none());
    }
}
