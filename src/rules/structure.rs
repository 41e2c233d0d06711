//! 必需的类与方法
//!
//! 参数/返回类型的比较规则：
//! - 去除空白与包名前缀 (`java.util.List` 与 `List` 等价)
//! - `T...` 与 `T[]` 等价
//! - 期望类型不带泛型参数时，按擦除后的实际类型比较

use crate::config::MethodSpec;
use crate::report::Finding;
use crate::symbol_table::MethodInfo;

use super::RuleContext;

pub fn check_required_classes(ctx: &RuleContext, names: &[String], out: &mut Vec<Finding>) {
    for name in names {
        let rule_id = format!("rule.requiredClass.{name}");
        let description = format!("Class '{name}' is declared");

        match ctx.symbols.find_type(name) {
            Some(info) => out.push(Finding::passed(rule_id, description).at(info.location)),
            None => out.push(
                Finding::failed(rule_id, description)
                    .with_message(format!("Required class '{name}' is not declared in this file")),
            ),
        }
    }
}

pub fn check_required_methods(ctx: &RuleContext, specs: &[MethodSpec], out: &mut Vec<Finding>) {
    for spec in specs {
        let rule_id = format!("rule.requiredMethod.{}", spec.name);
        let description = format!("Method '{}' is declared", spec.display_signature());
        let candidates: Vec<&MethodInfo> = ctx.symbols.methods_named(&spec.name).collect();

        if candidates.is_empty() {
            out.push(
                Finding::failed(rule_id, description)
                    .with_message(format!("No method named '{}' is declared", spec.name)),
            );
            continue;
        }

        if let Some(found) = candidates.iter().find(|m| method_matches(spec, m)) {
            out.push(Finding::passed(rule_id, description).at(found.location));
            continue;
        }

        let found: Vec<String> = candidates.iter().map(|m| m.signature()).collect();
        out.push(
            Finding::failed(rule_id, description)
                .with_message(format!(
                    "Method '{}' has the wrong signature; found: {}",
                    spec.name,
                    found.join("; ")
                ))
                .at(candidates[0].location),
        );
    }
}

pub fn method_matches(spec: &MethodSpec, method: &MethodInfo) -> bool {
    if spec.name != method.name {
        return false;
    }
    if let Some(expected) = &spec.params {
        if expected.len() != method.params.len() {
            return false;
        }
        if !expected.iter().zip(&method.params).all(|(e, a)| type_matches(e, a)) {
            return false;
        }
    }
    match &spec.return_type {
        Some(expected) => type_matches(expected, &method.return_type),
        None => true,
    }
}

pub fn type_matches(expected: &str, actual: &str) -> bool {
    let expected = normalize_type(expected);
    let actual = normalize_type(actual);
    if expected == actual {
        return true;
    }
    !expected.contains('<') && expected == erasure(&actual)
}

/// 去空白、varargs 转数组、去包名
pub fn normalize_type(ty: &str) -> String {
    let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
    strip_qualifiers(&compact.replace("...", "[]"))
}

fn strip_qualifiers(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut segment = String::new();
    for ch in ty.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '.' {
            segment.push(ch);
        } else {
            out.push_str(last_segment(&segment));
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(last_segment(&segment));
    out
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// 去掉所有 `<...>` (支持嵌套)
pub fn erasure(ty: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(ty.len());
    for ch in ty.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}
