//! 语法错误翻译
//!
//! 将解析器的原始错误文本转换为 `SyntaxError` 记录：
//! 1. 提取 `line:N,col:M` 位置
//! 2. 取出对应的源码行
//! 3. 规范化消息 (去前缀、改写 Expected/but found、关键字分类)
//!
//! 关键字分类基于子串匹配，比较脆弱；全部集中在本模块，
//! 解析器以后提供结构化错误码时只需替换这里。

use std::fmt;
use std::str::FromStr;

use memchr::memchr_iter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::SyntaxError;

static RE_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)line:(\d+),col:(\d+)").unwrap()
});
static RE_ERROR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Error: ").unwrap()
});
static RE_MISMATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bMismatch.*?Expected:").unwrap()
});
static RE_BUT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bbut found:").unwrap()
});

/// 消息语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    fn expected(&self) -> &'static str {
        match self {
            Locale::En => "Expected:",
            Locale::Fr => "Attendu:",
        }
    }

    fn but_found(&self) -> &'static str {
        match self {
            Locale::En => "but found:",
            Locale::Fr => "mais trouvé:",
        }
    }

    fn missing_semicolon(&self) -> &'static str {
        match self {
            Locale::En => "Missing semicolon",
            Locale::Fr => "Point-virgule manquant",
        }
    }

    fn curly_brace(&self) -> &'static str {
        match self {
            Locale::En => "Missing or misplaced curly brace",
            Locale::Fr => "Accolade manquante ou mal placée",
        }
    }

    fn bad_identifier(&self) -> &'static str {
        match self {
            Locale::En => "Invalid or missing identifier",
            Locale::Fr => "Identifiant invalide ou manquant",
        }
    }

    fn unknown(&self) -> &'static str {
        match self {
            Locale::En => "Unknown syntax error",
            Locale::Fr => "Erreur de syntaxe inconnue",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "fr" | "french" | "français" => Ok(Locale::Fr),
            other => Err(format!("unsupported locale '{other}' (expected en or fr)")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Fr => write!(f, "fr"),
        }
    }
}

/// 从错误文本中提取 (line, column)，找不到时为 (0, 0)
pub fn extract_location(raw: &str) -> (usize, usize) {
    RE_LOCATION
        .captures(raw)
        .and_then(|caps| {
            let line = caps[1].parse().ok()?;
            let column = caps[2].parse().ok()?;
            Some((line, column))
        })
        .unwrap_or((0, 0))
}

/// 取第 `line` 行 (1-based)，越界返回 None
pub fn source_line(source: &str, line: usize) -> Option<&str> {
    if line == 0 {
        return None;
    }
    let bytes = source.as_bytes();
    let mut start = 0;
    let mut current = 1;
    for nl in memchr_iter(b'\n', bytes) {
        if current == line {
            return Some(source[start..nl].trim_end_matches('\r'));
        }
        start = nl + 1;
        current += 1;
    }
    // 最后一行 (无换行结尾)
    if current == line && start <= source.len() {
        return Some(&source[start..]);
    }
    None
}

/// 规范化解析器错误消息 (纯函数)
pub fn format_error_message(raw: &str, locale: Locale) -> String {
    if raw.trim().is_empty() {
        return locale.unknown().to_string();
    }

    let msg = RE_ERROR_PREFIX.replace(raw, "");
    let msg = RE_MISMATCH.replace(&msg, locale.expected());
    let msg = RE_BUT_FOUND.replace(&msg, locale.but_found());

    if msg.contains("semicolon") {
        locale.missing_semicolon().to_string()
    } else if msg.contains("curly brace") {
        locale.curly_brace().to_string()
    } else if msg.contains("identifier") {
        locale.bad_identifier().to_string()
    } else {
        msg.into_owned()
    }
}

/// 原始错误 -> SyntaxError
pub fn translate_parse_error(raw: &str, source: &str, locale: Locale) -> SyntaxError {
    let (line, column) = extract_location(raw);
    let code = source_line(source, line).map(|l| l.trim().to_string());

    SyntaxError {
        line,
        column,
        message: format_error_message(raw, locale),
        code,
    }
}
