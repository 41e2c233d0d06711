//! Java 作业静态检查
//!
//! 按练习配置检查学生的 Java 源码：语法、必需的类/方法、禁用的语法元素、
//! 变量作用域、方法长度与圈复杂度；并支持批量解压、评分 ZIP 提交。

pub mod analyzer;
pub mod config;
pub mod diagnostics;
pub mod grading;
pub mod parser;
pub mod render;
pub mod report;
pub mod rules;
pub mod submissions;
pub mod symbol_table;
pub mod walk;
