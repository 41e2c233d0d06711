mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use java_grader::config::DEFAULT_CONFIG_DIR;
use java_grader::diagnostics::Locale;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Java Assignment Grader
///
/// 对学生提交的 Java 源码执行语法与结构检查，默认输出 Markdown
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// 练习配置目录 (每个练习一个 `<id>.json`)
    #[arg(long, default_value = DEFAULT_CONFIG_DIR, global = true)]
    config_dir: PathBuf,

    /// 语法错误消息语言: en, fr
    #[arg(long, default_value = "en", global = true)]
    locale: Locale,

    /// 输出 JSON 格式 (默认输出人类可读的 Markdown)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 🔍 单文件分析
    Analyze {
        /// Java 文件路径
        #[arg(short, long)]
        file: PathBuf,

        /// 练习 ID
        #[arg(short, long)]
        exercise: String,
    },

    /// 📋 批量评分 - 解压目录下所有学生 ZIP 并分析
    Grade {
        /// 提交目录
        #[arg(short, long)]
        path: PathBuf,

        /// 练习 ID
        #[arg(short, long)]
        exercise: String,

        /// 解压目录 (默认 `<path>/extracted`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 📚 列出所有练习
    Exercises,

    /// ⚙️ 显示 (并校验) 一个练习配置
    ShowConfig {
        /// 练习 ID
        #[arg(short, long)]
        exercise: String,
    },
}

/// 全局选项 (传给命令处理)
#[derive(Debug, Clone)]
pub struct Options {
    pub config_dir: PathBuf,
    pub locale: Locale,
    pub json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志 (stdout 只输出报告)
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let options = Options {
        config_dir: args.config_dir,
        locale: args.locale,
        json: args.json,
    };
    cli::handle_command(args.command, &options)
}
