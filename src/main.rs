// sshwho - SSH 公钥清单与登录日志关联
// 应用入口

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

mod constants;
mod error;
mod models;
mod services;
mod ssh;

use constants::{env, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_KEY_PATH};
use models::{AppConfig, CorrelationOptions, ParseStrategy, RemoteSettings};
use services::{actions, storage};

/// Attribute SSH logins to known public keys
#[derive(Parser)]
#[command(name = "sshwho", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 清单相关路径
#[derive(Args)]
struct PathArgs {
    /// Key path as directory or file
    #[arg(short = 'k', long = "keys", env = env::KEY_PATH, default_value = DEFAULT_KEY_PATH)]
    key_path: PathBuf,

    /// JSON file where inventory data is cached
    #[arg(short = 'i', long = "inventory", env = env::INVENTORY)]
    inventory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the key inventory
    #[command(visible_alias = "inventory")]
    Inv {
        #[command(flatten)]
        paths: PathArgs,

        /// JSON output
        #[arg(short = 'j', long)]
        json: bool,

        /// Write the inventory to the cache file
        #[arg(short = 'w', long)]
        write: bool,
    },

    /// Attribute accepted logins from an auth log
    #[command(visible_alias = "a")]
    Analyze {
        #[command(flatten)]
        paths: PathArgs,

        /// Auth log file path to analyze
        #[arg(short = 'f', long = "file")]
        file: String,

        /// SSH connection string to a remote server: [user@]host[:port]
        #[arg(short = 's', long)]
        server: Option<String>,

        /// Private key for the remote server (default: ssh-agent)
        #[arg(long, requires = "server")]
        identity_file: Option<PathBuf>,

        /// Expected SHA256 fingerprint of the remote host key
        #[arg(long, requires = "server")]
        host_fingerprint: Option<String>,

        /// Log line parsing strategy
        #[arg(long, value_enum, default_value_t = ParseStrategy::Pattern)]
        strategy: ParseStrategy,

        /// Also report logins whose key is not in the inventory
        #[arg(long)]
        report_unmatched: bool,

        /// Collapse identical attribution lines for one login
        #[arg(long)]
        dedup: bool,

        /// Remote command timeout in seconds
        #[arg(long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Show where the inventory cache lives and whether it exists
    Info {
        #[command(flatten)]
        paths: PathArgs,
    },
}

impl PathArgs {
    /// 构建基础配置
    fn into_config(self) -> AppConfig {
        AppConfig {
            key_path: self.key_path,
            inventory_path: self
                .inventory
                .unwrap_or_else(storage::default_inventory_path),
            ..AppConfig::default()
        }
    }
}

fn main() -> ExitCode {
    // 初始化日志系统
    // 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug sshwho analyze -f ...
    // 日志输出到 stderr，stdout 只保留结果
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("sshwho: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Vec<String>> {
    match cli.command {
        Commands::Inv { paths, json, write } => {
            let config = AppConfig {
                as_json: json,
                ..paths.into_config()
            };
            actions::process_inventory(&config, write)
        }
        Commands::Analyze {
            paths,
            file,
            server,
            identity_file,
            host_fingerprint,
            strategy,
            report_unmatched,
            dedup,
            timeout,
        } => {
            let config = AppConfig {
                log_file: Some(file),
                remote: server.map(|server| RemoteSettings {
                    server,
                    identity_file,
                    host_fingerprint,
                }),
                strategy,
                correlation: CorrelationOptions {
                    report_unmatched,
                    dedup,
                },
                command_timeout: Duration::from_secs(timeout),
                ..paths.into_config()
            };

            // 单线程运行时，所有操作顺序执行
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("无法创建 Tokio 运行时")?;
            runtime.block_on(actions::process_auth_log(&config))
        }
        Commands::Info { paths } => Ok(actions::process_info(&paths.into_config())),
    }
}
