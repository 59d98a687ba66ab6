// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use redcrawl::application::use_cases::{CrawlSessionService, SessionOptions};
use redcrawl::config::settings::Settings;
use redcrawl::domain::events::EventObserver;
use redcrawl::domain::models::crawl::CrawlRequest;
use redcrawl::domain::services::crawl_validation::IdentifierPolicy;
use redcrawl::infrastructure::build_issue_crawler;
use redcrawl::infrastructure::events::{
    ConsoleObserver, EventBus, LoggingObserver, StatisticsObserver,
};
use redcrawl::infrastructure::observability::metrics::describe_metrics;
use redcrawl::utils::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Redmine Issue 归档工具
#[derive(Debug, Parser)]
#[command(name = "redcrawl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 爬取 Issue 页面、附件并生成 PDF
    Crawl {
        /// Issue 编号，也可以用逗号分隔
        #[arg(required = true, value_name = "IDS")]
        ids: Vec<String>,

        /// 输出目录，默认使用 `paths.output_dir`
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// `_redmine_session` cookie
        #[arg(long, env = "REDMINE_SESSION_COOKIE", hide_env_values = true)]
        cookie: Option<String>,

        /// 两个 Issue 之间的等待时间（毫秒）
        #[arg(long)]
        delay_ms: Option<u64>,

        /// 只接受数字编号
        #[arg(long)]
        strict: bool,

        /// 额外的配置文件
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 不输出事件行
        #[arg(short, long)]
        quiet: bool,
    },
    /// 检查配置
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// 主函数
///
/// 全部成功时退出码为 0，否则为 1
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ok = match cli.command {
        Command::Crawl {
            ids,
            output,
            cookie,
            delay_ms,
            strict,
            config,
            quiet,
        } => {
            let args = CrawlArgs {
                ids: split_ids(&ids),
                output,
                cookie,
                delay_ms,
                strict,
                quiet,
            };
            crawl(config, args).await?
        }
        Command::CheckConfig { config } => check_config(config)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

struct CrawlArgs {
    ids: Vec<String>,
    output: Option<PathBuf>,
    cookie: Option<String>,
    delay_ms: Option<u64>,
    strict: bool,
    quiet: bool,
}

async fn crawl(config: Option<PathBuf>, args: CrawlArgs) -> anyhow::Result<bool> {
    let settings = Settings::load(config.as_deref())?;

    // guard 在函数返回时刷新文件日志
    let _guard = telemetry::init_telemetry(&settings.log, &settings.log_directory())?;
    describe_metrics();
    info!("Starting redcrawl...");

    for problem in settings.validate_configuration() {
        warn!(problem = %problem, "Configuration problem");
    }

    // 1. Event bus and observers
    let bus = Arc::new(EventBus::new());
    let statistics = Arc::new(StatisticsObserver::new());
    if !args.quiet {
        bus.subscribe_all(Arc::new(ConsoleObserver::new()));
    }
    bus.subscribe_all(Arc::new(LoggingObserver));
    bus.subscribe_all(statistics.clone() as Arc<dyn EventObserver>);

    // 2. Request, repositories and services
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.paths.output_dir));
    let request = CrawlRequest::new(args.ids, output.clone(), args.cookie.unwrap_or_default())?;
    // 凭据在构建抓取器时绑定，请求为空时回退到配置
    let crawler = Arc::new(build_issue_crawler(
        &settings,
        request.session_cookie(),
        bus.clone(),
    )?);
    let delay = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.redmine.request_delay());
    let session = CrawlSessionService::new(
        crawler,
        bus.clone(),
        SessionOptions {
            request_delay: delay,
            identifier_policy: IdentifierPolicy::from_strict(
                args.strict || settings.crawler.strict_identifiers,
            ),
        },
    );

    // 3. Ctrl-C stops after the current issue
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current issue");
            on_signal.cancel();
        }
    });

    let result = session.crawl_with_cancellation(request, cancel).await?;

    println!();
    println!("{}", result);
    println!("Success rate: {:.1}%", result.success_rate() * 100.0);
    println!("Output: {}", output.display());
    info!(statistics = ?statistics.snapshot(), "Crawl finished");

    Ok(result.is_fully_successful())
}

fn check_config(config: Option<PathBuf>) -> anyhow::Result<bool> {
    let settings = Settings::load(config.as_deref())?;
    let problems = settings.validate_configuration();
    if problems.is_empty() {
        println!("Configuration OK");
        return Ok(true);
    }
    for problem in &problems {
        println!("- {}", problem);
    }
    Ok(false)
}

/// 展开逗号分隔的编号，去掉空项
fn split_ids(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|arg| arg.split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ids() {
        let raw = vec!["1,2".to_string(), " 3 ".to_string(), "4,,5,".to_string()];
        assert_eq!(split_ids(&raw), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_cli_parses_crawl() {
        let cli = Cli::try_parse_from([
            "redcrawl", "crawl", "1,2", "3", "--output", "out", "--delay-ms", "0", "--strict",
        ])
        .unwrap();
        match cli.command {
            Command::Crawl {
                ids,
                output,
                delay_ms,
                strict,
                quiet,
                ..
            } => {
                assert_eq!(split_ids(&ids), vec!["1", "2", "3"]);
                assert_eq!(output, Some(PathBuf::from("out")));
                assert_eq!(delay_ms, Some(0));
                assert!(strict);
                assert!(!quiet);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_ids() {
        assert!(Cli::try_parse_from(["redcrawl", "crawl"]).is_err());
    }
}
