// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::settings::LogSettings;

/// 初始化日志
///
/// `RUST_LOG` 优先，否则使用 `log.level`。文件日志按天滚动写到 `log_dir` 下；
/// 返回的 guard 必须保持到进程结束，否则缓冲中的日志会丢失。
pub fn init_telemetry(settings: &LogSettings, log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let default_filter = format!("{},redcrawl={}", settings.level, settings.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_appender = tracing_appender::rolling::daily(log_dir, &settings.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer);

    let console_layer = settings
        .console_output
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
