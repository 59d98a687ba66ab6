// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::settings::RedmineSettings;

/// 重试策略配置
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含第一次尝试）
    pub max_retries: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// 从 Redmine 连接配置创建
    pub fn from_settings(settings: &RedmineSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: settings.retry_delay(),
            ..Self::default()
        }
    }

    /// 不重试的策略
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// 计算第 `attempt` 次重试前的退避时间（从 1 开始）
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let backoff_secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());

        let jitter_range = capped * self.jitter_factor;
        let jittered = if jitter_range > 0.0 {
            (capped + rand::random_range(-jitter_range..jitter_range)).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }

    /// 是否应该重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 执行操作，遇到可重试的错误时按退避时间重试
    ///
    /// # 参数
    ///
    /// * `operation` - 每次尝试调用一次的操作
    /// * `is_retryable` - 判断错误是否值得重试
    pub async fn retry<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) && is_retryable(&e) => {
                    attempt += 1;
                    let backoff = self.calculate_backoff(attempt);
                    debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "Retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
