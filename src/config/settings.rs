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

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationErrors};

/// 默认允许下载的附件扩展名
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 22] = [
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".jpg", ".jpeg", ".png", ".gif",
    ".bmp", ".tiff", ".zip", ".rar", ".7z", ".tar", ".gz", ".txt", ".csv", ".xml", ".json",
];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 应用程序配置设置
///
/// 在进程启动时构建一次，按引用传给各个服务。
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Redmine 连接配置
    pub redmine: RedmineSettings,
    /// 输出路径配置
    pub paths: PathSettings,
    /// PDF 生成配置
    pub pdf: PdfSettings,
    /// 附件安全策略
    pub security: SecuritySettings,
    /// 日志配置
    pub log: LogSettings,
    /// 爬取行为配置
    pub crawler: CrawlerSettings,
}

/// Redmine 连接配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedmineSettings {
    /// Redmine 站点根地址
    #[validate(url(message = "must be an absolute URL"))]
    pub base_url: String,
    /// `_redmine_session` cookie 的值，可以为空
    pub session_cookie: String,
    /// 两个 Issue 之间的等待时间（毫秒）
    #[validate(range(max = 600000))]
    pub request_delay_ms: u64,
    /// 单个请求超时时间（秒）
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub user_agent: String,
    /// 瞬时错误的最大重试次数
    #[validate(range(max = 10))]
    pub max_retries: u32,
    /// 重试基础等待时间（毫秒）
    #[validate(range(max = 60000))]
    pub retry_delay_ms: u64,
}

impl RedmineSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// 输出路径配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PathSettings {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub output_dir: String,
    /// 输出目录下的 PDF 子目录
    #[validate(length(min = 1, message = "must not be empty"))]
    pub pdf_dir: String,
    /// 输出目录下的附件子目录
    #[validate(length(min = 1, message = "must not be empty"))]
    pub attachments_dir: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub log_dir: String,
}

/// PDF 生成配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PdfSettings {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub page_size: String,
    pub margin_top: String,
    pub margin_right: String,
    pub margin_bottom: String,
    pub margin_left: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub encoding: String,
    /// 渲染前等待页面脚本的时间（毫秒）
    #[validate(range(max = 60000))]
    pub javascript_delay: u64,
    pub enable_local_file_access: bool,
    pub no_outline: bool,
    /// wkhtmltopdf 可执行文件，可以是绝对路径或 PATH 中的名称
    #[validate(length(min = 1, message = "must not be empty"))]
    pub wkhtmltopdf_path: String,
}

impl PdfSettings {
    /// wkhtmltopdf 的命令行参数，不含输入和输出
    pub fn wkhtmltopdf_args(&self) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--page-size".to_string(),
            self.page_size.clone(),
            "--margin-top".to_string(),
            self.margin_top.clone(),
            "--margin-right".to_string(),
            self.margin_right.clone(),
            "--margin-bottom".to_string(),
            self.margin_bottom.clone(),
            "--margin-left".to_string(),
            self.margin_left.clone(),
            "--encoding".to_string(),
            self.encoding.clone(),
            "--javascript-delay".to_string(),
            self.javascript_delay.to_string(),
        ];
        if self.enable_local_file_access {
            args.push("--enable-local-file-access".to_string());
        }
        if self.no_outline {
            args.push("--no-outline".to_string());
        }
        args
    }

    /// 解析 wkhtmltopdf 的实际位置
    pub fn resolve_wkhtmltopdf(&self) -> Option<PathBuf> {
        let candidate = Path::new(&self.wkhtmltopdf_path);
        if candidate.components().count() > 1 {
            candidate.is_file().then(|| candidate.to_path_buf())
        } else {
            which::which(&self.wkhtmltopdf_path).ok()
        }
    }
}

/// 附件安全策略
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SecuritySettings {
    /// 单个附件的最大字节数
    #[validate(range(min = 1))]
    pub max_file_size: u64,
    #[validate(length(min = 1, message = "must list at least one extension"))]
    pub allowed_file_extensions: Vec<String>,
}

impl SecuritySettings {
    /// 统一成小写并带前导点的扩展名
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_file_extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect()
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogSettings {
    pub level: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub file_name: String,
    pub console_output: bool,
}

/// 爬取行为配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerSettings {
    /// 为 true 时 Issue 编号必须是整数
    pub strict_identifiers: bool,
    /// 为 true 时文档生成失败会使 Issue 失败
    pub require_document: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 按以下顺序叠加配置源：默认值、`config/default`、`config/<APP_ENVIRONMENT>`、
    /// 显式指定的配置文件、`REDCRAWL__SECTION__KEY` 环境变量。`.env` 文件会先被载入环境。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());

        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("REDCRAWL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("security.allowed_file_extensions"),
            )
            .build()?
            .try_deserialize()
    }

    /// 只含默认值的配置构建器
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let extensions: Vec<String> = DEFAULT_ALLOWED_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect();

        Config::builder()
            // Redmine
            .set_default("redmine.base_url", "https://redmine.example.com")?
            .set_default("redmine.session_cookie", "")?
            .set_default("redmine.request_delay_ms", 1000)?
            .set_default("redmine.timeout_secs", 30)?
            .set_default(
                "redmine.user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )?
            .set_default("redmine.max_retries", 3)?
            .set_default("redmine.retry_delay_ms", 2000)?
            // Paths
            .set_default("paths.output_dir", "redmine_output")?
            .set_default("paths.pdf_dir", "pdfs")?
            .set_default("paths.attachments_dir", "attachments")?
            .set_default("paths.log_dir", "logs")?
            // PDF
            .set_default("pdf.page_size", "A4")?
            .set_default("pdf.margin_top", "0.75in")?
            .set_default("pdf.margin_right", "0.75in")?
            .set_default("pdf.margin_bottom", "0.75in")?
            .set_default("pdf.margin_left", "0.75in")?
            .set_default("pdf.encoding", "UTF-8")?
            .set_default("pdf.javascript_delay", 1000)?
            .set_default("pdf.enable_local_file_access", true)?
            .set_default("pdf.no_outline", true)?
            .set_default("pdf.wkhtmltopdf_path", "wkhtmltopdf")?
            // Security
            .set_default("security.max_file_size", 100 * 1024 * 1024)?
            .set_default("security.allowed_file_extensions", extensions)?
            // Log
            .set_default("log.level", "info")?
            .set_default("log.file_name", "redcrawl.log")?
            .set_default("log.console_output", true)?
            // Crawler
            .set_default("crawler.strict_identifiers", false)?
            .set_default("crawler.require_document", false)
    }

    /// 检查配置问题
    ///
    /// # Returns
    ///
    /// 所有问题的描述，空列表表示配置可用
    pub fn validate_configuration(&self) -> Vec<String> {
        let mut problems = Vec::new();
        collect("redmine", self.redmine.validate(), &mut problems);
        collect("paths", self.paths.validate(), &mut problems);
        collect("pdf", self.pdf.validate(), &mut problems);
        collect("security", self.security.validate(), &mut problems);
        collect("log", self.log.validate(), &mut problems);

        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            problems.push(format!("log.level: unknown level {:?}", self.log.level));
        }

        if self.pdf.resolve_wkhtmltopdf().is_none() {
            problems.push(format!(
                "pdf.wkhtmltopdf_path: executable not found: {}",
                self.pdf.wkhtmltopdf_path
            ));
        }

        problems
    }

    /// 输出根目录下的日志目录
    pub fn log_directory(&self) -> PathBuf {
        PathBuf::from(&self.paths.log_dir)
    }
}

fn collect(section: &str, result: Result<(), ValidationErrors>, problems: &mut Vec<String>) {
    let Err(errors) = result else {
        return;
    };

    let mut found: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed `{}` check", e.code));
                format!("{}.{}: {}", section, field, detail)
            })
        })
        .collect();
    // field_errors 是 HashMap，排序后输出稳定
    found.sort();
    problems.extend(found);
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
