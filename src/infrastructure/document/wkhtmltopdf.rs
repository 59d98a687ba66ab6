// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::settings::PdfSettings;
use crate::domain::models::issue::Issue;
use crate::domain::repositories::{DocumentRepository, RepositoryError};

/// 使用 wkhtmltopdf 的文档仓库
///
/// Issue 的原始 HTML 通过标准输入交给转换程序，站内的 `href="/` 和 `src="/`
/// 先改写为站点绝对地址。输出文件存在且非空才算成功。
pub struct WkhtmltopdfDocumentRepository {
    program: PathBuf,
    args: Vec<String>,
    base_url: String,
}

impl WkhtmltopdfDocumentRepository {
    pub fn new(settings: &PdfSettings, base_url: &str) -> Self {
        let program = settings
            .resolve_wkhtmltopdf()
            .unwrap_or_else(|| PathBuf::from(&settings.wkhtmltopdf_path));
        Self::with_program(program, settings.wkhtmltopdf_args(), base_url)
    }

    /// 指定转换程序和参数，程序以 `<args> - <output>` 的形式调用
    pub fn with_program(program: impl Into<PathBuf>, args: Vec<String>, base_url: &str) -> Self {
        Self {
            program: program.into(),
            args,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 把站内相对链接改写为绝对地址
    pub fn prepare_html(&self, html: &str) -> String {
        html.replace("href=\"/", &format!("href=\"{}/", self.base_url))
            .replace("src=\"/", &format!("src=\"{}/", self.base_url))
    }

    async fn convert(&self, html: String, destination: &Path) -> Result<(), RepositoryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-")
            .arg(destination)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RepositoryError::Render(format!("cannot start {}: {}", self.program.display(), e))
            })?;

        // 转换程序可能不读完输入就退出，写入错误留到拿到退出状态之后再报告
        let written = match child.stdin.take() {
            Some(mut stdin) => {
                let result = stdin.write_all(html.as_bytes()).await;
                // 关闭标准输入，转换程序才会开始输出
                drop(stdin);
                result
            }
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepositoryError::Render(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| {
            RepositoryError::Render(format!(
                "cannot send input to {}: {}",
                self.program.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl DocumentRepository for WkhtmltopdfDocumentRepository {
    #[instrument(skip(self, issue), fields(issue_id = %issue.id))]
    async fn render(&self, issue: &Issue, destination: &Path) -> Result<u64, RepositoryError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        self.convert(self.prepare_html(&issue.html_content), destination)
            .await?;

        let size = match fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if size == 0 {
            return Err(RepositoryError::Render(format!(
                "no output written to {}",
                destination.display()
            )));
        }

        debug!(path = %destination.display(), size, "Document written");
        Ok(size)
    }
}
