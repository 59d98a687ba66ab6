// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram, Unit};

/// 注册指标说明
///
/// 计数由统计观察者写入；没有安装记录器时这些调用什么也不做。
pub fn describe_metrics() {
    describe_counter!("redcrawl_issues_total", "Total number of issues started");
    describe_counter!(
        "redcrawl_issues_succeeded_total",
        "Total number of issues processed successfully"
    );
    describe_counter!(
        "redcrawl_issues_failed_total",
        "Total number of issues that failed"
    );
    describe_counter!(
        "redcrawl_attachments_downloaded_total",
        "Total number of attachments saved to disk"
    );
    describe_counter!(
        "redcrawl_attachment_bytes_total",
        Unit::Bytes,
        "Total attachment bytes saved to disk"
    );
    describe_counter!(
        "redcrawl_documents_generated_total",
        "Total number of PDF documents generated"
    );
    describe_histogram!(
        "redcrawl_session_duration_seconds",
        Unit::Seconds,
        "Duration of crawl sessions in seconds"
    );
}
