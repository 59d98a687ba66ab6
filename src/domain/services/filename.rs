// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 清理后为空时使用的文件名
pub const PLACEHOLDER_NAME: &str = "unnamed_file";

/// 文档基础名的最大字符数
pub const MAX_TITLE_CHARS: usize = 100;

const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_illegal(c: char) -> bool {
    ILLEGAL_CHARS.contains(&c) || c.is_control()
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '.')
}

/// 清理文件名
///
/// 把 `< > : " / \ | ? *` 和控制字符替换为 `_`，去掉首尾的空格和点，
/// 没有任何可保留字符（全是非法字符、空格或点）时返回 [`PLACEHOLDER_NAME`]。幂等。
pub fn sanitize_filename(name: &str) -> String {
    if !name.chars().any(|c| !is_illegal(c) && c != ' ' && c != '.') {
        return PLACEHOLDER_NAME.to_string();
    }

    let replaced: String = name
        .chars()
        .map(|c| if is_illegal(c) { '_' } else { c })
        .collect();

    let trimmed = trim_edges(&replaced);
    if trimmed.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// 清理文档标题，并截断到 [`MAX_TITLE_CHARS`] 个字符
///
/// 截断后再去一次首尾空格和点，保证结果仍然幂等。
pub fn sanitize_title(title: &str) -> String {
    let cleaned = sanitize_filename(title);
    if cleaned.chars().count() <= MAX_TITLE_CHARS {
        return cleaned;
    }

    let truncated: String = cleaned.chars().take(MAX_TITLE_CHARS).collect();
    let trimmed = trim_edges(&truncated);
    if trimmed.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// 文档文件名：`<id>_<标题>.pdf`，没有标题时为 `issue_<id>.pdf`
pub fn document_file_name(issue_id: &str, title: &str) -> String {
    if title.trim().is_empty() {
        format!("issue_{}.pdf", sanitize_filename(issue_id))
    } else {
        format!("{}_{}.pdf", sanitize_filename(issue_id), sanitize_title(title))
    }
}
