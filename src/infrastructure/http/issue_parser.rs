// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::HttpError;
use crate::domain::models::issue::{Attachment, Issue, IssueId};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M", "%m/%d/%Y %I:%M %p"];

struct Selectors {
    content_h2: Selector,
    subject_h3: Selector,
    h1: Selector,
    description_wiki: Selector,
    description: Selector,
    status: Selector,
    priority: Selector,
    assignee: Selector,
    author: Selector,
    author_dates: Selector,
    attribute: Selector,
    label: Selector,
    value: Selector,
    attachment_link: Selector,
}

fn selector(css: &'static str) -> Result<Selector, HttpError> {
    Selector::parse(css).map_err(|e| HttpError::Parse(format!("selector {:?}: {}", css, e)))
}

impl Selectors {
    fn new() -> Result<Self, HttpError> {
        Ok(Self {
            content_h2: selector("#content h2")?,
            subject_h3: selector("div.subject h3")?,
            h1: selector("h1")?,
            description_wiki: selector("div.description div.wiki")?,
            description: selector("div.description")?,
            status: selector("div.status.attribute .value, span.status")?,
            priority: selector("div.priority.attribute .value, span.priority")?,
            assignee: selector("div.assigned-to.attribute .value, span.assignee")?,
            author: selector("p.author a.user, span.author")?,
            author_dates: selector("p.author a[title]")?,
            attribute: selector("div.attribute")?,
            label: selector(".label")?,
            value: selector(".value")?,
            attachment_link: selector("a.icon.icon-attachment")?,
        })
    }
}

/// Redmine Issue 页面解析器
///
/// 只读取页面结构，不做网络访问。附件的相对链接按 `base_url` 解析。
pub struct IssueParser {
    base_url: Url,
    selectors: Selectors,
}

impl IssueParser {
    pub fn new(base_url: Url) -> Result<Self, HttpError> {
        Ok(Self {
            base_url,
            selectors: Selectors::new()?,
        })
    }

    /// 解析 Issue 页面
    ///
    /// 找不到的字段保持为空，原始 HTML 保存在 `html_content` 中。
    pub fn parse(&self, id: IssueId, html: &str) -> Issue {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let mut issue = Issue::new(id).with_title(self.title(&document));
        issue.description = first_text(&document, &s.description_wiki)
            .or_else(|| first_text(&document, &s.description))
            .unwrap_or_default();
        issue.status = first_text(&document, &s.status).unwrap_or_default();
        issue.priority = first_text(&document, &s.priority).unwrap_or_default();
        issue.assignee = first_text(&document, &s.assignee).unwrap_or_default();
        issue.author = first_text(&document, &s.author).unwrap_or_default();

        let mut dates = document
            .select(&s.author_dates)
            .filter_map(|a| a.value().attr("title"))
            .filter_map(parse_date);
        issue.created_on = dates.next();
        issue.updated_on = dates.next();

        for (name, value) in self.custom_fields(&document) {
            issue.set_custom_field(name, serde_json::Value::String(value));
        }

        for attachment in self.attachments(&document) {
            if !issue.add_attachment(attachment) {
                debug!(issue_id = %issue.id, "Duplicate attachment link ignored");
            }
        }

        issue.html_content = html.to_string();
        issue
    }

    /// `#content h2` 与 `div.subject h3` 用 ` - ` 连接，都没有时退回 `h1`
    fn title(&self, document: &Html) -> String {
        let parts: Vec<String> = [&self.selectors.content_h2, &self.selectors.subject_h3]
            .into_iter()
            .filter_map(|sel| first_text(document, sel))
            .collect();

        if parts.is_empty() {
            first_text(document, &self.selectors.h1).unwrap_or_default()
        } else {
            parts.join(" - ")
        }
    }

    fn custom_fields(&self, document: &Html) -> Vec<(String, String)> {
        document
            .select(&self.selectors.attribute)
            .filter(|el| el.value().classes().any(|c| c.starts_with("cf_")))
            .filter_map(|el| {
                let label = el
                    .select(&self.selectors.label)
                    .next()
                    .map(text_of)?
                    .trim_end_matches(':')
                    .trim()
                    .to_string();
                let value = el
                    .select(&self.selectors.value)
                    .next()
                    .map(text_of)
                    .unwrap_or_default();
                (!label.is_empty()).then_some((label, value))
            })
            .collect()
    }

    fn attachments(&self, document: &Html) -> Vec<Attachment> {
        document
            .select(&self.selectors.attachment_link)
            .filter_map(|link| {
                let filename = text_of(link);
                let href = link.value().attr("href")?;
                let url = self.base_url.join(href).ok()?;
                Attachment::new(filename, url.to_string()).ok()
            })
            .collect()
    }
}

fn text_of(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, sel: &Selector) -> Option<String> {
    document
        .select(sel)
        .map(text_of)
        .find(|text| !text.is_empty())
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .map(|naive| naive.and_utc())
}
