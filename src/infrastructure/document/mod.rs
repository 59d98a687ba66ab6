// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 文档生成
pub mod wkhtmltopdf;

pub use wkhtmltopdf::WkhtmltopdfDocumentRepository;
