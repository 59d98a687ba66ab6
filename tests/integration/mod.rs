// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod event_stream_test;
pub mod helpers;
pub mod redmine_pipeline_test;
pub mod session_workflow_test;
