// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime command resolution for the subprocess LLM adapter.

use drover_adapters::ProcessLlmAdapter;

/// Env var naming the runtime executable.
pub const RUNTIME_ENV: &str = "DROVER_RUNTIME";
/// Env var carrying extra runtime arguments (whitespace-separated).
pub const RUNTIME_ARGS_ENV: &str = "DROVER_RUNTIME_ARGS";

const DEFAULT_RUNTIME: &str = "claude";
const DEFAULT_ARGS: &[&str] = &["-p", "--output-format", "stream-json", "--verbose"];

/// Build the subprocess adapter from the environment.
///
/// Defaults to the `claude` CLI in stream-JSON mode; `DROVER_RUNTIME` and
/// `DROVER_RUNTIME_ARGS` override the program and its base arguments.
pub fn adapter_from_env() -> ProcessLlmAdapter {
    let program =
        std::env::var(RUNTIME_ENV).unwrap_or_else(|_| DEFAULT_RUNTIME.to_string());
    let args = match std::env::var(RUNTIME_ARGS_ENV) {
        Ok(raw) => raw.split_whitespace().map(String::from).collect(),
        Err(_) => DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
    };
    ProcessLlmAdapter::new(program, args)
}
