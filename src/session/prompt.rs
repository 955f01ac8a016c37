//! System prompt composition

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::debugger::DebugSession;

/// Placed between the system prompt and the first user turn of a handle
pub const PROMPT_SEPARATOR: &str = "\n\n---\n\n";

/// Base instructions for the debugging assistant
pub const BASE_PROMPT: &str = r#"You are a debugging assistant attached to a live debugger session. The target may be a running process, a crash dump or a kernel session.

Your only way to observe the target is the dbg_exec tool. It runs one debugger command exactly as if the operator typed it at the prompt and returns the captured output.

Ground every statement in command output. Do not guess at memory contents, register values or call stacks; run the command that shows them.

## Working method
1. Establish the current state first (exception record, faulting thread, loaded modules).
2. Use the debugger's own expression evaluator for arithmetic and address math.
3. Inspect registers, memory and locals that bear on the question.
4. Follow the evidence with further commands until the cause is clear.
5. Summarize what you found and which commands showed it.

Keep answers short. Show the reasoning that connects the evidence."#;

/// Live facts about the debugging session injected into the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    pub target_name: String,
    pub target_arch: String,
    pub debugger_type: String,
    pub cwd: String,
    /// Session start, ISO 8601 local time
    pub timestamp: String,
    pub platform: String,
}

impl RuntimeContext {
    /// Gather context from the debugger, stamped with `started`
    pub fn gather(dbg: &dyn DebugSession, started: DateTime<Local>) -> Self {
        Self {
            target_name: dbg.target_name(),
            target_arch: dbg.architecture(),
            debugger_type: dbg.debugger_type(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            timestamp: started.format("%Y-%m-%dT%H:%M:%S").to_string(),
            platform: platform_name().to_string(),
        }
    }

    /// Any field set
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.fields().any(|(_, v)| !v.is_empty())
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Target", self.target_name.as_str()),
            ("Architecture", self.target_arch.as_str()),
            ("Debugger", self.debugger_type.as_str()),
            ("Working Directory", self.cwd.as_str()),
            ("Session Started", self.timestamp.as_str()),
            ("Platform", self.platform.as_str()),
        ]
        .into_iter()
    }

    /// Render as a `## Session Context` prompt section, non-empty fields only
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("\n\n## Session Context\n");
        for (label, value) in self.fields().filter(|(_, v)| !v.is_empty()) {
            let _ = writeln!(out, "- {label}: {value}");
        }
        out
    }
}

/// Base prompt + runtime context + custom prompt
#[must_use]
pub fn full_system_prompt(custom: &str, ctx: Option<&RuntimeContext>) -> String {
    let mut prompt = BASE_PROMPT.to_string();
    if let Some(ctx) = ctx
        && ctx.has_content()
    {
        prompt.push_str(&ctx.render());
    }
    if !custom.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(custom);
    }
    prompt
}

/// Outbound message for a turn: the prompt is prepended only on the first
/// turn of a handle
#[must_use]
pub fn compose_message(system_prompt: &str, primed: bool, text: &str) -> String {
    if primed || system_prompt.is_empty() {
        text.to_string()
    } else {
        format!("{system_prompt}{PROMPT_SEPARATOR}{text}")
    }
}

fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "linux" => "Linux",
        "macos" => "macOS",
        other => other,
    }
}

