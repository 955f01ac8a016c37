//! Tests for the `!agent` command surface

mod common;

use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{AgentWorld, Channel, CountingStore, MockDebugger, MockFactory};
use dbg_agent::client::BridgeClient;
use dbg_agent::{
    AgentError, AgentHost, DebugSession, ExecutorConfig, FrontendKind, Provider, SessionStore,
    SettingsStore, StopReason,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    dbg: Rc<MockDebugger>,
    world: Rc<AgentWorld>,
    settings: SettingsStore,
    host: AgentHost,
}

fn fixture() -> Fixture {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let settings = SettingsStore::new(dir.path().join("settings.json"));
    let dbg = MockDebugger::new("app.exe");
    let (factory, world) = MockFactory::new();
    let debugger: Rc<dyn DebugSession> = dbg.clone();
    let store: Arc<dyn SessionStore> = Arc::new(CountingStore::default());
    let host = AgentHost::new(debugger, factory, settings.clone(), store).with_executor_config(
        ExecutorConfig {
            poll_interval: Duration::from_millis(10),
            idle_timeout: Some(Duration::from_secs(20)),
        },
    );
    Fixture {
        _dir: dir,
        dbg,
        world,
        settings,
        host,
    }
}

#[test]
fn test_help_shows_provider_and_context() {
    let mut f = fixture();
    f.host.run("help").unwrap();

    let out = f.dbg.text(Channel::Plain);
    assert!(out.contains("Usage: !agent <command> [args]"));
    assert!(out.contains("Current provider: copilot\n"));
    assert!(out.contains("Session context:"));
    assert!(out.contains("app.exe"));

    f.dbg.clear_output();
    f.host.run("").unwrap();
    assert!(f.dbg.text(Channel::Plain).contains("Usage:"));
}

#[test]
fn test_version() {
    let mut f = fixture();
    f.host.run("version").unwrap();
    assert!(
        f.dbg
            .text(Channel::Plain)
            .contains(&format!("dbg-agent v{}", dbg_agent::VERSION))
    );

    f.dbg.clear_output();
    f.host.run("prompt Check heap corruption first.").unwrap();
    f.dbg.clear_output();
    f.host.run("version prompt").unwrap();
    let out = f.dbg.text(Channel::Plain);
    assert!(out.contains("=== System Prompt ==="));
    assert!(out.contains(dbg_agent::session::BASE_PROMPT));
    assert!(out.contains("=== Custom Prompt (additive) ===\n\nCheck heap corruption first."));
}

#[test]
fn test_unknown_subcommand() {
    let mut f = fixture();
    let err = f.host.run("frobnicate").unwrap_err();
    assert!(matches!(err, AgentError::InvalidConfig(_)));
    assert!(f.dbg.text(Channel::Plain).contains("!agent help"));
    assert!(f.dbg.text(Channel::Error).contains("Unknown subcommand: frobnicate"));
}

#[test]
fn test_provider_command() {
    let mut f = fixture();
    f.host.run("provider").unwrap();
    let out = f.dbg.text(Channel::Plain);
    assert!(out.contains("Current provider: copilot"));
    assert!(out.contains("claude   - Claude Code (Anthropic)"));

    f.host.run("provider claude").unwrap();
    assert_eq!(f.settings.load().unwrap().default_provider, Provider::Claude);
    assert!(
        f.dbg
            .text(Channel::Plain)
            .contains("Provider set to: claude (saved to settings)")
    );

    assert!(f.host.run("provider gemini").is_err());
    assert_eq!(f.settings.load().unwrap().default_provider, Provider::Claude);
}

#[test]
fn test_provider_switch_resets_live_agent() {
    let mut f = fixture();
    f.host.run("ask first question").unwrap();
    assert!(f.host.session().is_initialized());

    f.host.run("provider claude").unwrap();
    assert!(!f.host.session().is_initialized());

    f.host.run("ask second question").unwrap();
    assert_eq!(
        f.world.record.borrow().created,
        vec![Provider::Copilot, Provider::Claude]
    );
}

#[test]
fn test_prompt_command() {
    let mut f = fixture();
    f.host.run("prompt").unwrap();
    assert!(f.dbg.text(Channel::Plain).contains("No custom prompt set."));

    f.host.run("prompt Focus on the faulting thread.").unwrap();
    assert_eq!(
        f.settings.load().unwrap().custom_prompt,
        "Focus on the faulting thread."
    );

    f.dbg.clear_output();
    f.host.run("prompt").unwrap();
    assert!(
        f.dbg
            .text(Channel::Plain)
            .contains("Custom prompt:\nFocus on the faulting thread.")
    );

    f.host.run("prompt clear").unwrap();
    assert!(f.settings.load().unwrap().custom_prompt.is_empty());
}

#[test]
fn test_timeout_command() {
    let mut f = fixture();
    f.host.run("timeout").unwrap();
    assert!(f.dbg.text(Channel::Plain).contains("Response timeout: 2 minutes"));

    assert!(f.host.run("timeout 500").is_err());
    assert!(f.host.run("timeout soon").is_err());
    assert_eq!(f.settings.load().unwrap().response_timeout_ms, 120_000);

    f.host.run("timeout 30000").unwrap();
    assert_eq!(f.settings.load().unwrap().response_timeout_ms, 30_000);
    assert!(f.dbg.text(Channel::Plain).contains("Timeout set to 30 seconds."));
}

#[test]
fn test_byok_command() {
    let mut f = fixture();
    f.host.run("byok").unwrap();
    assert!(f.dbg.text(Channel::Plain).contains("(not configured)"));

    f.host.run("byok enable").unwrap();
    assert!(f.dbg.text(Channel::Warning).contains("API key not set"));

    assert!(f.host.run("byok key").is_err());
    f.host.run("byok key sk-live-123").unwrap();
    f.host.run("byok model gpt-4.1").unwrap();
    f.host.run("byok type openai").unwrap();
    f.host.run("byok endpoint").unwrap();

    let settings = f.settings.load().unwrap();
    let byok = settings.byok().unwrap();
    assert!(byok.enabled);
    assert_eq!(byok.api_key, "sk-live-123");
    assert_eq!(byok.model, "gpt-4.1");
    assert_eq!(byok.provider_type, "openai");
    assert!(byok.base_url.is_empty());

    f.dbg.clear_output();
    f.host.run("byok").unwrap();
    let out = f.dbg.text(Channel::Plain);
    assert!(out.contains("API Key:  ********"));
    assert!(out.contains("Usable:   yes"));
    assert!(!out.contains("sk-live-123"));

    assert!(f.host.run("byok rotate").is_err());

    // The next ask hands the key to the agent
    f.host.run("ask hello").unwrap();
    assert_eq!(f.world.record.borrow().byok[0].api_key, "sk-live-123");
}

#[test]
fn test_settings_edited_while_serving_apply_on_next_ask() {
    let mut f = fixture();
    f.host.ask("first").unwrap();

    // Another process enables BYOK in settings.json
    let mut settings = f.settings.load().unwrap();
    settings.byok_mut().enabled = true;
    settings.byok_mut().api_key = "sk-from-cli".to_string();
    f.settings.save(&settings).unwrap();

    f.host.ask("second").unwrap();
    {
        let record = f.world.record.borrow();
        assert_eq!(record.created.len(), 2);
        assert_eq!(record.byok.len(), 1);
        assert_eq!(record.byok[0].api_key, "sk-from-cli");
    }

    settings.byok_mut().enabled = false;
    f.settings.save(&settings).unwrap();

    f.host.ask("third").unwrap();
    let record = f.world.record.borrow();
    assert_eq!(record.created.len(), 3);
    assert_eq!(record.shutdowns, 2);
    assert_eq!(record.byok.len(), 1);
}

#[test]
fn test_ask_streams_to_debugger() {
    let mut f = fixture();
    f.world.script.borrow_mut().reply = "A null pointer was dereferenced.".to_string();

    f.host.ai("why did it crash?").unwrap();

    let thinking = f.dbg.text(Channel::Thinking);
    assert!(thinking.contains("[mock-copilot] Asking: why did it crash?"));
    assert!(thinking.contains("Initializing mock-copilot provider..."));
    assert_eq!(
        f.dbg.text(Channel::Response),
        "A null pointer was dereferenced."
    );

    // The handle is reused for the next question
    f.dbg.clear_output();
    f.host.run("ask and now?").unwrap();
    assert!(!f.dbg.text(Channel::Thinking).contains("Initializing"));
    assert_eq!(f.world.record.borrow().created.len(), 1);
}

#[test]
fn test_ask_requires_question() {
    let mut f = fixture();
    assert!(f.host.run("ask").is_err());
    assert!(f.dbg.text(Channel::Plain).contains("Usage: !agent ask <question>"));
    assert!(f.world.record.borrow().created.is_empty());
}

#[test]
fn test_ask_reports_init_failure() {
    let mut f = fixture();
    f.world.script.borrow_mut().fail_init = Some("not signed in".to_string());

    let err = f.host.run("ask hello").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to initialize: mock-copilot - not signed in"
    );
    assert!(f.dbg.text(Channel::Error).contains("not signed in"));
    assert!(!f.host.session().is_initialized());
}

#[test]
fn test_ask_interrupted_prints_aborted() {
    let mut f = fixture();
    f.world.script.borrow_mut().tool_call = Some("kb".to_string());
    f.dbg.interrupt_on_exec.set(true);

    f.host.run("ask show me the stack").unwrap();
    assert!(f.dbg.text(Channel::Warning).contains("Aborted."));
}

#[test]
fn test_clear_command() {
    let mut f = fixture();
    f.world.script.borrow_mut().issue_session = Some("conv-1".to_string());
    f.host.run("ask hello").unwrap();
    assert!(f.host.session().session_id().is_some());

    f.host.run("clear").unwrap();
    assert!(f.host.session().session_id().is_none());
    assert!(
        f.dbg
            .text(Channel::Plain)
            .contains("Conversation history cleared")
    );
}

#[test]
fn test_serve_http_until_client_shutdown() {
    let mut f = fixture();
    let lines = f.dbg.tap();

    let client = thread::spawn(move || {
        let url = lines
            .iter()
            .find_map(|text| {
                text.lines()
                    .find_map(|line| line.strip_prefix("URL: ").map(str::to_string))
            })
            .unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let client = BridgeClient::new(url).unwrap();
            let exec = client.exec("kb").await.unwrap();
            let ask = client.ask("what is waiting?").await.unwrap();
            let status = client.shutdown().await.unwrap();
            (exec, ask, status)
        })
    });

    let report = f.host.serve(FrontendKind::Http, "").unwrap().unwrap();
    let (exec, ask, status) = client.join().unwrap();

    assert_eq!(report.reason, StopReason::Stopped);
    assert_eq!(report.executed, 2);
    assert!(exec.contains("ntdll!NtWaitForSingleObject"));
    assert!(ask.starts_with("answer to: "));
    assert_eq!(status, "stopping");

    let out = f.dbg.text(Channel::Plain);
    assert!(out.contains("HTTP SERVER ACTIVE"));
    assert!(out.contains("Target: app.exe (PID 4242)"));
    assert!(out.contains("Press Ctrl+C to stop HTTP server."));
    assert!(out.contains("HTTP server stopped."));
}

#[test]
fn test_serve_stops_on_debugger_interrupt() {
    let mut f = fixture();
    f.dbg.interrupted.set(true);

    let report = f.host.serve(FrontendKind::Mcp, "127.0.0.1").unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Interrupted);
    assert!(f.dbg.text(Channel::Plain).contains("MCP server stopped."));
}

#[test]
fn test_serve_warns_on_public_bind() {
    let mut f = fixture();
    f.dbg.interrupted.set(true);

    f.host.run("http 0.0.0.0").unwrap();
    assert!(
        f.dbg
            .text(Channel::Warning)
            .contains("WARNING: Binding to non-loopback address '0.0.0.0'")
    );

    assert!(f.host.run("http not-an-address").is_err());
}
