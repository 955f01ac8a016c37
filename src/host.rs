//! Debugger-side command surface
//!
//! [`AgentHost`] is what a debugger extension wires its `!agent` and `!ai`
//! commands to. It owns the session manager and, for `http`/`mcp`, turns the
//! calling thread into the executor for a frontend until the operator breaks
//! in or a client requests shutdown.

use std::rc::Rc;
use std::sync::Arc;

use crate::agent::{AgentFactory, Provider};
use crate::debugger::DebugSession;
use crate::error::{AgentError, Result};
use crate::frontend::{
    FrontendKind, FrontendServer, format_http_info, format_mcp_info, parse_bind_addr,
};
use crate::handoff::{CommandHandler, ExecutorConfig, ExecutorLoop, ExecutorReport, HandoffQueue};
use crate::session::{ABORTED, AgentSessionManager, BASE_PROMPT, Ensured, SessionStore};
use crate::settings::{Settings, SettingsStore, format_duration};

/// Entry point for the `!agent` command family
pub struct AgentHost {
    debugger: Rc<dyn DebugSession>,
    settings: SettingsStore,
    session: AgentSessionManager,
    executor: ExecutorConfig,
    frontend: Option<FrontendServer>,
}

impl AgentHost {
    pub fn new(
        debugger: Rc<dyn DebugSession>,
        factory: Box<dyn AgentFactory>,
        settings: SettingsStore,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let session = AgentSessionManager::new(factory, store, Rc::clone(&debugger));
        Self {
            debugger,
            settings,
            session,
            executor: ExecutorConfig::default(),
            frontend: None,
        }
    }

    /// Executor tuning for `http`/`mcp`
    #[must_use]
    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = config;
        self
    }

    #[must_use]
    pub fn session(&self) -> &AgentSessionManager {
        &self.session
    }

    /// `!agent <args>`
    ///
    /// Output goes to the debugger; errors are also printed there before being
    /// returned.
    ///
    /// # Errors
    /// Returns the failure of the dispatched subcommand
    pub fn run(&mut self, args: &str) -> Result<()> {
        let result = self.dispatch(args);
        if let Err(e) = &result {
            self.debugger.output_error(&format!("{e}\n"));
        }
        result
    }

    /// `!ai <question>`, shorthand for `!agent ask`
    ///
    /// # Errors
    /// Returns the failure of the ask
    pub fn ai(&mut self, question: &str) -> Result<()> {
        self.run(&format!("ask {question}"))
    }

    /// Reconcile the session with current settings and target, then ask
    ///
    /// # Errors
    /// Returns error if the agent cannot be initialized or the turn fails
    pub fn ask(&mut self, question: &str) -> Result<String> {
        self.ensure_agent()?;
        self.session.ask(question)
    }

    fn ensure_agent(&mut self) -> Result<Ensured> {
        let settings = self.settings.load_or_default();
        let target = self.debugger.target_id();
        self.session.ensure(&target, &settings)
    }

    fn dispatch(&mut self, args: &str) -> Result<()> {
        let (subcmd, rest) = split_command(args);
        match subcmd {
            "" | "help" => self.cmd_help(),
            "version" => self.cmd_version(rest),
            "ask" => self.cmd_ask(rest),
            "clear" => self.cmd_clear(),
            "provider" => self.cmd_provider(rest),
            "prompt" => self.cmd_prompt(rest),
            "timeout" => self.cmd_timeout(rest),
            "byok" => self.cmd_byok(rest),
            "http" => self.serve(FrontendKind::Http, rest).map(|_| ()),
            "mcp" => self.serve(FrontendKind::Mcp, rest).map(|_| ()),
            other => {
                self.out("Use '!agent help' for usage information.\n");
                Err(AgentError::invalid_config(format!("Unknown subcommand: {other}")))
            }
        }
    }

    fn out(&self, text: &str) {
        self.debugger.output(text);
    }

    fn load_settings(&self) -> Result<Settings> {
        self.settings.load()
    }

    // ------------------------------------------------------------------------
    // Informational commands
    // ------------------------------------------------------------------------

    fn cmd_help(&mut self) -> Result<()> {
        let settings = self.load_settings()?;
        self.out(HELP_TEXT);
        self.out(&format!(
            "\nCurrent provider: {}{}\n",
            settings.default_provider,
            if settings.byok_active() { " (BYOK enabled)" } else { "" }
        ));

        let ctx = self.session.runtime_context();
        self.out("\nSession context:\n");
        for (label, value) in [
            ("Target", &ctx.target_name),
            ("Architecture", &ctx.target_arch),
            ("Debugger", &ctx.debugger_type),
            ("Working dir", &ctx.cwd),
            ("Started", &ctx.timestamp),
            ("Platform", &ctx.platform),
        ] {
            if !value.is_empty() {
                self.out(&format!("  {:<13} {value}\n", format!("{label}:")));
            }
        }
        Ok(())
    }

    fn cmd_version(&mut self, rest: &str) -> Result<()> {
        let settings = self.load_settings()?;
        if rest == "prompt" {
            self.out("=== System Prompt ===\n\n");
            self.out(&format!("{BASE_PROMPT}\n"));
            if !settings.custom_prompt.is_empty() {
                self.out("\n=== Custom Prompt (additive) ===\n\n");
                self.out(&format!("{}\n", settings.custom_prompt));
            }
        } else {
            self.out(&format!("dbg-agent v{}\n", crate::VERSION));
            self.out(&format!("Current provider: {}\n", settings.default_provider));
            self.out("\nUse '!agent version prompt' to see the injected system prompt.\n");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Conversation commands
    // ------------------------------------------------------------------------

    fn cmd_ask(&mut self, question: &str) -> Result<()> {
        if question.is_empty() {
            self.out("Usage: !agent ask <question>\n");
            return Err(AgentError::invalid_config("No question provided"));
        }

        let outcome = self.ensure_agent()?;
        let provider = self.session.provider_name().to_string();
        self.debugger
            .output_thinking(&format!("[{provider}] Asking: {question}"));
        if outcome == Ensured::Created {
            self.debugger
                .output_thinking(&format!("Initializing {provider} provider..."));
        }

        let response = self.session.ask(question)?;
        if response == ABORTED {
            self.debugger.output_warning("Aborted.");
        }
        Ok(())
    }

    fn cmd_clear(&mut self) -> Result<()> {
        let settings = self.load_settings()?;
        let target = self.debugger.target_id();
        self.session
            .clear_conversation(&target, settings.default_provider);
        self.out("Conversation history cleared (new session for this target).\n");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Settings commands
    // ------------------------------------------------------------------------

    fn cmd_provider(&mut self, rest: &str) -> Result<()> {
        let mut settings = self.load_settings()?;
        if rest.is_empty() {
            self.out(&format!("Current provider: {}\n", settings.default_provider));
            self.out("\nAvailable providers:\n");
            for provider in Provider::ALL {
                self.out(&format!("  {:<8} - {}\n", provider.name(), provider.description()));
            }
            return Ok(());
        }

        let provider: Provider = match rest.parse() {
            Ok(p) => p,
            Err(e) => {
                self.out("Available providers: claude, copilot\n");
                return Err(e);
            }
        };
        if provider != settings.default_provider {
            settings.default_provider = provider;
            self.settings.save(&settings)?;
            self.session.reset();
        }
        self.out(&format!("Provider set to: {provider} (saved to settings)\n"));
        Ok(())
    }

    fn cmd_prompt(&mut self, rest: &str) -> Result<()> {
        let mut settings = self.load_settings()?;
        match rest {
            "" if settings.custom_prompt.is_empty() => self.out("No custom prompt set.\n"),
            "" => self.out(&format!("Custom prompt:\n{}\n", settings.custom_prompt)),
            "clear" => {
                settings.custom_prompt.clear();
                self.settings.save(&settings)?;
                self.session.set_system_prompt_custom("");
                self.out("Custom prompt cleared.\n");
            }
            text => {
                settings.custom_prompt = text.to_string();
                self.settings.save(&settings)?;
                self.session.set_system_prompt_custom(text);
                self.out("Custom prompt set (saved to settings).\n");
            }
        }
        Ok(())
    }

    fn cmd_timeout(&mut self, rest: &str) -> Result<()> {
        let mut settings = self.load_settings()?;
        if rest.is_empty() {
            self.out(&format!(
                "Response timeout: {}\n",
                format_duration(settings.response_timeout_ms)
            ));
            return Ok(());
        }

        let ms: u64 = rest.parse().map_err(|_| {
            AgentError::invalid_config("Invalid timeout value. Use milliseconds.")
        })?;
        settings.set_response_timeout(ms)?;
        self.settings.save(&settings)?;
        self.session.apply_response_timeout(ms);
        self.out(&format!("Timeout set to {}.\n", format_duration(ms)));
        Ok(())
    }

    fn cmd_byok(&mut self, rest: &str) -> Result<()> {
        let mut settings = self.load_settings()?;
        let provider = settings.default_provider;
        let (subcmd, value) = split_command(rest);

        match subcmd {
            "" => {
                self.out(&format!("BYOK status for provider '{provider}':\n"));
                match settings.byok() {
                    Some(byok) => {
                        let or_default = |s: &str| {
                            if s.is_empty() { "(default)".to_string() } else { s.to_string() }
                        };
                        self.out(&format!("  Enabled:  {}\n", yes_no(byok.enabled)));
                        self.out(&format!(
                            "  API Key:  {}\n",
                            if byok.api_key.is_empty() { "(not set)" } else { "********" }
                        ));
                        self.out(&format!("  Endpoint: {}\n", or_default(&byok.base_url)));
                        self.out(&format!("  Model:    {}\n", or_default(&byok.model)));
                        self.out(&format!("  Type:     {}\n", or_default(&byok.provider_type)));
                        self.out(&format!("  Usable:   {}\n", yes_no(byok.is_usable())));
                    }
                    None => self.out("  (not configured)\n"),
                }
                self.out(BYOK_HELP);
                return Ok(());
            }
            "enable" | "disable" => {
                let enabled = subcmd == "enable";
                settings.byok_mut().enabled = enabled;
                self.settings.save(&settings)?;
                self.session.reset();
                self.out(&format!("BYOK {subcmd}d for provider '{provider}'.\n"));
                if enabled && settings.byok().is_some_and(|b| b.api_key.is_empty()) {
                    self.debugger.output_warning(
                        "Warning: API key not set. Use '!agent byok key <value>' to set it.\n",
                    );
                }
            }
            "key" => {
                if value.is_empty() {
                    self.out("Usage: !agent byok key <value>\n");
                    return Err(AgentError::invalid_config("API key value required."));
                }
                settings.byok_mut().api_key = value.to_string();
                self.settings.save(&settings)?;
                self.session.reset();
                self.out(&format!("BYOK API key set for provider '{provider}'.\n"));
            }
            "endpoint" | "model" | "type" => {
                let byok = settings.byok_mut();
                let field = match subcmd {
                    "endpoint" => &mut byok.base_url,
                    "model" => &mut byok.model,
                    _ => &mut byok.provider_type,
                };
                *field = value.to_string();
                self.settings.save(&settings)?;
                self.session.reset();
                if value.is_empty() {
                    self.out(&format!("BYOK {subcmd} cleared (using default).\n"));
                } else {
                    self.out(&format!("BYOK {subcmd} set to: {value}\n"));
                }
            }
            other => {
                self.out("Use '!agent byok' to see available commands.\n");
                return Err(AgentError::invalid_config(format!(
                    "Unknown byok subcommand: {other}"
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Frontends
    // ------------------------------------------------------------------------

    /// Start a frontend and run the executor loop on this thread until the
    /// debugger is interrupted or a client requests shutdown
    ///
    /// # Errors
    /// Returns error if the bind address is invalid or the frontend cannot start
    pub fn serve(&mut self, kind: FrontendKind, bind: &str) -> Result<Option<ExecutorReport>> {
        if let Some(server) = &self.frontend
            && server.is_running()
        {
            self.out(&format!(
                "{} server already running at {}\n",
                kind_label(server.kind()),
                server.url()
            ));
            return Ok(None);
        }

        let bind = parse_bind_addr(bind)?;
        if !bind.is_loopback() {
            self.debugger.output_warning(&format!(
                "WARNING: Binding to non-loopback address '{bind}'. The server has no authentication.\n"
            ));
        }

        let label = kind_label(kind);
        let queue = Arc::new(HandoffQueue::with_stop_text(format!(
            "Error: {label} server stopped"
        )));
        queue.start();

        let server = match FrontendServer::start(kind, bind, Arc::clone(&queue)) {
            Ok(server) => server,
            Err(e) => {
                queue.stop();
                return Err(e);
            }
        };
        let url = server.url();
        self.frontend = Some(server);

        let target = self.debugger.target_name();
        let pid = self.debugger.process_id();
        let state = self.debugger.target_state();
        let banner = match kind {
            FrontendKind::Http => format_http_info(&target, pid, &state, &url),
            FrontendKind::Mcp => format_mcp_info(&target, pid, &state, &url),
        };
        self.out(&format!("{banner}\n"));
        self.out(&format!("Press Ctrl+C to stop {label} server.\n"));

        let config = self.executor.clone();
        let debugger = Rc::clone(&self.debugger);
        let report = ExecutorLoop::new(&queue)
            .with_config(config)
            .interrupt_check(move || debugger.is_interrupted())
            .run(&mut HostHandler { host: &mut *self });

        queue.stop();
        if let Some(mut server) = self.frontend.take() {
            server.stop();
        }
        self.out(&format!("{label} server stopped.\n"));
        report.map(Some)
    }
}

/// Routes executor dispatches back into the host
struct HostHandler<'a> {
    host: &'a mut AgentHost,
}

impl CommandHandler for HostHandler<'_> {
    fn exec(&mut self, command: &str) -> Result<String> {
        Ok(self.host.debugger.execute(command))
    }

    fn ask(&mut self, query: &str) -> Result<String> {
        self.host.ask(query)
    }
}

impl Drop for AgentHost {
    fn drop(&mut self) {
        if let Some(mut server) = self.frontend.take() {
            server.stop();
        }
        self.session.reset();
    }
}

impl std::fmt::Debug for AgentHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHost")
            .field("settings", &self.settings.path())
            .field("session", &self.session)
            .field("frontend", &self.frontend)
            .finish_non_exhaustive()
    }
}

/// Split `"sub rest of line"` into the subcommand and the trimmed remainder
fn split_command(args: &str) -> (&str, &str) {
    let args = args.trim_start();
    match args.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (args.trim_end(), ""),
    }
}

fn kind_label(kind: FrontendKind) -> &'static str {
    match kind {
        FrontendKind::Http => "HTTP",
        FrontendKind::Mcp => "MCP",
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

const HELP_TEXT: &str = "\
dbg-agent - AI debugging assistant

Usage: !agent <command> [args]
       !ai <question>          (shorthand for !agent ask)

Commands:
  help                  Show this help
  version               Show version information
  version prompt        Show the injected system prompt
  ask <question>        Ask the assistant a question
  clear                 Start a new conversation for this target
  provider              Show current provider
  provider <name>       Switch provider (claude, copilot)
  prompt                Show custom prompt
  prompt <text>         Set custom prompt (additive)
  prompt clear          Clear custom prompt
  timeout               Show response timeout
  timeout <ms>          Set response timeout (e.g. 120000 = 2 minutes)
  http [bind_addr]      Start HTTP server for external tools (port auto-assigned)
  mcp [bind_addr]       Start MCP server for MCP-compatible clients
  byok                  Show BYOK (Bring Your Own Key) status
  byok enable|disable   Enable or disable BYOK for the current provider
  byok key <value>      Set BYOK API key
  byok endpoint <url>   Set BYOK API endpoint
  byok model <model>    Set BYOK model name
  byok type <type>      Set BYOK provider type (openai, anthropic, azure)
";

const BYOK_HELP: &str = "
Use '!agent byok <cmd>' where cmd is:
  enable|disable  - Enable or disable BYOK
  key <value>     - Set API key
  endpoint <url>  - Set API endpoint
  model <name>    - Set model name
  type <type>     - Set provider type (openai, anthropic, azure)
";
