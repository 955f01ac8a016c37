// dbg-agent: command-line client for a running debugger bridge
//
// Talks to the HTTP frontend started with `!agent http` and edits the shared
// settings file without a server.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use dbg_agent::client::{BridgeClient, resolve_url};
use dbg_agent::settings::{Settings, SettingsStore, format_duration};
use dbg_agent::Provider;

#[derive(Parser, Debug)]
#[command(name = "dbg-agent")]
#[command(about = "Client for the debugger AI bridge")]
#[command(version)]
struct Cli {
    /// Bridge URL (defaults to $DBG_AGENT_URL, then http://127.0.0.1:9999)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a raw debugger command
    Exec {
        /// Command text, e.g. "kb"
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Ask the assistant a question
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Interactive session (type `exit` or `quit` to leave)
    Interactive,

    /// Check whether the bridge is reachable
    Status,

    /// Stop the bridge
    Shutdown,

    /// Inspect or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print current settings (API keys masked)
    Show,

    /// Show or switch the provider
    Provider { name: Option<String> },

    /// Show or change BYOK settings for the current provider
    Byok {
        /// enable | disable | key | endpoint | model | type
        action: Option<String>,
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Config(cmd) => run_config(cmd, settings_store(cli.settings)?),
        command => {
            let client = BridgeClient::new(resolve_url(cli.url.as_deref()))?;
            run_remote(command, &client).await
        }
    }
}

async fn run_remote(command: Command, client: &BridgeClient) -> Result<()> {
    match command {
        Command::Exec { command } => {
            println!("{}", client.exec(&command.join(" ")).await?);
        }
        Command::Ask { question } => {
            println!("{}", client.ask(&question.join(" ")).await?);
        }
        Command::Status => {
            let status = client
                .status()
                .await
                .with_context(|| format!("bridge at {} is not reachable", client.base_url()))?;
            println!("{status} ({})", client.base_url());
        }
        Command::Shutdown => {
            println!("{}", client.shutdown().await?);
        }
        Command::Interactive => interactive(client).await?,
        Command::Config(_) => bail!("config commands do not use the bridge"),
    }
    Ok(())
}

async fn interactive(client: &BridgeClient) -> Result<()> {
    println!("Connected to {}", client.base_url());
    println!("Type a question, `exec <command>` for a raw command, or `exit` to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let reply = match line.strip_prefix("exec ") {
            Some(command) => client.exec(command.trim()).await,
            None => client.ask(line).await,
        };
        match reply {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn settings_store(path: Option<PathBuf>) -> Result<SettingsStore> {
    Ok(match path {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::open_default()?,
    })
}

fn run_config(cmd: ConfigCommand, store: SettingsStore) -> Result<()> {
    let mut settings = store.load()?;
    match cmd {
        ConfigCommand::Show => print_settings(&store, &settings),
        ConfigCommand::Provider { name: None } => {
            println!("Current provider: {}", settings.default_provider);
            for provider in Provider::ALL {
                println!("  {:<8} - {}", provider.name(), provider.description());
            }
        }
        ConfigCommand::Provider { name: Some(name) } => {
            settings.default_provider = name.parse()?;
            store.save(&settings)?;
            println!("Provider set to: {}", settings.default_provider);
        }
        ConfigCommand::Byok { action: None, .. } => print_byok(&settings),
        ConfigCommand::Byok {
            action: Some(action),
            value,
        } => {
            let value = value.unwrap_or_default();
            let byok = settings.byok_mut();
            match action.as_str() {
                "enable" => byok.enabled = true,
                "disable" => byok.enabled = false,
                "key" if value.is_empty() => bail!("API key value required"),
                "key" => byok.api_key = value,
                "endpoint" => byok.base_url = value,
                "model" => byok.model = value,
                "type" => byok.provider_type = value,
                other => bail!("Unknown byok action: {other}"),
            }
            store.save(&settings)?;
            print_byok(&settings);
        }
    }
    Ok(())
}

fn print_settings(store: &SettingsStore, settings: &Settings) {
    println!("Settings file:    {}", store.path().display());
    println!("Provider:         {}", settings.default_provider);
    println!(
        "Response timeout: {}",
        format_duration(settings.response_timeout_ms)
    );
    if settings.custom_prompt.is_empty() {
        println!("Custom prompt:    (none)");
    } else {
        println!("Custom prompt:    {}", settings.custom_prompt);
    }
    print_byok(settings);
}

fn print_byok(settings: &Settings) {
    println!("BYOK ({}):", settings.default_provider);
    let Some(byok) = settings.byok() else {
        println!("  (not configured)");
        return;
    };
    let or_default = |s: &str| {
        if s.is_empty() { "(default)".to_string() } else { s.to_string() }
    };
    println!("  Enabled:  {}", if byok.enabled { "yes" } else { "no" });
    println!(
        "  API Key:  {}",
        if byok.api_key.is_empty() { "(not set)" } else { "********" }
    );
    println!("  Endpoint: {}", or_default(&byok.base_url));
    println!("  Model:    {}", or_default(&byok.model));
    println!("  Type:     {}", or_default(&byok.provider_type));
    println!("  Usable:   {}", if byok.is_usable() { "yes" } else { "no" });
}
