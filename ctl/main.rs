#![forbid(unsafe_code)]

//! `dsf-ctl`: command-line companion for the control server.
//!
//! Opens one connection per invocation: a command connection for one-shot
//! commands, an intercept connection to watch codes, or a subscription to
//! follow the object model.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dsf_client::models::code::CodeChannel;
use dsf_client::models::init::{
    InterceptOptions, InterceptionMode, SubscribeOptions, SubscriptionMode,
};
use dsf_client::{
    AppError, ClientConfig, CommandChannel, CommandConnection, InterceptConnection, Result,
    SubscribeConnection,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "dsf-ctl",
    about = "Command-line client for the control server",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control server socket; overrides `socket_path` from the config file.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// Interception point selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum CtlInterceptMode {
    Pre,
    Post,
    Executed,
}

impl From<CtlInterceptMode> for InterceptionMode {
    fn from(mode: CtlInterceptMode) -> Self {
        match mode {
            CtlInterceptMode::Pre => Self::Pre,
            CtlInterceptMode::Post => Self::Post,
            CtlInterceptMode::Executed => Self::Executed,
        }
    }
}

/// Subscription payload selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum CtlSubscriptionMode {
    Full,
    Patch,
}

impl From<CtlSubscriptionMode> for SubscriptionMode {
    fn from(mode: CtlSubscriptionMode) -> Self {
        match mode {
            CtlSubscriptionMode::Full => Self::Full,
            CtlSubscriptionMode::Patch => Self::Patch,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum PluginAction {
    Install,
    Start,
    Stop,
    Uninstall,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the full object model.
    Model,

    /// Execute code text and print its output.
    Code {
        /// Code text, e.g. `M115`.
        text: String,
        /// Channel to execute on.
        #[arg(long, default_value = "SBC", value_parser = parse_channel)]
        channel: CodeChannel,
    },

    /// Wait for pending codes on a channel to finish.
    Flush {
        /// Channel to flush.
        #[arg(long, default_value = "SBC", value_parser = parse_channel)]
        channel: CodeChannel,
    },

    /// Resolve a firmware-style path to a filesystem path.
    ResolvePath {
        /// Path such as `0:/sys/config.g`.
        path: String,
    },

    /// Manage a plugin.
    Plugin {
        /// Action to perform.
        #[arg(value_enum)]
        action: PluginAction,
        /// Plugin name, or bundle path for `install`.
        name: String,
    },

    /// Print intercepted codes and let each one continue.
    Intercept {
        /// Interception point.
        #[arg(long, value_enum, default_value_t = CtlInterceptMode::Pre)]
        mode: CtlInterceptMode,
        /// Code filters such as `G28` or `M*`.
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Stop after this many codes.
        #[arg(long)]
        count: Option<usize>,
    },

    /// Print the object model and then each update.
    Subscribe {
        /// Payload shape.
        #[arg(long, value_enum, default_value_t = CtlSubscriptionMode::Patch)]
        mode: CtlSubscriptionMode,
        /// Object model path filter.
        #[arg(long, default_value = "")]
        filter: String,
        /// Stop after this many updates following the snapshot.
        #[arg(long)]
        count: Option<usize>,
    },
}

fn parse_channel(raw: &str) -> std::result::Result<CodeChannel, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned()))
        .map_err(|_| format!("unknown code channel: {raw}"))
}

fn main() {
    let args = Cli::parse();

    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        if matches!(err, AppError::Io(_)) {
            eprintln!("Is the control server running?");
        }
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }
    info!(socket = %config.socket_path.display(), "configuration loaded");

    match args.command {
        Command::Model => {
            let mut conn = CommandConnection::connect(&config)?;
            let model: serde_json::Value = conn.get_object_model()?;
            print_json(&model);
        }
        Command::Code { text, channel } => {
            let mut conn = CommandConnection::connect(&config)?;
            let output = conn.perform_simple_code(&text, channel)?;
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
        Command::Flush { channel } => {
            let mut conn = CommandConnection::connect(&config)?;
            let flushed = conn.flush(channel)?;
            println!("{}", if flushed { "flushed" } else { "canceled" });
        }
        Command::ResolvePath { path } => {
            let mut conn = CommandConnection::connect(&config)?;
            println!("{}", conn.resolve_path(&path)?);
        }
        Command::Plugin { action, name } => {
            let mut conn = CommandConnection::connect(&config)?;
            match action {
                PluginAction::Install => conn.install_plugin(&name)?,
                PluginAction::Start => conn.start_plugin(&name)?,
                PluginAction::Stop => conn.stop_plugin(&name)?,
                PluginAction::Uninstall => conn.uninstall_plugin(&name)?,
            }
            println!("OK");
        }
        Command::Intercept {
            mode,
            filters,
            count,
        } => {
            let options = InterceptOptions {
                filters: (!filters.is_empty()).then_some(filters),
                ..InterceptOptions::new(mode.into())
            };
            run_intercept(options, count, &config)?;
        }
        Command::Subscribe {
            mode,
            filter,
            count,
        } => {
            let options = SubscribeOptions {
                filter,
                ..SubscribeOptions::new(mode.into())
            };
            run_subscribe(options, count, &config)?;
        }
    }

    Ok(())
}

fn run_intercept(options: InterceptOptions, count: Option<usize>, config: &ClientConfig) -> Result<()> {
    let mut conn = InterceptConnection::connect(options, config)?;
    let mut seen = 0usize;

    while count.is_none_or(|limit| seen < limit) {
        let received = conn.receive_code();
        // A delivered code must be answered even when it failed to decode.
        match received {
            Ok(code) => println!("[{:?}] {code}", code.channel),
            Err(AppError::Json(msg)) => eprintln!("undecodable code: {msg}"),
            Err(err) => return Err(err),
        }
        conn.ignore_code()?;
        seen += 1;
    }

    Ok(())
}

fn run_subscribe(options: SubscribeOptions, count: Option<usize>, config: &ClientConfig) -> Result<()> {
    let mode = options.mode;
    let mut conn = SubscribeConnection::connect(options, config)?;

    println!("{}", conn.get_serialized_object_model()?);

    let mut seen = 0usize;
    while count.is_none_or(|limit| seen < limit) {
        let update = match mode {
            SubscriptionMode::Patch => conn.get_object_model_patch()?,
            SubscriptionMode::Full => conn.get_serialized_object_model()?,
        };
        println!("{update}");
        seen += 1;
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
