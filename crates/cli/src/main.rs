//! Tether CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: install `tracing-subscriber` with an
//!    `EnvFilter` and a pretty or JSON layer. Every span and event emitted by
//!    the workspace crates flows through it.
//! 2. **Configure the client**: register the opt-in strategies requested on
//!    the command line ahead of the built-in `Callback` strategy.
//! 3. **Run a command**:
//!    - `resolve` loads a JSON service declaration, binds every method, and
//!      reports which factory won each one. A misdeclared method fails the
//!      whole run with the configuration error.
//!    - `demo` binds a small in-process service and drives real calls
//!      through both strategies.
//!
//! # Usage
//!
//! ```bash
//! tether resolve services/github.json --with-oneshot
//! tether resolve services/github.json --json
//! RUST_LOG=debug tether --log-format json demo
//! ```

mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use adapter::{callback_fn, CallError, DeclaredType};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use service::{
    MethodDeclaration, MethodName, Service, ServiceClient, ServiceDefinition, ServiceName,
};
use tokio::sync::oneshot;
use tracing::info;
use transport::{oneshot_channel, OneshotAdapterFactory, TokioCall, ONESHOT_SENDER};

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "tether")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve and exercise callback adapters for declared services")]
struct Cli {
    /// Log line layout
    #[arg(long, value_enum, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Default log filter, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bind every method of a JSON service declaration and report the winners
    Resolve {
        /// Path to the service declaration
        path: PathBuf,

        /// Register the oneshot-channel strategy ahead of the built-in one
        #[arg(long)]
        with_oneshot: bool,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Bind a sample service and run calls through it
    Demo,
}

/// One bound method, as reported by `resolve`.
#[derive(Debug, Serialize)]
struct Binding {
    method: String,
    factory: String,
    response_type: String,
}

/// Response type of the demo service's `getRepo`.
#[derive(Debug)]
struct Repo {
    full_name: String,
    private: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format, &cli.log_level)?;

    match cli.command {
        Command::Resolve {
            path,
            with_oneshot,
            json,
        } => resolve(&path, with_oneshot, json),
        Command::Demo => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(demo())
        }
    }
}

fn client(with_oneshot: bool) -> ServiceClient {
    let builder = ServiceClient::builder();
    if with_oneshot {
        builder
            .add_callback_adapter_factory(OneshotAdapterFactory)
            .build()
    } else {
        builder.build()
    }
}

fn load_definition(path: &Path) -> Result<ServiceDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid service declaration in {}", path.display()))
}

fn bindings(service: &Service) -> Vec<Binding> {
    let mut bindings: Vec<Binding> = service
        .methods()
        .map(|method| Binding {
            method: method.call_site().to_string(),
            factory: method.factory_name().to_owned(),
            response_type: method.response_type().to_string(),
        })
        .collect();
    bindings.sort_by(|a, b| a.method.cmp(&b.method));
    bindings
}

fn resolve(path: &Path, with_oneshot: bool, json: bool) -> Result<()> {
    let definition = load_definition(path)?;
    let client = client(with_oneshot);
    info!(
        service = %definition.name,
        factories = ?client.resolver().factory_names(),
        "Resolving service declaration"
    );

    let service = client
        .create(&definition)
        .with_context(|| format!("service `{}` cannot be bound", definition.name))?;

    let report = bindings(&service);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        );
    } else {
        for binding in &report {
            println!(
                "{} -> {} (response: {})",
                binding.method, binding.factory, binding.response_type
            );
        }
    }
    Ok(())
}

fn demo_definition() -> Result<ServiceDefinition> {
    let name = |text: &str| MethodName::new(text).context("empty method name");
    let repo: DeclaredType = "Repo".parse()?;

    Ok(
        ServiceDefinition::new(ServiceName::new("GitHub").context("empty service name")?)
            .with_method(MethodDeclaration::new(
                name("getRepo")?,
                DeclaredType::callback(DeclaredType::upper_bounded(repo)),
            ))
            .with_method(MethodDeclaration::new(
                name("starCount")?,
                DeclaredType::parameterized(ONESHOT_SENDER, vec![DeclaredType::of::<u64>()?]),
            )),
    )
}

async fn demo() -> Result<()> {
    let service = client(true).create(&demo_definition()?)?;
    for binding in bindings(&service) {
        info!(
            method = %binding.method,
            factory = %binding.factory,
            response_type = %binding.response_type,
            "Bound"
        );
    }

    // Callback strategy: the response arrives on a runtime worker.
    let (tx, rx) = oneshot::channel();
    let call = TokioCall::on_current(async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, CallError>(Repo {
            full_name: "tether-rs/tether".to_owned(),
            private: false,
        })
    })?
    .with_label("GET /repos/tether-rs/tether");
    service.method("getRepo")?.enqueue_typed(
        call,
        callback_fn(move |outcome: Result<Repo, CallError>| {
            let _ = tx.send(outcome);
        }),
    )?;
    let repo = rx.await.context("callback dropped")??;
    println!(
        "getRepo delivered {} (private: {})",
        repo.full_name, repo.private
    );

    // Oneshot strategy: the caller awaits the receiving half.
    let (consumer, response) = oneshot_channel();
    let call = TokioCall::on_current(async { Ok::<_, CallError>(42_u64) })?;
    let returned = service.invoke("starCount", call.erased(), consumer)?;
    if returned.is_some() {
        bail!("starCount returned a value; expected the empty sentinel");
    }
    let stars = response.recv::<u64>().await?;
    println!("starCount delivered {stars}");

    Ok(())
}
