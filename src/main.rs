mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bf_core::config::Config;
use bf_core::Profile;
use bf_pipeline::{EntrySource, ExtensionCatalog, Runner, RunnerRegistry, StartRequest};
use clap::Parser;
use cli::{Cli, Commands};

struct RunArgs {
    extension: String,
    action: String,
    profile: Option<String>,
    params: Vec<(String, String)>,
    input: std::path::PathBuf,
    output: std::path::PathBuf,
    ext: String,
    parallelism: Option<usize>,
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting batchforge server");
    bf_server::start(config).await?;
    Ok(())
}

async fn run_batch(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let tools = bf_av::ToolRegistry::discover(&config.tools);
    let catalog = ExtensionCatalog::load(&config.extensions.dir);
    let registry = RunnerRegistry::new();

    let profile = (!args.params.is_empty()).then(|| Profile {
        name: "cli".to_string(),
        params: args.params.into_iter().collect(),
    });

    let request = StartRequest {
        extension_id: args.extension,
        action_id: args.action,
        profile,
        profile_id: args.profile,
        source: EntrySource::Directory {
            input_dir: args.input,
            output_dir: args.output,
            output_extension: args.ext,
        },
    };

    let parallelism = args
        .parallelism
        .unwrap_or_else(|| config.runner.effective_parallelism())
        .max(1);

    let runner = bf_pipeline::launch(request, &catalog, &tools, &registry, None, parallelism)?;
    tracing::info!(
        runner_id = %runner.id(),
        amount = runner.amount(),
        parallelism,
        "Batch started"
    );

    let watcher = tokio::spawn(watch_progress(Arc::clone(&runner)));
    let outcome = tokio::select! {
        outcome = runner.wait() => outcome,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!();
            tracing::warn!("Interrupted, stopping runner");
            runner.stop();
            runner.wait().await
        }
    };
    watcher.abort();

    let progress = runner.progress();
    eprintln!(
        "\rdone: {}/{} finished, {} failed, {} skipped ({})",
        progress.finished, progress.amount, progress.failed, progress.skipped, progress.state
    );
    for failure in &outcome.failures {
        let input = failure
            .entry
            .input_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!("  failed: {input}: {}", failure.error);
    }

    outcome.into_result()?;
    Ok(())
}

/// Print aggregate progress every 500 ms until aborted.
async fn watch_progress(runner: Arc<Runner>) {
    let mut interval = tokio::time::interval(Duration::from_millis(500));
    loop {
        interval.tick().await;
        let p = runner.progress();
        let percent = if p.amount == 0 {
            100.0
        } else {
            (p.finished as f64 + p.running) / p.amount as f64 * 100.0
        };
        eprint!(
            "\r[{:>5.1}%] {}/{} finished, {} failed",
            percent, p.finished, p.amount, p.failed
        );
    }
}

fn list_extensions(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let catalog = ExtensionCatalog::load(&config.extensions.dir);

    if catalog.is_empty() {
        println!("No extensions found in {}", catalog.dir().display());
        return Ok(());
    }

    for manifest in catalog.list() {
        println!("{} ({})", manifest.id, manifest.name);
        for action in &manifest.actions {
            println!("  action  {} [{}] {}", action.id, action.kind.as_str(), action.name);
        }
        for profile in &manifest.profiles {
            println!("  profile {} -> {} {}", profile.id, profile.action, profile.name);
        }
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = bf_av::ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Actions that need them will be rejected.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Parallelism: {}", config.runner.effective_parallelism());
    match config.runner.retention_secs {
        Some(secs) => println!("  Runner retention: {secs}s"),
        None => println!("  Runner retention: forever"),
    }
    println!("  Extensions dir: {}", config.extensions.dir.display());

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "batchforge=debug,bf_core=debug,bf_av=debug,bf_pipeline=debug,bf_server=debug,tower_http=debug".to_string()
        } else {
            "batchforge=info,bf_core=info,bf_av=info,bf_pipeline=info,bf_server=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Run {
            extension,
            action,
            profile,
            params,
            input,
            output,
            ext,
            parallelism,
        } => {
            let args = RunArgs {
                extension,
                action,
                profile,
                params,
                input,
                output,
                ext,
                parallelism,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(args, cli.config.as_deref()))
        }
        Commands::Extensions => list_extensions(cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("batchforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
