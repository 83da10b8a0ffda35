//! Command-line launcher for the Minecraft Java Edition client.

mod config;

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::mpsc,
};

use clap::Parser;
use mcl_core::{err, info, pt, store, GameRoot, GenericProgress};
use mcl_instances::{launch, GameLaunchError, LaunchOptions, ResolverPool, DEFAULT_WORKERS};

use crate::config::{key_value_pairs, Config, CONFIG_FILE_DEFAULT};

#[derive(Parser)]
#[command(
    name = "mcl",
    version,
    about = "Simple cross-platform cli launcher for Minecraft"
)]
struct Args {
    /// Minecraft version to launch. Run with --list-versions to see
    /// available versions
    id: Option<String>,

    /// Path to config file
    #[arg(short, long, default_value = CONFIG_FILE_DEFAULT)]
    config: String,

    /// Path to .minecraft
    #[arg(short = 'd', long)]
    game_dir: Option<String>,

    /// Print online (official) and local versions and exit
    #[arg(short = 'l', long)]
    list_versions: bool,

    /// Player's username
    #[arg(short, long)]
    user: Option<String>,

    /// Player's UUID (default: offline UUID from username)
    #[arg(long)]
    auth_uuid: Option<String>,

    /// Mojang access token or the final token in the Microsoft
    /// authentication scheme
    #[arg(long)]
    auth_access_token: Option<String>,

    /// "msa", "legacy" or "mojang"
    #[arg(long)]
    user_type: Option<String>,

    /// Put "saves", "logs" and all other profile data inside
    /// versions/version_id instead of game_dir
    #[arg(short, long)]
    isolate: bool,

    /// Custom path to java binary (default: download locally)
    #[arg(long)]
    java_path: Option<String>,

    /// Env variable(s) for the final command as key=value pairs
    #[arg(short, long, value_name = "KEY=VALUE", num_args = 1..)]
    env_variables: Vec<String>,

    /// Extra arguments for Java, separated with spaces
    #[arg(short, long)]
    jvm_args: Option<String>,

    /// Extra arguments for Minecraft, separated with spaces
    #[arg(short, long)]
    game_args: Option<String>,

    /// Number of workers to resolve (download, copy and unpack) files
    #[arg(long)]
    resolver_processes: Option<usize>,

    /// Write all found local versions into
    /// game_dir/launcher_profiles.json (useful for installing
    /// Forge/Fabric)
    #[arg(long)]
    write_profiles: bool,

    /// Run the specified command before launching the game. A leading
    /// "java" is replaced with a locally provisioned runtime
    #[arg(long)]
    run_before: Option<String>,

    /// Java major version for the --run-before command
    #[arg(long)]
    run_before_java: Option<u32>,

    /// Delete files before launching, using glob patterns relative to
    /// the game dir
    #[arg(long, num_args = 1..)]
    delete_files: Vec<String>,

    /// Debug logs
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let code = run(args).await;
    mcl_core::logger_finish();
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    info!("microcraft-launcher {}", mcl_core::LAUNCHER_VERSION);

    let config_path = PathBuf::from(&args.config);
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(error) => {
            err!("{error}");
            return 1;
        }
    };

    let game_dir = args
        .game_dir
        .clone()
        .map(PathBuf::from)
        .or_else(|| config.game_dir.clone().map(PathBuf::from))
        .or_else(store::default_game_dir);
    let Some(game_dir) = game_dir else {
        err!("Couldn't determine the game directory, pass --game-dir");
        return 1;
    };
    let root = GameRoot::new(game_dir);
    info!("Game directory: {:?}", root.path());

    if args.list_versions {
        return match mcl_instances::list_versions(&root).await {
            Ok(versions) => {
                print_versions(&versions);
                0
            }
            Err(error) => {
                err!("{error}");
                1
            }
        };
    }

    let write_profiles = args.write_profiles || config.write_profiles.unwrap_or(false);
    if write_profiles {
        if let Err(error) = mcl_instances::profiles::write_profiles(&root).await {
            err!("Couldn't write launcher profiles: {error}");
        }
    }

    let mut run_before_cmd: Vec<String> = config
        .run_before
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_owned)
        .collect();
    if let Some(extra) = &args.run_before {
        run_before_cmd.extend(extra.split_whitespace().map(str::to_owned));
    }
    if !run_before_cmd.is_empty() {
        let major = args
            .run_before_java
            .or(config.run_before_java)
            .unwrap_or(17);
        run_before(&root, run_before_cmd, major).await;
        if write_profiles {
            if let Err(error) = mcl_instances::profiles::write_profiles(&root).await {
                err!("Couldn't write launcher profiles: {error}");
            }
        }
    }

    let mut delete_patterns = config.delete_files.clone();
    delete_patterns.extend(args.delete_files.iter().cloned());
    delete_files(root.path(), &delete_patterns);

    let Some(version_id) = args.id.clone().or_else(|| config.id.clone()) else {
        info!("Nothing to launch. Exiting...");
        return 0;
    };
    info!("Version ID: {version_id}");

    let username = args
        .user
        .clone()
        .or_else(|| config.user.clone())
        .or_else(username_dialog);
    let auth_uuid = args.auth_uuid.clone().or_else(|| config.auth_uuid.clone());
    let auth_access_token = args
        .auth_access_token
        .clone()
        .or_else(|| config.auth_access_token.clone());
    let user_type = args.user_type.clone().or_else(|| config.user_type.clone());
    let isolate_profile = args.isolate || config.isolate_profile.unwrap_or(false);
    let java_path = args
        .java_path
        .clone()
        .or_else(|| config.java_path.clone())
        .map(PathBuf::from);

    // Save launch-relevant values for future sessions.
    config.id = Some(version_id.clone());
    config.user.clone_from(&username);
    config.auth_uuid.clone_from(&auth_uuid);
    config.auth_access_token.clone_from(&auth_access_token);
    config.user_type.clone_from(&user_type);
    config.isolate_profile = Some(isolate_profile);
    config.java_path = java_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| config.java_path.clone());
    if let Err(error) = config.save(&config_path) {
        err!("Couldn't save config: {error}");
    }

    let mut env_variables = config.env_variables.clone();
    env_variables.extend(key_value_pairs(&args.env_variables));
    if args.verbose && !env_variables.is_empty() {
        pt!("Extra env variables: {env_variables:?}");
    }

    let mut extra_jvm_args = config.jvm_args.clone();
    if let Some(jvm) = &args.jvm_args {
        extra_jvm_args.extend(jvm.split_whitespace().map(str::to_owned));
    }
    let mut extra_game_args = config.game_args.clone();
    if let Some(game) = &args.game_args {
        extra_game_args.extend(game.split_whitespace().map(str::to_owned));
    }

    let opts = LaunchOptions {
        username,
        auth_uuid,
        auth_access_token,
        user_type,
        isolate_profile,
        java_path,
        extra_jvm_args,
        extra_game_args,
        env_variables,
        resolution: None,
        resolver_workers: args
            .resolver_processes
            .or(config.resolver_processes)
            .unwrap_or(DEFAULT_WORKERS),
        features: config.features.clone(),
    };

    let (sender, receiver) = mpsc::channel::<GenericProgress>();
    let progress_thread = std::thread::spawn(move || render_progress(&receiver));

    let result = launch(&root, &version_id, opts, Some(sender)).await;
    _ = progress_thread.join();

    match result {
        Ok(()) => 0,
        Err(GameLaunchError::ChildExit(code)) => {
            err!("Game exited with code {code}");
            code
        }
        Err(error) => {
            err!("{error}");
            1
        }
    }
}

fn print_versions(versions: &[mcl_instances::ListedVersion]) {
    info!("Available versions:");
    for version in versions {
        let provenance = if version.local {
            "LOCAL".to_owned()
        } else {
            version.version_type.clone()
        };
        println!(
            "{:<28} {:<10} {}",
            version.id,
            provenance,
            version.release_time.as_deref().unwrap_or("-")
        );
    }
}

/// Asks for a username on stdin. Empty input means no username
/// (the game starts in demo mode).
fn username_dialog() -> Option<String> {
    print!("USERNAME: ");
    _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return None;
    }
    let username = line.trim();
    if username.is_empty() {
        info!("No username provided");
        None
    } else {
        Some(username.to_owned())
    }
}

/// Runs the configured pre-launch command in the game dir,
/// best-effort. A leading `java` is replaced with a locally
/// provisioned runtime of the requested major version.
async fn run_before(root: &GameRoot, mut command: Vec<String>, java_major: u32) {
    if command[0] == "java" {
        match provision_java(root, java_major).await {
            Ok(java) => command[0] = java.to_string_lossy().into_owned(),
            Err(error) => {
                err!("Unable to install Java for --run-before: {error}");
                return;
            }
        }
    }

    info!("Running: {}", command.join(" "));
    if let Err(error) = tokio::fs::create_dir_all(root.path()).await {
        err!("Couldn't create game dir: {error}");
        return;
    }
    let status = tokio::process::Command::new(&command[0])
        .args(&command[1..])
        .current_dir(root.path())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => { info!("run-before process finished"); }
        Ok(status) => err!("run-before process exited with {status}"),
        Err(error) => {
            err!("Couldn't run {}: {error}", command[0]);
        }
    }
}

async fn provision_java(
    root: &GameRoot,
    major: u32,
) -> Result<std::path::PathBuf, GameLaunchError> {
    let runtime = mcl_core::plan_runtime(major, root).await?;
    ResolverPool::new(DEFAULT_WORKERS).run(runtime.tasks.clone()).await?;
    Ok(runtime.finalize().await?)
}

/// Deletes files matched by the given glob patterns, resolved
/// relative to the game dir. Best-effort.
fn delete_files(game_dir: &Path, patterns: &[String]) {
    for pattern in patterns {
        let full_pattern = game_dir.join(pattern);
        let Some(full_pattern) = full_pattern.to_str() else {
            continue;
        };
        let Ok(matches) = glob::glob(full_pattern) else {
            err!("Broken glob pattern: {pattern}");
            continue;
        };
        for path in matches.flatten() {
            info!("Deleting {path:?}");
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(error) = result {
                err!("Error deleting {path:?}: {error}");
            }
        }
    }
}

fn render_progress(receiver: &mpsc::Receiver<GenericProgress>) {
    let mut bar: Option<indicatif::ProgressBar> = None;
    while let Ok(update) = receiver.recv() {
        let bar = bar.get_or_insert_with(|| {
            indicatif::ProgressBar::new(update.total as u64)
        });
        bar.set_length(update.total as u64);
        bar.set_position(update.done as u64);
        if let Some(message) = update.message {
            bar.set_message(message);
        }
        if update.has_finished {
            bar.finish_and_clear();
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}
