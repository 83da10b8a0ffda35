//! Ties the pipeline together: flatten the version, provision Java,
//! resolve every artifact, stage natives, compose the command line and
//! spawn the game.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use mcl_core::{
    info, plan_runtime,
    rules::HostFacts,
    FetchTask, GameRoot, GenericProgress, IntoIoError, CLASSPATH_SEPARATOR, LAUNCHER_NAME,
    LAUNCHER_VERSION,
};

mod error;
pub use error::GameLaunchError;

use crate::{
    arguments::{self, SubValue, Substitutions},
    assets, libraries, natives,
    resolver::ResolverPool,
    version_graph::{FlatVersion, VersionGraph},
};

/// Main class to launch if the descriptor names none (very old
/// modded profiles).
const MAIN_CLASS_DEFAULT: &str = "net.minecraft.launchwrapper.Launch";

/// Replaces `<XMLLayout />` / `<LegacyXMLLayout />` so game output
/// stays line-oriented and readable without an XML parser.
const LOG_CONFIG_LAYOUT: &str =
    r#"<PatternLayout pattern="[%t/%level]: %msg{nolookups}%n" />"#;

pub struct LaunchOptions {
    pub username: Option<String>,
    pub auth_uuid: Option<String>,
    pub auth_access_token: Option<String>,
    pub user_type: Option<String>,
    /// Put saves, logs and other profile data inside
    /// `versions/<id>/` instead of the game root.
    pub isolate_profile: bool,
    pub java_path: Option<PathBuf>,
    pub extra_jvm_args: Vec<String>,
    pub extra_game_args: Vec<String>,
    /// Extra substitution/environment variables; override built-ins
    /// per key and are exported to the child process.
    pub env_variables: BTreeMap<String, String>,
    pub resolution: Option<(u32, u32)>,
    pub resolver_workers: usize,
    /// Extra feature flags for rule evaluation
    /// (e.g. `is_quick_play_multiplayer`).
    pub features: BTreeMap<String, bool>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            username: None,
            auth_uuid: None,
            auth_access_token: None,
            user_type: None,
            isolate_profile: false,
            java_path: None,
            extra_jvm_args: Vec::new(),
            extra_game_args: Vec::new(),
            env_variables: BTreeMap::new(),
            resolution: None,
            resolver_workers: crate::resolver::DEFAULT_WORKERS,
            features: BTreeMap::new(),
        }
    }
}

/// Resolves and launches a version, waiting for the game to exit.
///
/// # Errors
/// Any resolve failure aborts before the JVM is spawned. A non-zero
/// game exit is reported as [`GameLaunchError::ChildExit`].
pub async fn launch(
    root: &GameRoot,
    version_id: &str,
    opts: LaunchOptions,
    progress: Option<Sender<GenericProgress>>,
) -> Result<(), GameLaunchError> {
    tokio::fs::create_dir_all(root.path())
        .await
        .path(root.path())?;

    info!("Resolving {version_id}");
    let mut graph = VersionGraph::new(root.clone());
    let flat = graph.flatten(version_id).await?;

    let facts = HostFacts::current();
    let mut features = opts.features.clone();
    if opts.username.is_none() {
        features.insert("is_demo_user".to_owned(), true);
    }
    if opts.resolution.is_some() {
        features.insert("has_custom_resolution".to_owned(), true);
    }

    let runtime = match &opts.java_path {
        Some(_) => None,
        None => {
            let major = flat.java_version.as_ref().map_or(8, |v| v.majorVersion);
            Some(plan_runtime(major, root).await?)
        }
    };

    let mut tasks: Vec<FetchTask> = Vec::new();

    let client_jar = root.client_jar_path(&flat.jar_id);
    match &flat.client {
        Some(client) => tasks.push(FetchTask::verified(
            client.url.clone(),
            client_jar.clone(),
            Some(client.sha1.clone()),
            Some(client.size),
        )),
        None if client_jar.is_file() => {}
        None => return Err(GameLaunchError::NoClientDownload(version_id.to_owned())),
    }

    let library_plan = libraries::plan_libraries(root, &flat, &facts, &features);
    tasks.extend(library_plan.tasks.iter().cloned());

    let mut asset_plan = assets::plan_assets(root, &flat).await?;
    tasks.extend(asset_plan.tasks.iter().cloned());

    let log_config = plan_log_config(root, &flat, &mut tasks);

    if let Some(runtime) = &runtime {
        tasks.extend(runtime.tasks.iter().cloned());
    }

    info!("Downloading {} files", tasks.len());
    let mut pool = ResolverPool::new(opts.resolver_workers);
    if let Some(progress) = progress {
        pool = pool.with_progress(progress);
    }
    pool.run(tasks).await?;

    // Asset copies read the objects the first pass wrote, so they get
    // their own pass, like natives staging below.
    let copy_tasks = std::mem::take(&mut asset_plan.copy_tasks);
    if !copy_tasks.is_empty() {
        info!("Materializing {} asset copies", copy_tasks.len());
        ResolverPool::new(opts.resolver_workers)
            .run(copy_tasks)
            .await?;
    }

    let java_exe = match (opts.java_path.clone(), runtime) {
        (Some(path), _) => path,
        (None, Some(runtime)) => runtime.finalize().await?,
        // Unreachable by construction, but don't panic over it.
        (None, None) => PathBuf::from("java"),
    };

    info!("Staging natives");
    let stage = natives::plan_natives(root, version_id, &natives::run_token(), &library_plan);
    tokio::fs::create_dir_all(&stage.dir).await.path(&stage.dir)?;
    ResolverPool::new(opts.resolver_workers)
        .run(stage.tasks)
        .await
        .map_err(GameLaunchError::NativesExtraction)?;

    let log_config_arg = match log_config {
        Some((path, argument)) => Some(rewrite_log_config(&path, &argument).await?),
        None => None,
    };

    let cwd = if opts.isolate_profile {
        root.version_dir(version_id)
    } else {
        root.path().to_owned()
    };
    tokio::fs::create_dir_all(&cwd).await.path(&cwd)?;

    let subs = build_substitutions(
        root,
        &flat,
        &opts,
        &cwd,
        &stage.dir,
        &library_plan.classpath,
        &client_jar,
        &asset_plan.virtual_dir,
    );

    // JVM args: descriptor first, then user extras, then log config.
    let mut jvm_args = if flat.jvm_args.is_empty() {
        arguments::legacy_jvm_args()
    } else {
        arguments::expand_entries(&flat.jvm_args, &facts, &features)
    };
    jvm_args.extend(opts.extra_jvm_args.iter().cloned());
    if let Some(arg) = log_config_arg {
        jvm_args.push(arg);
    }

    // Game args: descriptor first, then user extras.
    let mut game_args = if flat.game_args.is_empty() {
        flat.minecraft_arguments
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    } else {
        arguments::expand_entries(&flat.game_args, &facts, &features)
    };
    game_args.extend(opts.extra_game_args.iter().cloned());

    let jvm_args = arguments::substitute(jvm_args, &subs);
    let game_args = arguments::substitute(game_args, &subs);
    let main_class = flat
        .main_class
        .clone()
        .unwrap_or_else(|| MAIN_CLASS_DEFAULT.to_owned());

    info!("Launching {version_id}");
    let mut command = tokio::process::Command::new(&java_exe);
    command
        .args(&jvm_args)
        .arg(&main_class)
        .args(&game_args)
        .current_dir(&cwd)
        .envs(&opts.env_variables);

    let mut child = command
        .spawn()
        .map_err(|err| GameLaunchError::Spawn(err.to_string()))?;
    let status = child
        .wait()
        .await
        .map_err(|err| GameLaunchError::Spawn(err.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(GameLaunchError::ChildExit(status.code().unwrap_or(1)))
    }
}

fn plan_log_config(
    root: &GameRoot,
    flat: &FlatVersion,
    tasks: &mut Vec<FetchTask>,
) -> Option<(PathBuf, String)> {
    let client = flat.logging.as_ref()?.client.as_ref()?;
    let target = root.log_configs_dir().join(&client.file.id);
    tasks.push(FetchTask::verified(
        client.file.url.clone(),
        target.clone(),
        Some(client.file.sha1.clone()),
        Some(client.file.size),
    ));
    Some((target, client.argument.clone()))
}

/// Patches the downloaded log4j config in place and returns the JVM
/// argument pointing at it.
async fn rewrite_log_config(path: &Path, argument: &str) -> Result<String, GameLaunchError> {
    let config = tokio::fs::read_to_string(path).await.path(path)?;
    let patched = config
        .replace("<XMLLayout />", LOG_CONFIG_LAYOUT)
        .replace("<LegacyXMLLayout />", LOG_CONFIG_LAYOUT);
    if patched != config {
        tokio::fs::write(path, patched).await.path(path)?;
    }
    Ok(argument.replace("${path}", &path.to_string_lossy()))
}

#[allow(clippy::too_many_arguments)]
fn build_substitutions(
    root: &GameRoot,
    flat: &FlatVersion,
    opts: &LaunchOptions,
    cwd: &Path,
    natives_dir: &Path,
    classpath_jars: &[PathBuf],
    client_jar: &Path,
    virtual_dir: &Option<PathBuf>,
) -> Substitutions {
    let mut subs = Substitutions::new();
    let mut set = |name: &str, value: SubValue| {
        subs.insert(name.to_owned(), value);
    };

    let assets_root = root.assets_dir();
    set("version_name", SubValue::from(flat.id.clone()));
    set("version_type", SubValue::from(flat.version_type.clone()));
    set(
        "game_directory",
        SubValue::from(cwd.to_string_lossy().into_owned()),
    );
    set(
        "assets_root",
        SubValue::from(assets_root.to_string_lossy().into_owned()),
    );
    set(
        "assets_index_name",
        SubValue::from(flat.assets.clone().unwrap_or_default()),
    );
    set(
        "game_assets",
        SubValue::from(
            virtual_dir
                .as_deref()
                .unwrap_or(&assets_root)
                .to_string_lossy()
                .into_owned(),
        ),
    );
    set(
        "natives_directory",
        SubValue::from(natives_dir.to_string_lossy().into_owned()),
    );
    set(
        "library_directory",
        SubValue::from(root.libraries_dir().to_string_lossy().into_owned()),
    );
    set(
        "classpath_separator",
        SubValue::from(CLASSPATH_SEPARATOR.to_string()),
    );
    set(
        "classpath",
        SubValue::from(arguments::build_classpath(classpath_jars, client_jar)),
    );
    set("launcher_name", SubValue::from(LAUNCHER_NAME));
    set("launcher_version", SubValue::from(LAUNCHER_VERSION));
    set("user_properties", SubValue::from("{}"));

    // Always substituted: a missing username means demo mode, not a
    // literal `${auth_player_name}` token in the argv.
    set(
        "auth_player_name",
        SubValue::from(opts.username.clone().unwrap_or_else(|| "Player".to_owned())),
    );
    let uuid = match (&opts.auth_uuid, &opts.username) {
        (Some(uuid), _) => uuid.clone(),
        (None, Some(username)) => arguments::offline_uuid(username),
        (None, None) => "00000000-0000-0000-0000-000000000000".to_owned(),
    };
    set("auth_uuid", SubValue::from(uuid));
    set(
        "auth_access_token",
        SubValue::from(opts.auth_access_token.clone().unwrap_or_else(|| "0".to_owned())),
    );
    set(
        "user_type",
        SubValue::from(opts.user_type.clone().unwrap_or_else(|| "mojang".to_owned())),
    );
    set("auth_xuid", SubValue::from("0"));
    set("clientid", SubValue::from("0"));

    if let Some((width, height)) = opts.resolution {
        set("resolution_width", SubValue::from(width.to_string()));
        set("resolution_height", SubValue::from(height.to_string()));
    }

    // User-supplied variables override anything above.
    for (key, value) in &opts.env_variables {
        subs.insert(key.clone(), SubValue::from(value.clone()));
    }

    subs
}
