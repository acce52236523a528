//! Command dispatch: one subcommand, one registry operation

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::{output, tree, validate, CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Book, Release};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Load settings, wire real services and run the selected command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.project_dir.as_deref())?
        .with_overrides(cli.cache.as_deref(), cli.url.as_deref());
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings)?;
    execute_with(cli, &container)
}

/// Run the selected command against an already wired container.
///
/// Arguments are validated first, so malformed input never touches the ABL.
pub fn execute_with(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    validate_args(cli)?;
    match &cli.command {
        Some(Commands::Remove {
            repository,
            commit_sha,
            slug,
        }) => remove(container, repository, commit_sha, slug),
        Some(Commands::Add {
            repository,
            commit_sha,
            style,
            uuid,
            slug,
            min_code_version,
            edition,
        }) => {
            let now = Utc::now();
            let release = Release {
                min_code_version: min_code_version
                    .clone()
                    .unwrap_or_else(|| now.format("%Y%m%d.%H%M%S").to_string()),
                edition: *edition,
                committed_at: now,
            };
            add(
                container,
                repository,
                commit_sha,
                Book::new(style, uuid, slug),
                &release,
            )
        }
        Some(Commands::AddRepository {
            repository,
            platforms,
        }) => add_repository(container, repository, platforms),
        Some(Commands::AddCollection {
            collection_id,
            content_version,
            min_code_version,
        }) => add_collection(container, collection_id, content_version, min_code_version),
        Some(Commands::RemoveCollection {
            collection_id,
            content_version,
        }) => remove_collection(container, collection_id, content_version),
        Some(Commands::Update) => update(container),
        Some(Commands::Count) => count(container),
        Some(Commands::Push) => push(container),
        Some(Commands::Check) => check(container),
        Some(Commands::Reindex) => reindex(container),
        Some(Commands::Tree) => show_tree(container),
        Some(Commands::Config { command }) => {
            config(container, command, cli.project_dir.as_deref())
        }
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => {
            output::info("MABLE: Making the ABL Easier\nrun \"mable --help\" for help");
            Ok(())
        }
    }
}

/// Reject malformed arguments before any ABL I/O happens.
pub fn validate_args(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Remove {
            repository,
            commit_sha,
            slug,
        }) => {
            validate::identifier(repository, "repository name")?;
            validate::identifier(commit_sha, "commit SHA")?;
            validate::identifier(slug, "slug")
        }
        Some(Commands::Add {
            repository,
            commit_sha,
            style,
            uuid,
            slug,
            min_code_version,
            ..
        }) => {
            validate::identifier(repository, "repository name")?;
            validate::identifier(commit_sha, "commit SHA")?;
            validate::identifier(style, "style")?;
            validate::book_uuid(uuid)?;
            validate::identifier(slug, "slug")?;
            if let Some(v) = min_code_version {
                validate::min_code_version(v)?;
            }
            Ok(())
        }
        Some(Commands::AddRepository {
            repository,
            platforms,
        }) => {
            validate::identifier(repository, "repository name")?;
            platforms
                .iter()
                .try_for_each(|p| validate::identifier(p, "platform"))
        }
        Some(Commands::AddCollection {
            collection_id,
            content_version,
            min_code_version,
        }) => {
            validate::collection_id(collection_id)?;
            validate::content_version(content_version)?;
            validate::min_code_version(min_code_version)
        }
        Some(Commands::RemoveCollection {
            collection_id,
            content_version,
        }) => {
            validate::collection_id(collection_id)?;
            validate::content_version(content_version)
        }
        _ => Ok(()),
    }
}

#[instrument(skip(container))]
fn remove(
    container: &ServiceContainer,
    repository: &str,
    commit_sha: &str,
    slug: &str,
) -> CliResult<()> {
    let removal = container
        .registry
        .apply(|abl| abl.remove_book_version(repository, commit_sha, slug))?;
    output::success(&format!(
        "{} {} of {} was removed from the ABL",
        slug, commit_sha, repository
    ));
    if removal.version_dropped {
        output::detail(&format!(
            "{} had no books left and was dropped from {}",
            commit_sha, repository
        ));
    }
    Ok(())
}

#[instrument(skip(container, book, release))]
fn add(
    container: &ServiceContainer,
    repository: &str,
    commit_sha: &str,
    book: Book,
    release: &Release,
) -> CliResult<()> {
    let slug = book.slug.clone();
    let addition = container
        .registry
        .apply(|abl| abl.add_book_version(repository, commit_sha, book, release))?;
    output::success(&format!(
        "{} {} of {} has been added to the ABL",
        slug, commit_sha, repository
    ));
    if addition.version_created {
        output::detail(&format!(
            "new version {} (min code {}, edition {})",
            commit_sha, release.min_code_version, release.edition
        ));
    }
    Ok(())
}

#[instrument(skip(container))]
fn add_repository(
    container: &ServiceContainer,
    repository: &str,
    platforms: &[String],
) -> CliResult<()> {
    container
        .registry
        .apply(|abl| abl.add_new_repository(repository, platforms))?;
    output::success(&format!("{} has been added to the ABL", repository));
    Ok(())
}

#[instrument(skip(container))]
fn add_collection(
    container: &ServiceContainer,
    collection_id: &str,
    content_version: &str,
    min_code_version: &str,
) -> CliResult<()> {
    container.registry.apply(|abl| {
        abl.add_collection_version(collection_id, content_version, min_code_version)
    })?;
    output::success(&format!(
        "{} of {} has been added to the ABL",
        content_version, collection_id
    ));
    Ok(())
}

#[instrument(skip(container))]
fn remove_collection(
    container: &ServiceContainer,
    collection_id: &str,
    content_version: &str,
) -> CliResult<()> {
    container
        .registry
        .apply(|abl| abl.remove_collection_version(collection_id, content_version))?;
    output::success(&format!(
        "{} of {} was removed from the ABL",
        content_version, collection_id
    ));
    Ok(())
}

#[instrument(skip(container))]
fn update(container: &ServiceContainer) -> CliResult<()> {
    let abl = container.registry.fetch()?;
    container.registry.persist(&abl)?;
    output::success(&format!(
        "most recent version of {} has been downloaded",
        container.registry.cache_path().display()
    ));
    Ok(())
}

#[instrument(skip(container))]
fn count(container: &ServiceContainer) -> CliResult<()> {
    let abl = container.registry.load_or_fetch()?;
    output::info(&format!("ABL contains {} book versions", abl.count()));
    Ok(())
}

#[instrument(skip(container))]
fn push(container: &ServiceContainer) -> CliResult<()> {
    let abl = container.registry.load_or_fetch()?;
    container.registry.push(&abl)?;
    Ok(())
}

#[instrument(skip(container))]
fn check(container: &ServiceContainer) -> CliResult<()> {
    let abl = container.registry.load_or_fetch()?;
    let issues = abl.audit();
    if issues.is_empty() {
        output::success(&format!(
            "ABL index is consistent ({} entries, {} schema)",
            abl.count(),
            abl.schema()
        ));
        return Ok(());
    }
    output::header(&format!("{} index issue(s):", issues.len()));
    for issue in &issues {
        output::failure(issue);
    }
    Err(ApplicationError::IndexDrift {
        path: container.registry.cache_path().to_path_buf(),
        issues: issues.len(),
    }
    .into())
}

#[instrument(skip(container))]
fn reindex(container: &ServiceContainer) -> CliResult<()> {
    let changed = container.registry.apply(|abl| abl.reindex())?;
    output::success(&format!("index rebuilt, {} entries changed", changed));
    Ok(())
}

#[instrument(skip(container))]
fn show_tree(container: &ServiceContainer) -> CliResult<()> {
    let abl = container.registry.load_or_fetch()?;
    output::info(&tree::render(&abl));
    Ok(())
}

/// Directory whose `.mable.toml` applies: `-C` if given, else the working directory.
fn project_dir(project_dir: Option<&Path>) -> CliResult<PathBuf> {
    match project_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| CliError::from(InfraError::io("resolve current directory", e))),
    }
}

fn config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    project_dir_arg: Option<&Path>,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::info(&format!("global: {}", p.display())),
                None => output::info("global: <unavailable>"),
            }
            let dir = project_dir(project_dir_arg)?;
            output::info(&format!("local:  {}", local_config_path(&dir).display()));
            output::info(&format!(
                "cache:  {}",
                container.settings.cache_path.display()
            ));
            Ok(())
        }
        ConfigCommands::Init => {
            let path = global_config_path()
                .ok_or_else(|| CliError::Usage("cannot determine config directory".into()))?;
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create {}", path.display()), e))?;
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
    }
}
