// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! New project scaffolding.
//!
//! A project lives at `<root>/<vendor>/<package>` as a Git repository whose
//! "origin" remote points to GitHub. When the backup volume is mounted, a
//! bare mirror is also created at `<backup>/<vendor>/<package>`, and added as
//! a second URL of "origin" so that every push lands on both.
//!
//! The template directory is copied into the new project, with `{vendor}`
//! and `{package}` placeholders replaced in every text file. Everything is
//! committed as "initial commit", then development continues on a "develop"
//! branch.

use crate::config::ProjectSettings;

use git2::{IndexAddOption, Repository, Signature};
use ignore::WalkBuilder;
use std::{
    fs::{read, write},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Branch checked out once the project is created.
pub const DEVELOP_BRANCH: &str = "develop";

/// Identity of a project on GitHub.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProjectName {
    pub vendor: String,
    pub package: String,
}

impl ProjectName {
    /// Construct new project name.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectError::InvalidName`] if vendor or package is empty,
    ///   or would escape its parent directory.
    pub fn new(vendor: impl Into<String>, package: impl Into<String>) -> Result<Self> {
        let vendor = vendor.into();
        let package = package.into();
        for part in [&vendor, &package] {
            if part.is_empty() || part == "." || part == ".." || part.contains('/') {
                return Err(ProjectError::InvalidName(part.clone()));
            }
        }

        Ok(Self { vendor, package })
    }

    /// SSH URL of GitHub repository.
    pub fn github_url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.vendor, self.package)
    }

    /// Page to create the repository on GitHub.
    pub fn new_repository_url(&self) -> String {
        format!(
            "https://github.com/organizations/{}/repositories/new",
            self.vendor
        )
    }

    fn relative_path(&self) -> PathBuf {
        Path::new(&self.vendor).join(&self.package)
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("{vendor}", &self.vendor)
            .replace("{package}", &self.package)
    }
}

/// Create new project, and return path to its working copy.
///
/// # Errors
///
/// - Return [`ProjectError::AlreadyExists`] if working copy already exists.
/// - Return [`ProjectError::Git2`] if repositories cannot be set up.
/// - Return [`ProjectError::Template`] if template cannot be copied.
#[instrument(skip(settings), level = "debug")]
pub fn create(settings: &ProjectSettings, name: &ProjectName) -> Result<PathBuf> {
    let path = settings.root.join(name.relative_path());
    if path.exists() {
        return Err(ProjectError::AlreadyExists(path));
    }
    mkdirp::mkdirp(&path).map_err(|error| ProjectError::Template {
        source: error,
        path: path.clone(),
    })?;

    let repo = Repository::init(&path)?;
    repo.remote("origin", &name.github_url())?;

    if settings.backup.is_dir() {
        let mirror = settings.backup.join(name.relative_path());
        mkdirp::mkdirp(&mirror).map_err(|error| ProjectError::Template {
            source: error,
            path: mirror.clone(),
        })?;
        Repository::init_bare(&mirror)?;

        // INVARIANT: Pattern matches no existing value, so the URL is appended.
        repo.config()?.set_multivar(
            "remote.origin.url",
            "^$",
            &mirror.to_string_lossy(),
        )?;
        info!("mirror project to {:?}", mirror.display());
    } else {
        debug!("backup root {:?} not accessible, no mirror", settings.backup.display());
    }

    if settings.template.is_dir() {
        copy_template(&settings.template, &path, name)?;
    } else {
        debug!("no template at {:?}", settings.template.display());
    }

    initial_commit(&repo)?;
    info!("project created at {:?}", path.display());

    Ok(path)
}

fn copy_template(template: &Path, path: &Path, name: &ProjectName) -> Result<()> {
    let walker = WalkBuilder::new(template).standard_filters(false).build();
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(template) else {
            continue;
        };
        let destination = path.join(relative);
        let template_error = |error| ProjectError::Template {
            source: error,
            path: entry.path().to_path_buf(),
        };

        match entry.file_type() {
            Some(kind) if kind.is_dir() => {
                mkdirp::mkdirp(&destination).map_err(template_error)?;
            }
            Some(kind) if kind.is_file() => {
                let content = read(entry.path()).map_err(template_error)?;
                let content = match String::from_utf8(content) {
                    Ok(text) => name.render(&text).into_bytes(),
                    Err(binary) => binary.into_bytes(),
                };
                write(&destination, content).map_err(template_error)?;
            }
            _ => debug!("skip template entry {:?}", entry.path().display()),
        }
    }

    Ok(())
}

fn initial_commit(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    // INVARIANT: Fall back to a fixed identity when Git has none configured.
    let signature = repo
        .signature()
        .or_else(|_| Signature::now("kalmiya", "kalmiya@localhost"))?;
    let commit = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        "initial commit",
        &tree,
        &[],
    )?;

    repo.branch(DEVELOP_BRANCH, &repo.find_commit(commit)?, false)?;
    repo.set_head(&format!("refs/heads/{DEVELOP_BRANCH}"))?;

    Ok(())
}

/// All possible error types of project scaffolding.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Vendor or package is not a valid directory name.
    #[error("invalid project name part {0:?}")]
    InvalidName(String),

    /// Working copy is already there.
    #[error("project {0:?} already exists")]
    AlreadyExists(PathBuf),

    /// Template cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Template file cannot be copied.
    #[error("failed to copy template entry {path:?}")]
    Template {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ProjectError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::fs::{create_dir_all, read_to_string};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        settings: ProjectSettings,
    }

    impl Workspace {
        fn new(with_backup: bool) -> anyhow::Result<Self> {
            let dir = TempDir::new()?;
            let settings = ProjectSettings {
                root: dir.path().join("Sites"),
                backup: dir.path().join("Backup"),
                template: dir.path().join("template"),
            };
            create_dir_all(settings.template.join("src"))?;
            write(settings.template.join("README.md"), "# {vendor}/{package}\n")?;
            write(settings.template.join("src/.keep"), "")?;
            if with_backup {
                create_dir_all(&settings.backup)?;
            }

            Ok(Self {
                _dir: dir,
                settings,
            })
        }
    }

    #[test]
    fn creates_committed_project_on_develop() -> anyhow::Result<()> {
        let workspace = Workspace::new(false)?;
        let name = ProjectName::new("innmind", "kalmiya")?;

        let path = create(&workspace.settings, &name)?;

        assert_eq!(path, workspace.settings.root.join("innmind/kalmiya"));
        assert_eq!(read_to_string(path.join("README.md"))?, "# innmind/kalmiya\n");

        let repo = Repository::open(&path)?;
        let head = repo.head()?;
        assert_eq!(head.shorthand(), Some(DEVELOP_BRANCH));
        let commit = head.peel_to_commit()?;
        assert_eq!(commit.message(), Some("initial commit"));
        assert!(commit.tree()?.get_path(Path::new("src/.keep")).is_ok());

        let remote = repo.find_remote("origin")?;
        assert_eq!(remote.url(), Some("git@github.com:innmind/kalmiya.git"));
        assert!(!workspace.settings.backup.exists());

        Ok(())
    }

    #[test]
    fn mirrors_project_when_backup_is_mounted() -> anyhow::Result<()> {
        let workspace = Workspace::new(true)?;
        let name = ProjectName::new("innmind", "kalmiya")?;

        let path = create(&workspace.settings, &name)?;

        let mirror = workspace.settings.backup.join("innmind/kalmiya");
        assert!(Repository::open_bare(&mirror).is_ok());

        let config = Repository::open(&path)?.config()?.snapshot()?;
        let mut urls = Vec::new();
        let mut entries = config.multivar("remote.origin.url", None)?;
        while let Some(entry) = entries.next() {
            urls.push(entry?.value().unwrap_or_default().to_string());
        }
        assert_eq!(
            urls,
            vec![
                "git@github.com:innmind/kalmiya.git".to_string(),
                mirror.to_string_lossy().into_owned(),
            ]
        );

        Ok(())
    }

    #[test]
    fn existing_project_is_left_alone() -> anyhow::Result<()> {
        let workspace = Workspace::new(false)?;
        let name = ProjectName::new("innmind", "kalmiya")?;
        create_dir_all(workspace.settings.root.join("innmind/kalmiya"))?;

        let result = create(&workspace.settings, &name);

        assert!(matches!(result, Err(ProjectError::AlreadyExists(_))));

        Ok(())
    }

    #[test_case(""; "empty")]
    #[test_case(".."; "parent")]
    #[test_case("a/b"; "nested")]
    #[test]
    fn invalid_name_parts(part: &str) {
        assert!(matches!(
            ProjectName::new("innmind", part),
            Err(ProjectError::InvalidName(_))
        ));
    }

    #[test]
    fn github_urls() -> anyhow::Result<()> {
        let name = ProjectName::new("innmind", "kalmiya")?;

        assert_eq!(name.github_url(), "git@github.com:innmind/kalmiya.git");
        assert_eq!(
            name.new_repository_url(),
            "https://github.com/organizations/innmind/repositories/new"
        );

        Ok(())
    }
}
