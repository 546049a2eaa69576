//! Project scaffolding: copy a template tree and expand `*.template*` files.
//!
//! Expansion is a pure function of the template directory and the variable
//! map; nothing here runs external processes.

mod expand;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use expand::{expand, strip_template_marker};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("missing project name")]
    MissingName,

    #[error("project name '{0}' must not include / or \\")]
    InvalidName(String),

    #[error("'{0}' already exists")]
    AlreadyExists(PathBuf),

    #[error("template directory '{0}' not found")]
    TemplateNotFound(PathBuf),

    #[error("Unknown template variable \"{0}\"")]
    UnknownVariable(String),

    #[error("Unknown template variable \"{name}\" in '{path}'")]
    UnknownVariableIn { path: PathBuf, name: String },

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> TemplateError + '_ {
    move |source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A project name must be a single path component.
pub fn validate_project_name(name: &str) -> Result<(), TemplateError> {
    if name.trim().is_empty() {
        return Err(TemplateError::MissingName);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, creating `dst`.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), TemplateError> {
    fs::create_dir_all(dst).map_err(io_err(dst))?;
    for entry in fs::read_dir(src).map_err(io_err(src))? {
        let entry = entry.map_err(io_err(src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let meta = fs::metadata(&from).map_err(io_err(&from))?;
        if meta.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(io_err(&from))?;
        }
    }
    Ok(())
}

/// Expand every template file under `dir` in place.
///
/// Each `x.template.ext` is rendered to `x.ext` and then removed. Returns
/// the paths written.
pub fn expand_tree(
    dir: &Path,
    vars: &HashMap<String, String>,
) -> Result<Vec<PathBuf>, TemplateError> {
    let mut written = Vec::new();
    expand_dir(dir, vars, &mut written)?;
    written.sort();
    Ok(written)
}

fn expand_dir(
    dir: &Path,
    vars: &HashMap<String, String>,
    written: &mut Vec<PathBuf>,
) -> Result<(), TemplateError> {
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;
        if file_type.is_dir() {
            expand_dir(&path, vars, written)?;
            continue;
        }

        let Some(target_name) = entry.file_name().to_str().and_then(strip_template_marker) else {
            continue;
        };
        let target = dir.join(target_name);

        let template = fs::read_to_string(&path).map_err(io_err(&path))?;
        let rendered = expand(&template, vars).map_err(|e| match e {
            TemplateError::UnknownVariable(name) => TemplateError::UnknownVariableIn {
                path: path.clone(),
                name,
            },
            other => other,
        })?;
        fs::write(&target, rendered).map_err(io_err(&target))?;
        fs::remove_file(&path).map_err(io_err(&path))?;
        tracing::debug!(from = %path.display(), to = %target.display(), "expanded template");
        written.push(target);
    }
    Ok(())
}

/// Copy `template_dir` to `target` and expand its templates with `vars`.
pub fn scaffold(
    template_dir: &Path,
    target: &Path,
    vars: &HashMap<String, String>,
) -> Result<Vec<PathBuf>, TemplateError> {
    if !template_dir.is_dir() {
        return Err(TemplateError::TemplateNotFound(template_dir.to_path_buf()));
    }
    if target.exists() {
        return Err(TemplateError::AlreadyExists(target.to_path_buf()));
    }
    copy_tree(template_dir, target)?;
    expand_tree(target, vars)
}
