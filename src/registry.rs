//! Discovery of modules on the search path and resolution of module names.

use crate::error::{ModmError, ModmResult};
use crate::natsort::natsort_by_key;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File naming the default version of a module.
pub const DEFAULT_FILE: &str = ".default";
/// Help text of a module.
pub const HELP_FILE: &str = ".help";
/// Category label of a module.
pub const CATEGORY_FILE: &str = ".category";

/// Basename of a version file, i.e. the version name.
pub fn version_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// A requested module, split into module name and optional version.
///
/// `foo` names the module only, `foo/2.0` names module and version. Only the
/// last two components are significant, so `path/to/foo/2.0` is `foo/2.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleName<'a> {
    pub module: &'a str,
    pub version: Option<&'a str>,
}

impl<'a> ModuleName<'a> {
    pub fn parse(name: &'a str) -> Self {
        let Some((head, tail)) = name.rsplit_once('/') else {
            return Self {
                module: name,
                version: None,
            };
        };
        let head = head.trim_end_matches('/');
        if head.is_empty() {
            return Self {
                module: tail,
                version: None,
            };
        }
        let module = head.rsplit('/').next().unwrap_or(head);
        Self {
            module,
            version: (!tail.is_empty()).then_some(tail),
        }
    }

    /// Decode a version file path into `module/version`.
    pub fn from_file(path: &'a Path) -> Self {
        let module = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self {
            module,
            version: Some(version_name(path)),
        }
    }
}

/// Everything known about one module after discovery.
#[derive(Debug, Clone, Default)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Version files, unique by basename, in natural order.
    pub versions: Vec<PathBuf>,
    pub default: Option<PathBuf>,
    pub category: Option<String>,
    pub help_file: Option<PathBuf>,
    pub loaded: Option<PathBuf>,
}

impl ModuleDescriptor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Version file whose basename is `version`.
    pub fn version(&self, version: &str) -> Option<&Path> {
        self.versions
            .iter()
            .find(|v| version_name(v) == version)
            .map(PathBuf::as_path)
    }

    pub fn is_default(&self, version: &Path) -> bool {
        self.default.as_deref() == Some(version)
    }

    fn add_file(&mut self, dir: &Path, file: &Path, loaded: &[PathBuf]) {
        match version_name(file) {
            DEFAULT_FILE => {
                if self.default.is_some() {
                    return;
                }
                match fs::read_to_string(file) {
                    Ok(content) => {
                        let candidate = dir.join(content.trim());
                        if !content.trim().is_empty() && candidate.is_file() {
                            self.default = Some(candidate);
                        } else {
                            warn!("{}: default version '{}' does not exist", file.display(), content.trim());
                        }
                    }
                    Err(e) => warn!("cannot read {}: {}", file.display(), e),
                }
            }
            HELP_FILE => {
                if self.help_file.is_none() {
                    self.help_file = Some(file.to_path_buf());
                }
            }
            CATEGORY_FILE => {
                if self.category.is_some() {
                    return;
                }
                match fs::read_to_string(file) {
                    Ok(content) if !content.trim().is_empty() => {
                        self.category = Some(content.trim().to_string());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("cannot read {}: {}", file.display(), e),
                }
            }
            version => {
                if self.version(version).is_none() {
                    self.versions.push(file.to_path_buf());
                }
                if loaded.iter().any(|l| l == file) {
                    self.loaded = Some(file.to_path_buf());
                }
            }
        }
    }
}

/// All modules found on the search path.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: Vec<ModuleDescriptor>,
}

impl Registry {
    /// Scan `search_dirs` in order. The first directory providing a module
    /// fixes its default, help, and category; later ones may add versions.
    ///
    /// Directories that cannot be read are skipped with a warning.
    pub fn discover(search_dirs: &[PathBuf], loaded: &[PathBuf]) -> Self {
        let mut modules: Vec<ModuleDescriptor> = Vec::new();

        for dir in search_dirs {
            for module_dir in sorted_entries(dir).into_iter().filter(|p| p.is_dir()) {
                let Some(name) = module_dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let index = match modules.iter().position(|m| m.name == name) {
                    Some(index) => index,
                    None => {
                        modules.push(ModuleDescriptor::new(name));
                        modules.len() - 1
                    }
                };
                for file in sorted_entries(&module_dir).into_iter().filter(|p| p.is_file()) {
                    modules[index].add_file(&module_dir, &file, loaded);
                }
            }
        }

        let mut modules: Vec<ModuleDescriptor> = modules
            .into_iter()
            .filter(|m| {
                if m.versions.is_empty() {
                    debug!("ignoring module '{}' without versions", m.name);
                }
                !m.versions.is_empty()
            })
            .collect();
        natsort_by_key(&mut modules, |m| m.name.as_str());
        for module in &mut modules {
            natsort_by_key(&mut module.versions, |v| version_name(v));
            if module.default.is_none() {
                module.default = module.versions.last().cloned();
            }
        }

        debug!("discovered {} module(s)", modules.len());
        Self { modules }
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn get(&self, index: usize) -> Option<&ModuleDescriptor> {
        self.modules.get(index)
    }

    /// Index of the module named by `name`. With `strict`, a version given in
    /// `name` must exist as well.
    pub fn find(&self, name: &str, strict: bool) -> Option<usize> {
        let requested = ModuleName::parse(name);
        let index = self
            .modules
            .iter()
            .position(|m| m.name == requested.module)?;
        match requested.version {
            Some(version) if strict => self.modules[index].version(version).map(|_| index),
            _ => Some(index),
        }
    }

    /// Version file for `name`: the default version when none is given.
    pub fn resolve_file(&self, name: &str) -> ModmResult<PathBuf> {
        let not_found = || ModmError::NotFound(name.to_string());
        let module = self
            .find(name, false)
            .and_then(|i| self.get(i))
            .ok_or_else(not_found)?;
        let file = match ModuleName::parse(name).version {
            None => module.default.as_deref(),
            Some(version) => module.version(version),
        };
        file.map(Path::to_path_buf).ok_or_else(not_found)
    }
}

/// Entries of `dir` in a stable order, or nothing if it cannot be listed.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            paths.sort();
            paths
        }
        Err(e) => {
            warn!("cannot list {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}
