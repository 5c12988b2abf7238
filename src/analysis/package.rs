//! Packages: naming, local-package assembly, imports and file sets.

use super::Analyzer;
use crate::error::{Result, RefError};
use crate::syntax::{read_package_clause, FileId, ParsedFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Index of a package in the analyzer's package arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(pub u32);

/// Files sharing one package scope.
#[derive(Debug, Clone)]
pub struct Package {
    /// Arena index.
    pub id: PackageId,
    /// Name from the package clause.
    pub name: String,
    /// Directory holding the files.
    pub dir: PathBuf,
    /// Member files in the order they were added.
    pub files: Vec<FileId>,
}

/// Outcome of local-package assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalPackage {
    /// Sibling files were merged into the target file's package.
    Merged {
        /// The package now holding the target and its siblings.
        package: PackageId,
        /// Number of sibling files added.
        added: usize,
        /// Sibling files that belong to the package but failed to parse.
        skipped: Vec<PathBuf>,
    },
    /// The target file is alone in its package.
    NoAdditionalFiles,
}

/// A package from a scanned file set, with its parsed files.
#[derive(Debug, Clone)]
pub struct ScanPackage {
    /// Package id.
    pub package: PackageId,
    /// Files in the order they were supplied.
    pub files: Vec<Rc<ParsedFile>>,
}

fn is_go_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".go") && !name.starts_with('.')
}

fn go_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RefError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_go_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl Analyzer {
    pub(crate) fn create_package(&self, name: &str, dir: &Path) -> PackageId {
        let mut packages = self.packages.borrow_mut();
        let id = PackageId(packages.len() as u32);
        packages.push(Package {
            id,
            name: name.to_string(),
            dir: dir.to_path_buf(),
            files: Vec::new(),
        });
        id
    }

    pub(crate) fn add_to_package(&self, package: PackageId, file: FileId) {
        if let Some(pkg) = self.packages.borrow_mut().get_mut(package.0 as usize) {
            if !pkg.files.contains(&file) {
                pkg.files.push(file);
            }
        }
        self.file_packages.borrow_mut().insert(file, package);
    }

    /// Package name of a file.
    ///
    /// When the directory name differs from the package clause, the clause
    /// is the name. Otherwise the name is the directory relative to the
    /// first search root holding it, which is also how other packages
    /// import it; with no such root the clause is used.
    pub(crate) fn package_name(&self, path: &Path) -> String {
        if let Some(name) = self.package_names.borrow().get(path) {
            return name.clone();
        }

        let name = self.compute_package_name(path);
        self.package_names
            .borrow_mut()
            .insert(path.to_path_buf(), name.clone());
        name
    }

    fn compute_package_name(&self, path: &Path) -> String {
        let Some(clause) = read_package_clause(path) else {
            return String::new();
        };
        let Some(dir) = path.parent() else {
            return clause;
        };
        let base = dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if base != clause {
            return clause;
        }

        for root in &self.config.roots {
            if let Ok(rel) = dir.strip_prefix(root) {
                if !rel.as_os_str().is_empty() {
                    return slash_path(rel);
                }
            }
        }
        clause
    }

    /// Merge same-directory files with the same package name into the
    /// package of `file`.
    pub(crate) fn assemble_local(&self, file: &ParsedFile) -> Result<LocalPackage> {
        let dir = match file.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let package = match self.package_of(file.id) {
            Some(id) => id,
            None => {
                let id = self.create_package(&file.package_clause, &dir);
                self.add_to_package(id, file.id);
                id
            }
        };
        let name = self.package_name(&file.path);

        let mut added = 0;
        let mut skipped = Vec::new();
        for candidate in go_files_in(&dir)? {
            if candidate == file.path || self.package_name(&candidate) != name {
                continue;
            }
            match self.load_file(&candidate) {
                Ok(sibling) => {
                    self.add_to_package(package, sibling.id);
                    added += 1;
                }
                Err(e) => {
                    log::warn!("local package: skipping {}: {}", candidate.display(), e);
                    skipped.push(candidate);
                }
            }
        }

        if added == 0 && skipped.is_empty() {
            return Ok(LocalPackage::NoAdditionalFiles);
        }
        Ok(LocalPackage::Merged {
            package,
            added,
            skipped,
        })
    }

    /// Parse `paths` and group them by directory and package clause.
    pub(crate) fn parse_file_set(&self, paths: &[PathBuf]) -> Result<Vec<ScanPackage>> {
        let mut order: Vec<ScanPackage> = Vec::new();
        let mut index: HashMap<(PathBuf, String), usize> = HashMap::new();

        for path in paths {
            let file = match self.load_file(path) {
                Ok(file) => file,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let key = (dir.clone(), file.package_clause.clone());
            let slot = match index.get(&key) {
                Some(slot) => *slot,
                None => {
                    let package = self.create_package(&file.package_clause, &dir);
                    order.push(ScanPackage {
                        package,
                        files: Vec::new(),
                    });
                    index.insert(key, order.len() - 1);
                    order.len() - 1
                }
            };
            self.add_to_package(order[slot].package, file.id);
            order[slot].files.push(file);
        }

        if order.is_empty() {
            return Err(RefError::NoPackagesFound);
        }
        Ok(order)
    }

    /// Package behind an import path, loaded on first use.
    pub(crate) fn import_package(&self, import_path: &str) -> Option<PackageId> {
        let dir = self
            .config
            .roots
            .iter()
            .map(|root| root.join(import_path))
            .find(|dir| dir.is_dir())?;

        if let Some(cached) = self.imports.borrow().get(&dir) {
            return *cached;
        }
        let loaded = self.load_directory(&dir);
        self.imports.borrow_mut().insert(dir, loaded);
        loaded
    }

    fn load_directory(&self, dir: &Path) -> Option<PackageId> {
        let paths = match go_files_in(dir) {
            Ok(paths) => paths,
            Err(e) => {
                log::debug!("import: {}", e);
                return None;
            }
        };

        let mut package: Option<PackageId> = None;
        for path in paths {
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_test.go"));
            if is_test {
                continue;
            }
            let file = match self.load_file(&path) {
                Ok(file) => file,
                Err(e) => {
                    log::debug!("import: skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let id = match package {
                Some(id) => id,
                None => {
                    let id = self.create_package(&file.package_clause, dir);
                    package = Some(id);
                    id
                }
            };
            let same_clause = self
                .package(id)
                .is_some_and(|pkg| pkg.name == file.package_clause);
            if same_clause {
                self.add_to_package(id, file.id);
            }
        }
        package
    }

    /// Clause name of the package an import path points to.
    pub(crate) fn imported_package_name(&self, import_path: &str) -> Option<String> {
        let id = self.import_package(import_path)?;
        self.package(id).map(|pkg| pkg.name)
    }
}
