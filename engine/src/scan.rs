//! Source project scanning.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use transmute_types::ProjectScan;

pub const BUILD_FILE_NAMES: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

pub const CONFIG_FILE_NAMES: &[&str] = &[
    "web.xml",
    "persistence.xml",
    "ejb-jar.xml",
    "beans.xml",
    "application.xml",
    "standalone.xml",
    "domain.xml",
];

const VCS_DIRS: &[&str] = &[".git"];

/// Build output directories, pruned only beside a build file so that Java
/// packages named `build` or `target` are still scanned.
const BUILD_OUTPUT_DIRS: &[&str] = &["target", "build"];

const POM_TRUNCATION_MARKER: &str = "\n... (file truncated)";

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Source directory {path:?} not found or is not a directory")]
    NotADirectory { path: PathBuf },
}

/// Walk `source_dir` and record what a migration needs to know about it.
///
/// Ignore files are not honored; hidden files are included. Walk errors on
/// individual entries are logged and skipped.
pub fn scan_project(source_dir: &Path, max_pom_bytes: usize) -> Result<ProjectScan, ScanError> {
    if !source_dir.is_dir() {
        return Err(ScanError::NotADirectory {
            path: source_dir.to_path_buf(),
        });
    }
    tracing::info!(source = %source_dir.display(), "Scanning project directory");

    let walker = WalkBuilder::new(source_dir)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && entry.depth() > 0 && is_pruned_dir(entry.path()))
        })
        .build();

    let mut scan = ProjectScan::default();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let relative = to_slash(relative);
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if relative.starts_with("src/main/java") || relative.starts_with("src/main/kotlin") {
                scan.src_main_java_exists = true;
            }
            scan.directories.push(relative);
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".java") {
            scan.java_files.push(relative.clone());
        }
        if BUILD_FILE_NAMES.contains(&name.as_ref()) {
            scan.build_files.push(relative.clone());
            if name == "pom.xml" && scan.pom_xml_head.is_none() {
                match read_head(entry.path(), max_pom_bytes) {
                    Ok(head) => scan.pom_xml_head = Some(head),
                    Err(e) => tracing::warn!(path = %relative, "Could not read pom.xml: {e}"),
                }
            }
        } else if CONFIG_FILE_NAMES.contains(&name.as_ref()) {
            scan.config_files.push(relative.clone());
        }
        scan.files.push(relative);
    }

    tracing::info!(
        files = scan.files.len(),
        java_files = scan.java_files.len(),
        directories = scan.directories.len(),
        "Scan complete"
    );
    if !scan.build_files.is_empty() {
        tracing::info!(build_files = ?scan.build_files, "Potential build files");
    }
    if !scan.config_files.is_empty() {
        tracing::info!(config_files = ?scan.config_files, "Potential config files");
    }
    if scan.src_main_java_exists {
        tracing::info!("Found src/main/java or src/main/kotlin structure");
    }

    Ok(scan)
}

fn is_pruned_dir(dir: &Path) -> bool {
    let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if VCS_DIRS.contains(&name) {
        return true;
    }
    if !BUILD_OUTPUT_DIRS.contains(&name) {
        return false;
    }
    let beside_build_file = dir
        .parent()
        .is_some_and(|parent| BUILD_FILE_NAMES.iter().any(|b| parent.join(b).is_file()));
    if beside_build_file {
        tracing::debug!(dir = %dir.display(), "Skipping build output directory");
    }
    beside_build_file
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// First `max_bytes` of a file as lossy UTF-8, marked when cut.
fn read_head(path: &Path, max_bytes: usize) -> io::Result<String> {
    let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
    File::open(path)?
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut buf)?;
    let truncated = buf.len() > max_bytes;
    buf.truncate(max_bytes);
    let mut head = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        head.push_str(POM_TRUNCATION_MARKER);
    }
    Ok(head)
}
