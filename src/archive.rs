use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, trace};
use regex_lite::Regex;
use thiserror::Error;
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const ARCHIVE_PREFIX: &str = "cx.";
pub const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Invalid exclusion pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex_lite::Error,
    },
    #[error("Archive source {0} is not a directory")]
    MissingSource(PathBuf),
    #[error("Error while walking archive source: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Packages a directory into a single compressed file.
pub trait Archiver: Send + Sync {
    /// `exclusions` is a comma separated list of glob patterns, empty for none.
    fn write_archive(
        &self,
        source: &Path,
        destination: &Path,
        exclusions: &str,
    ) -> Result<(), ArchiveError>;
}

/// Fresh `cx.<uuid>.zip` path inside `base_dir`.
pub fn archive_path(base_dir: &Path) -> PathBuf {
    base_dir.join(format!("{ARCHIVE_PREFIX}{}{ARCHIVE_EXTENSION}", Uuid::new_v4()))
}

/// Glob based exclusion list.
///
/// Patterns containing a `/` are matched against the whole path relative to the archive
/// root, other patterns against the file name at any depth. `**` crosses directories,
/// `*` and `?` stay within one path segment, and a trailing `/` matches everything under
/// a directory.
#[derive(Debug, Default)]
pub struct ExclusionFilter {
    rules: Vec<ExclusionRule>,
}

#[derive(Debug)]
struct ExclusionRule {
    regex: Regex,
    anchored: bool,
}

impl ExclusionFilter {
    pub fn parse(exclusions: &str) -> Result<Self, ArchiveError> {
        let rules = exclusions
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(ExclusionRule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExclusionFilter { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `path` uses `/` separators and is relative to the archive root.
    pub fn is_excluded(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        self.rules.iter().any(|rule| {
            if rule.anchored {
                rule.regex.is_match(path)
            } else {
                rule.regex.is_match(file_name)
            }
        })
    }
}

impl ExclusionRule {
    fn parse(pattern: &str) -> Result<Self, ArchiveError> {
        let mut glob = pattern.trim_start_matches("./").to_owned();
        let mut anchored = glob.starts_with('/');
        glob = glob.trim_start_matches('/').to_owned();
        if glob.ends_with('/') {
            glob.push_str("**");
        }
        anchored |= glob.contains('/');

        let regex = Regex::new(&glob_to_regex(&glob)).map_err(|source| {
            ArchiveError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            }
        })?;
        Ok(ExclusionRule { regex, anchored })
    }
}

fn glob_to_regex(glob: &str) -> String {
    let (body, subtree) = match glob.strip_suffix("/**") {
        Some(body) => (body, true),
        None => (glob, false),
    };

    let mut regex = String::from("^");
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    regex.push_str("(?:.*/)?");
                } else {
                    regex.push_str(".*");
                }
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            c => regex.push_str(&regex_lite::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    // `dir/**` also matches `dir` itself so the whole subtree is pruned
    if subtree {
        regex.push_str("(?:/.*)?");
    }
    regex.push('$');
    regex
}

/// [`Archiver`] writing deflated ZIP files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn write_archive(
        &self,
        source: &Path,
        destination: &Path,
        exclusions: &str,
    ) -> Result<(), ArchiveError> {
        let filter = ExclusionFilter::parse(exclusions)?;
        if !source.is_dir() {
            return Err(ArchiveError::MissingSource(source.to_path_buf()));
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Archiving {} to {}", source.display(), destination.display());
        let result = write_zip(source, destination, &filter);
        if result.is_err() {
            // Never leave a truncated archive behind.
            let _ = std::fs::remove_file(destination);
        }
        result
    }
}

fn write_zip(
    source: &Path,
    destination: &Path,
    filter: &ExclusionFilter,
) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(destination)?));

    let entries = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let excluded = filter.is_excluded(&entry_name(source, entry.path()));
            if excluded {
                trace!("Excluding {}", entry.path().display());
            }
            !excluded
        });

    let mut files = 0usize;
    for entry in entries {
        let entry = entry?;
        let name = entry_name(source, entry.path());
        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(format!("{name}/"), entry_options(&entry)?)?;
        } else if file_type.is_file() {
            zip.start_file(name, entry_options(&entry)?)?;
            let mut file = File::open(entry.path())?;
            std::io::copy(&mut file, &mut zip)?;
            files += 1;
        } else {
            debug!("Skipping {}, not a regular file", entry.path().display());
        }
    }

    zip.finish()?.flush()?;
    debug!("Archived {} files into {}", files, destination.display());
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn entry_options(entry: &DirEntry) -> Result<SimpleFileOptions, ArchiveError> {
    let metadata = entry.metadata()?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u64::from(u32::MAX));

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };

    Ok(options)
}
