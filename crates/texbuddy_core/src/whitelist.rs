//! Persistent whitelist of problem keys.
//!
//! The file holds one key per line. It is read once when a run starts and
//! only ever appended to afterwards, one whole line per write.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::problem::Problem;

/// Errors raised by [`Whitelist`].
#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("Failed to read whitelist {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write whitelist {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Keys are stored one per line and may not span lines.
    #[error("Invalid whitelist key {0:?}")]
    InvalidKey(String),
}

/// A loaded whitelist bound to its backing file.
#[derive(Debug, Clone)]
pub struct Whitelist {
    path: PathBuf,
    keys: HashSet<String>,
    /// The file exists and does not end with a line break.
    needs_newline: bool,
}

impl Whitelist {
    /// Loads the whitelist at `path`. A missing file is an empty whitelist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, WhitelistError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Whitelist {} does not exist yet", path.display());
                String::new()
            }
            Err(source) => return Err(WhitelistError::Read { path, source }),
        };

        let keys: HashSet<String> = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        debug!("Loaded {} whitelist key(s) from {}", keys.len(), path.display());

        Ok(Self {
            needs_newline: !content.is_empty() && !content.ends_with('\n'),
            path,
            keys,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Appends `key` to the file unless it is already whitelisted.
    ///
    /// Returns whether the key was new.
    pub fn add(&mut self, key: &str) -> Result<bool, WhitelistError> {
        if key.trim().is_empty() || key.contains(['\n', '\r']) {
            return Err(WhitelistError::InvalidKey(key.to_string()));
        }
        if self.contains(key) {
            debug!("'{key}' is already whitelisted");
            return Ok(false);
        }

        let mut entry = String::with_capacity(key.len() + 2);
        if self.needs_newline {
            entry.push('\n');
        }
        entry.push_str(key);
        entry.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()))
            .map_err(|source| WhitelistError::Write {
                path: self.path.clone(),
                source,
            })?;

        self.needs_newline = false;
        self.keys.insert(key.to_string());
        info!("Whitelisted '{key}'");
        Ok(true)
    }

    /// Adds several keys, returning how many were new.
    pub fn add_all<'a, I>(&mut self, keys: I) -> Result<usize, WhitelistError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for key in keys {
            if self.add(key)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Removes every problem whose key is whitelisted.
    pub fn filter(&self, problems: Vec<Problem>) -> Vec<Problem> {
        problems
            .into_iter()
            .filter(|problem| !self.contains(problem.key()))
            .collect()
    }
}

/// Whitelist keys for the words of a word list, one word per line.
pub fn wordlist_keys(wordlist: &str, language: &str) -> Vec<String> {
    wordlist
        .lines()
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(|word| format!("{language}/spelling/{word}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sorted_keys(whitelist: &Whitelist) -> Vec<&str> {
        let mut keys: Vec<&str> = whitelist.keys().collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let whitelist = Whitelist::load(dir.path().join("whitelist")).unwrap();
        assert!(whitelist.is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        fs::write(&path, "a\n\n  \nb\r\n").unwrap();

        let whitelist = Whitelist::load(&path).unwrap();
        assert_eq!(sorted_keys(&whitelist), vec!["a", "b"]);
    }

    #[test]
    fn test_roundtrip_add() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        fs::write(&path, "a\nb\n").unwrap();

        let mut whitelist = Whitelist::load(&path).unwrap();
        assert!(whitelist.add("c").unwrap());

        let reloaded = Whitelist::load(&path).unwrap();
        assert_eq!(sorted_keys(&reloaded), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");

        let mut whitelist = Whitelist::load(&path).unwrap();
        assert!(whitelist.add("en/spelling/Dongbei").unwrap());
        assert!(!whitelist.add("en/spelling/Dongbei").unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), "en/spelling/Dongbei\n");
    }

    #[test]
    fn test_add_after_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        fs::write(&path, "a").unwrap();

        let mut whitelist = Whitelist::load(&path).unwrap();
        whitelist.add("b").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        let mut whitelist = Whitelist::load(&path).unwrap();

        assert!(matches!(
            whitelist.add("two\nlines"),
            Err(WhitelistError::InvalidKey(_))
        ));
        assert!(matches!(whitelist.add(" "), Err(WhitelistError::InvalidKey(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_add_all_counts_new_keys() {
        let dir = TempDir::new().unwrap();
        let mut whitelist = Whitelist::load(dir.path().join("whitelist")).unwrap();
        let added = whitelist.add_all(["x", "y", "x"]).unwrap();
        assert_eq!(added, 2);
    }

    #[test]
    fn test_filter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        fs::write(&path, "Chktex/18/``\n").unwrap();
        let whitelist = Whitelist::load(&path).unwrap();

        let problems = vec![
            Problem::builder("Chktex", "``").with_type("18").build(),
            Problem::builder("Chktex", "''").with_type("18").build(),
        ];
        let kept = whitelist.filter(problems);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text(), "''");
    }

    #[test]
    fn test_wordlist_keys() {
        let keys = wordlist_keys("Dongbei\n\n  texbuddy \n", "en");
        assert_eq!(keys, vec!["en/spelling/Dongbei", "en/spelling/texbuddy"]);
    }
}
