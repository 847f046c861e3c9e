//! Parser for the output of the `LIST` command.
//!
//! Unix style `ls -l` lines are turned into [`FileEntry`] records keyed by
//! their remote path:
//!
//! ```text
//! drwxr-xr-x   2 ftp      ftp          4096 Mar 12 09:41 docs
//! -rw-r--r--   1 ftp      ftp          1024 Jan  3  2023 notes.txt
//! ```
//!
//! A recursive listing (`LIST -R`) is a flat stream where short lines such as
//! `docs/drafts:` announce the directory the following entries belong to.
//! Lines with fewer than eight fields are read as such announcements. A file
//! listing with an unusual format could produce lines of that size too, so
//! the detection is best-effort.
//!
//! ```
//! use ftp_toolkit::list::{parse_listing, ListOptions, EntryType};
//!
//! let lines = [
//!     "drwxr-xr-x 2 ftp ftp 4096 Mar 12 09:41 docs",
//!     "-rw-r--r-- 1 ftp ftp 12 Jan 3 2023 notes.txt",
//!     "",
//!     "pub/docs:",
//!     "-rw-r--r-- 1 ftp ftp 5 Mar 12 09:41 draft one.txt",
//! ];
//! let listing = parse_listing("pub", &lines, &ListOptions::recursive());
//! let keys: Vec<&str> = listing.keys().map(String::as_str).collect();
//! assert_eq!(keys, ["pub/docs", "pub/notes.txt", "pub/docs/draft one.txt"]);
//! assert_eq!(listing["pub/docs"].entry_type, EntryType::Dir);
//! ```

use indexmap::IndexMap;

use super::path::RemotePath;

/// Number of fields of a regular `ls -l` entry.
const ENTRY_FIELDS: usize = 9;
/// Lines shorter than this announce a directory in recursive listings.
const ANNOUNCEMENT_MAX_FIELDS: usize = 8;

/// Kind of a listed entry, taken from the first character of its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Dir,
    Link,
    Unknown,
}

impl EntryType {
    pub fn from_mode(mode: &str) -> EntryType {
        match mode.chars().next() {
            Some('-') => EntryType::File,
            Some('d') => EntryType::Dir,
            Some('l') => EntryType::Link,
            _ => EntryType::Unknown,
        }
    }
}

/// Which kinds of entries a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    /// Everything but directories.
    Files,
    /// Everything but regular files.
    Dirs,
    #[default]
    Both,
}

impl ListFilter {
    fn accepts(self, entry_type: EntryType) -> bool {
        match self {
            ListFilter::Files => entry_type != EntryType::Dir,
            ListFilter::Dirs => entry_type != EntryType::File,
            ListFilter::Both => true,
        }
    }
}

/// How a directory should be listed and filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub recursive: bool,
    pub filter: ListFilter,
    /// Drop the `.` and `..` entries.
    pub ignore_dots: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            recursive: false,
            filter: ListFilter::Both,
            ignore_dots: true,
        }
    }
}

impl ListOptions {
    pub fn recursive() -> Self {
        ListOptions { recursive: true, ..Default::default() }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_ignore_dots(mut self, ignore_dots: bool) -> Self {
        self.ignore_dots = ignore_dots;
        self
    }
}

/// One line of a detailed listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Remote path, unique within a listing.
    pub path: String,
    pub name: String,
    pub entry_type: EntryType,
    /// Size in bytes. Only meaningful for files.
    pub size: u64,
    /// Raw mode string such as `drwxr-xr-x`.
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub link_count: u32,
    /// Month, day and time (or year) as the server wrote them.
    pub modified_month: String,
    pub modified_day: String,
    pub modified_time: String,
    /// Target of a symbolic link (`name -> target`).
    pub link_target: Option<String>,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dots(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Entries of a listing keyed by path, in the order the server sent them.
pub type Listing = IndexMap<String, FileEntry>;

/// Parses the raw lines of `LIST` output for `directory`.
///
/// Blank, `total N` and malformed lines are skipped. Directory announcements
/// are only honoured when `options.recursive` is set.
pub fn parse_listing<S: AsRef<str>>(directory: &str, lines: &[S], options: &ListOptions) -> Listing {
    let base = RemotePath::parse(directory);
    let mut prefix: Option<RemotePath> = None;
    let mut listing = Listing::new();

    for line in lines {
        let line = line.as_ref().trim_end();
        if line.trim().is_empty() || is_total_line(line) {
            continue;
        }

        let fields = split_fields(line, ENTRY_FIELDS);
        if fields.len() < ANNOUNCEMENT_MAX_FIELDS {
            if options.recursive {
                prefix = parse_announcement(line);
                trace!("listing now in {:?}", prefix);
            }
            continue;
        }
        if fields.len() != ENTRY_FIELDS {
            debug!("skipping listing line: {}", line);
            continue;
        }

        let entry_type = EntryType::from_mode(fields[0]);
        let (name, link_target) = split_link(fields[8], entry_type);
        if !options.filter.accepts(entry_type) {
            continue;
        }
        if options.ignore_dots && (name == "." || name == "..") {
            continue;
        }

        let parent = prefix.as_ref().unwrap_or(&base);
        let path = if parent.is_root() {
            name.to_string()
        } else {
            format!("{}/{}", parent, name)
        };

        listing.insert(
            path.clone(),
            FileEntry {
                path,
                name: name.to_string(),
                entry_type,
                size: fields[4].parse().unwrap_or(0),
                permissions: fields[0].to_string(),
                owner: fields[2].to_string(),
                group: fields[3].to_string(),
                link_count: fields[1].parse().unwrap_or(0),
                modified_month: fields[5].to_string(),
                modified_day: fields[6].to_string(),
                modified_time: fields[7].to_string(),
                link_target,
            },
        );
    }

    listing
}

/// Reduces `NLST` output to bare names. Some servers answer with the path
/// they were given in front of every name.
pub fn bare_names<S: AsRef<str>>(lines: &[S], ignore_dots: bool) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .map(|l| {
            let l = l.trim_end_matches('/');
            l.rsplit_once('/').map_or(l, |(_, name)| name).to_string()
        })
        .filter(|name| !(ignore_dots && (name == "." || name == "..")))
        .collect()
}

fn is_total_line(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("total"), Some(n), None) if n.chars().all(|c| c.is_ascii_digit())
    )
}

/// `pub/docs/:` or `pub//docs:` both announce `pub/docs`.
fn parse_announcement(line: &str) -> Option<RemotePath> {
    let line = line.trim();
    let path = RemotePath::parse(line.strip_suffix(':').unwrap_or(line));
    if path.is_root() && !path.is_absolute() {
        None
    } else {
        Some(path)
    }
}

fn split_link(raw: &str, entry_type: EntryType) -> (&str, Option<String>) {
    if entry_type == EntryType::Link {
        if let Some((name, target)) = raw.split_once(" -> ") {
            return (name, Some(target.to_string()));
        }
    }
    (raw, None)
}

/// Splits on runs of whitespace into at most `max` fields, the last one
/// keeping the remainder of the line.
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        if fields.len() == max - 1 {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FLAT: [&str; 7] = [
        "drwxr-xr-x    2 ftp      ftp          4096 Mar 12 09:41 .",
        "drwxr-xr-x    5 ftp      ftp          4096 Mar 12 09:41 ..",
        "drwxr-xr-x    2 ftp      ftp          4096 Mar 12 09:41 docs",
        "-rw-r--r--    1 ftp      ftp          1024 Jan  3  2023 read me.txt",
        "broken line with exactly eight fields in it",
        "lrwxrwxrwx    1 ftp      ftp             9 Feb  1 10:00 latest -> docs/v2",
        "-rw-r--r--    1 ftp ftp 7 Jan",
    ];

    fn keys(listing: &Listing) -> Vec<&str> {
        listing.keys().map(String::as_str).collect()
    }

    #[test]
    fn split_keeps_spaces_in_name() {
        assert_eq!(
            split_fields("-rw-r--r--  1 a b 10 Jan  3  2023 my  file.txt", 9),
            vec!["-rw-r--r--", "1", "a", "b", "10", "Jan", "3", "2023", "my  file.txt"]
        );
        assert_eq!(split_fields("docs:", 9), vec!["docs:"]);
    }

    #[test]
    fn flat_listing_skips_malformed_lines() {
        let listing = parse_listing("/pub", &FLAT, &ListOptions::default());
        assert_eq!(keys(&listing), vec!["/pub/docs", "/pub/read me.txt", "/pub/latest"]);

        let readme = &listing["/pub/read me.txt"];
        assert_eq!(readme.entry_type, EntryType::File);
        assert_eq!(readme.size, 1024);
        assert_eq!(readme.link_count, 1);
        assert_eq!(readme.owner, "ftp");
        assert_eq!(readme.modified_month, "Jan");
        assert_eq!(readme.modified_day, "3");
        assert_eq!(readme.modified_time, "2023");

        let latest = &listing["/pub/latest"];
        assert_eq!(latest.entry_type, EntryType::Link);
        assert_eq!(latest.name, "latest");
        assert_eq!(latest.link_target.as_deref(), Some("docs/v2"));
    }

    #[test]
    fn dots_follow_ignore_dots() {
        let with_dots = parse_listing("/pub", &FLAT, &ListOptions::default().with_ignore_dots(false));
        assert_eq!(
            keys(&with_dots),
            vec!["/pub/.", "/pub/..", "/pub/docs", "/pub/read me.txt", "/pub/latest"]
        );
        let without = parse_listing("/pub", &FLAT, &ListOptions::default());
        assert!(without.values().all(|e| !e.is_dots()));
    }

    #[test]
    fn root_directory_is_elided() {
        for dir in [".", "/", ""] {
            let listing = parse_listing(dir, &FLAT, &ListOptions::default());
            assert_eq!(keys(&listing), vec!["docs", "read me.txt", "latest"], "dir {:?}", dir);
        }
    }

    #[test]
    fn filters() {
        let files = parse_listing("d", &FLAT, &ListOptions::default().with_filter(ListFilter::Files));
        assert_eq!(keys(&files), vec!["d/read me.txt", "d/latest"]);
        let dirs = parse_listing("d", &FLAT, &ListOptions::default().with_filter(ListFilter::Dirs));
        assert_eq!(keys(&dirs), vec!["d/docs", "d/latest"]);
    }

    #[test]
    fn recursive_listing_tracks_announcements() {
        let lines = [
            "/srv:",
            "total 8",
            "drwxr-xr-x 3 u g 4096 Mar 1 10:00 a",
            "-rw-r--r-- 1 u g 3 Mar 1 10:00 top.txt",
            "",
            "/srv/a:",
            "drwxr-xr-x 2 u g 4096 Mar 1 10:00 b",
            "-rw-r--r-- 1 u g 4 Mar 1 10:00 one.txt",
            "",
            "/srv//a/b/:",
            "-rw-r--r-- 1 u g 5 Mar 1 10:00 two.txt",
        ];
        let listing = parse_listing("/srv", &lines, &ListOptions::recursive());
        assert_eq!(
            keys(&listing),
            vec!["/srv/a", "/srv/top.txt", "/srv/a/b", "/srv/a/one.txt", "/srv/a/b/two.txt"]
        );
        assert_eq!(listing["/srv/a/b/two.txt"].size, 5);
    }

    #[test]
    fn announcements_ignored_when_not_recursive() {
        let lines = ["sub:", "-rw-r--r-- 1 u g 5 Mar 1 10:00 two.txt"];
        let listing = parse_listing("top", &lines, &ListOptions::default());
        assert_eq!(keys(&listing), vec!["top/two.txt"]);
    }

    #[test]
    fn dot_announcement_resets_to_directory() {
        let lines = [
            ".:",
            "-rw-r--r-- 1 u g 1 Mar 1 10:00 a",
            "./sub:",
            "-rw-r--r-- 1 u g 1 Mar 1 10:00 b",
        ];
        let listing = parse_listing(".", &lines, &ListOptions::recursive());
        assert_eq!(keys(&listing), vec!["a", "sub/b"]);
    }

    #[test]
    fn flat_count_matches_valid_entries() {
        let mut lines = Vec::new();
        for i in 0..20 {
            lines.push(format!("-rw-r--r-- 1 u g {} Mar 1 10:00 file{}", i, i));
            if i % 3 == 0 {
                lines.push(format!("broken {} line with eight fields here", i));
            }
        }
        let listing = parse_listing("x", &lines, &ListOptions::default());
        assert_eq!(listing.len(), 20);
    }

    #[test]
    fn nlst_names_are_made_bare() {
        let names = bare_names(&["/pub/a.txt", "b.txt", "/pub/sub/", ".", ""], true);
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }
}
