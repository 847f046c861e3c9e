//! File level operations on top of a [`Transport`].
//!
//! `FtpClient` answers questions such as "does this path exist" or "how big
//! is this file" with plain commands and listings, and implements recursive
//! operations (remove, copy, find) that FTP itself does not offer.
//!
//! ```no_run
//! use ftp_toolkit::{Connection, FtpClient, FtpConfig};
//!
//! let connection = Connection::anonymous("127.0.0.1", 21);
//! let mut client = FtpClient::connect(&connection, FtpConfig::default()).unwrap();
//! for entry in client.find(r"/\.txt$/i", "/pub", true).unwrap() {
//!     println!("{} {}", entry.path, entry.size);
//! }
//! client.quit().unwrap();
//! ```

use std::cmp::Reverse;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;

use super::config::FtpConfig;
use super::connection::Connection;
use super::ftp::FtpStream;
use super::list::{bare_names, parse_listing, FileEntry, ListFilter, ListOptions, Listing};
use super::path::RemotePath;
use super::reply::Reply;
use super::transfer::{Clock, SystemClock, TransferEngine, TransferJob, TransferProgress};
use super::transport::{TransferDirection, Transport};
use super::types::{FtpError, Line, Result};

/// High level client over a single control connection.
pub struct FtpClient<T: Transport> {
    transport: T,
    config: FtpConfig,
    features: Option<Vec<String>>,
    clock: Box<dyn Clock>,
}

impl<T: Transport + fmt::Debug> fmt::Debug for FtpClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FtpClient")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl FtpClient<FtpStream> {
    /// Opens `connection` and wraps the logged-in stream.
    pub fn connect(connection: &Connection, config: FtpConfig) -> Result<Self> {
        let stream = connection.open(&config)?;
        Ok(FtpClient::new(stream, config))
    }

    /// Sends `QUIT` and closes the connection.
    pub fn quit(mut self) -> Result<()> {
        self.transport.quit()
    }
}

impl<T: Transport> FtpClient<T> {
    pub fn new(transport: T, config: FtpConfig) -> Self {
        FtpClient {
            transport,
            config,
            features: None,
            clock: Box::new(SystemClock::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn config(&self) -> &FtpConfig {
        &self.config
    }

    /// Clock used to time the non-blocking transfers.
    pub fn set_clock<C: Clock + 'static>(&mut self, clock: C) {
        self.clock = Box::new(clock);
    }

    // Raw commands

    /// Sends `command` and parses the reply, whatever its code.
    ///
    /// A blank command is refused without contacting the server.
    pub fn raw(&mut self, command: &str) -> Result<Reply> {
        let command = command.trim();
        if command.is_empty() {
            return Err(FtpError::InvalidCommand("empty command".to_string()));
        }
        let lines = self.transport.send_command(command)?;
        if lines.is_empty() {
            return Err(FtpError::InvalidResponse(format!("no reply to {}", command)));
        }
        Ok(Reply::parse(&lines))
    }

    /// Like [`raw`](FtpClient::raw) but a negative reply is an error.
    fn command(&mut self, command: &str) -> Result<Reply> {
        let reply = self.raw(command)?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(rejected(&reply))
        }
    }

    /// Runs `SITE <command>`.
    pub fn site(&mut self, command: &str) -> Result<Reply> {
        let command = command.trim();
        if command.is_empty() {
            return Err(FtpError::InvalidCommand("empty SITE command".to_string()));
        }
        self.command(&format!("SITE {}", command))
    }

    /// Runs `SITE EXEC <command>`.
    pub fn exec(&mut self, command: &str) -> Result<Reply> {
        let command = command.trim();
        if command.is_empty() {
            return Err(FtpError::InvalidCommand("empty SITE EXEC command".to_string()));
        }
        self.site(&format!("EXEC {}", command))
    }

    /// `SITE` subcommands listed by `HELP SITE`, upper-cased. A single line
    /// reply lists them in its message.
    pub fn supported_site_commands(&mut self) -> Result<Vec<String>> {
        let reply = self.command("HELP SITE")?;
        let lines = match reply.body {
            Some(body) => body,
            None => vec![reply.message],
        };
        let mut commands = Vec::new();
        for line in &lines {
            for word in line.split_whitespace() {
                if word.chars().all(|c| c.is_ascii_alphabetic()) {
                    let word = word.to_ascii_uppercase();
                    if !commands.contains(&word) {
                        commands.push(word);
                    }
                }
            }
        }
        Ok(commands)
    }

    /// Text of the `SYST` reply.
    pub fn system(&mut self) -> Result<String> {
        Ok(self.command("SYST")?.message)
    }

    /// Features from `FEAT`, queried once per client. A server that does not
    /// know `FEAT` has no features.
    pub fn features(&mut self) -> Result<Vec<String>> {
        if let Some(features) = &self.features {
            return Ok(features.clone());
        }
        let features = match self.transport.features() {
            Ok(features) => features,
            Err(err) if err.is_rejection() => {
                debug!("FEAT refused: {}", err);
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        self.features = Some(features.clone());
        Ok(features)
    }

    /// `true` if a `FEAT` line starts with `name`, ignoring case.
    pub fn is_feature_supported(&mut self, name: &str) -> Result<bool> {
        Ok(self.features()?.iter().any(|feature| {
            feature
                .split_whitespace()
                .next()
                .map_or(false, |word| word.eq_ignore_ascii_case(name))
        }))
    }

    // Navigation

    pub fn current_dir(&mut self) -> Result<String> {
        self.transport.current_directory()
    }

    pub fn change_dir(&mut self, path: &str) -> Result<()> {
        self.transport.change_directory(path)
    }

    /// Moves to the parent of the working directory.
    pub fn back(&mut self) -> Result<()> {
        self.transport.parent_directory()
    }

    /// Absolute path of the parent of `path`, as resolved by the server.
    /// The working directory is left as it was.
    pub fn parent_dir(&mut self, path: &str) -> Result<String> {
        let saved = self.current_dir()?;
        let parent = self
            .transport
            .change_directory(path)
            .and_then(|_| self.transport.parent_directory())
            .and_then(|_| self.transport.current_directory());
        self.transport.change_directory(&saved)?;
        parent
    }

    // Queries

    /// Tries `CWD` on `path` and moves back. A refused `CWD` means `false`,
    /// any other failure is an error.
    pub fn is_dir(&mut self, path: &str) -> Result<bool> {
        let saved = self.current_dir()?;
        match self.transport.change_directory(path) {
            Ok(()) => {
                self.transport.change_directory(&saved)?;
                Ok(true)
            }
            Err(err) if err.is_rejection() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn is_file(&mut self, path: &str) -> Result<bool> {
        Ok(self.exists(path)? && !self.is_dir(path)?)
    }

    /// Looks for the name of `path` in a name listing of its parent.
    pub fn exists(&mut self, path: &str) -> Result<bool> {
        let path = RemotePath::parse(path);
        let name = match path.file_name() {
            Some(name) => name,
            None => return Ok(true),
        };
        let names = match self.transport.name_list(&path.parent().to_string()) {
            Ok(lines) => bare_names(&lines, false),
            Err(err) if err.is_rejection() => return Ok(false),
            Err(err) => return Err(err),
        };
        Ok(names.iter().any(|n| n == name))
    }

    /// Size of the file at `path`.
    ///
    /// Uses `SIZE` when the server advertises it and the parent's listing
    /// otherwise.
    pub fn size(&mut self, path: &str) -> Result<u64> {
        if self.is_dir(path)? {
            return Err(FtpError::PathIsDirectory(path.to_string()));
        }
        if self.is_feature_supported("SIZE")? {
            match self.transport.file_size(path) {
                Ok(Some(size)) => return Ok(size),
                Ok(None) => {}
                Err(err) if err.is_rejection() => debug!("SIZE {} refused: {}", path, err),
                Err(err) => return Err(err),
            }
        }
        self.size_from_listing(path)
    }

    fn size_from_listing(&mut self, path: &str) -> Result<u64> {
        let remote = RemotePath::parse(path);
        let name = remote.file_name().ok_or_else(|| FtpError::NotFound(path.to_string()))?;
        let parent = remote.parent().to_string();
        let lines = match self.transport.list_directory(&parent, false) {
            Ok(lines) => lines,
            Err(err) if err.is_rejection() => return Err(FtpError::NotFound(path.to_string())),
            Err(err) => return Err(err),
        };
        let options = ListOptions::default().with_filter(ListFilter::Files);
        parse_listing(&parent, &lines, &options)
            .values()
            .find(|entry| entry.name == name)
            .map(|entry| entry.size)
            .ok_or_else(|| FtpError::NotFound(path.to_string()))
    }

    /// Sum of the sizes of every file below `dir`.
    pub fn dir_size(&mut self, dir: &str) -> Result<u64> {
        let options = ListOptions::recursive().with_filter(ListFilter::Files);
        Ok(self
            .list_dir_details(dir, &options)?
            .values()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.size)
            .sum())
    }

    pub fn count(&mut self, dir: &str, options: &ListOptions) -> Result<usize> {
        Ok(self.list_dir_details(dir, options)?.len())
    }

    /// `true` when `dir` has no entries besides `.` and `..`.
    pub fn is_empty(&mut self, dir: &str) -> Result<bool> {
        Ok(self.count(dir, &ListOptions::default())? == 0)
    }

    /// Names in `dir` from `NLST`, without any leading path.
    pub fn list_dir(&mut self, dir: &str, ignore_dots: bool) -> Result<Vec<String>> {
        let lines = self.transport.name_list(dir)?;
        Ok(bare_names(&lines, ignore_dots))
    }

    /// Parsed `LIST` of `dir`.
    pub fn list_dir_details(&mut self, dir: &str, options: &ListOptions) -> Result<Listing> {
        let lines = self.transport.list_directory(dir, options.recursive)?;
        Ok(parse_listing(dir, &lines, options))
    }

    pub fn last_modified(&mut self, path: &str) -> Result<DateTime<Utc>> {
        self.transport
            .modification_time(path)?
            .ok_or_else(|| FtpError::InvalidResponse(format!("no modification time for {}", path)))
    }

    // Mutations

    /// Creates `path` and any missing directory above it. Fails if `path`
    /// already is a directory.
    pub fn create_dir(&mut self, path: &str) -> Result<()> {
        if self.is_dir(path)? {
            return Err(FtpError::OperationFailed(format!("{} already exists", path)));
        }
        self.ensure_dir(&RemotePath::parse(path))
    }

    fn ensure_dir(&mut self, path: &RemotePath) -> Result<()> {
        let mut current = if path.is_absolute() {
            RemotePath::root()
        } else {
            RemotePath::default()
        };
        for segment in path.segments() {
            current = current.join(segment.as_str());
            let current = current.to_string();
            if !self.is_dir(&current)? {
                debug!("creating {}", current);
                self.transport.create_directory(&current)?;
            }
        }
        Ok(())
    }

    /// Writes `content` to `path`, replacing any existing file.
    pub fn create_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        if self.is_dir(path)? {
            return Err(FtpError::PathIsDirectory(path.to_string()));
        }
        let mut source = content;
        self.transport.store(path, 0, &mut source)?;
        Ok(())
    }

    /// Adds `content` at the end of `path`, creating it if needed.
    pub fn append_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let offset = match self.size(path) {
            Ok(size) => size,
            Err(FtpError::NotFound(_)) => 0,
            Err(err) => return Err(err),
        };
        let mut source = content;
        self.transport.store(path, offset, &mut source)?;
        Ok(())
    }

    /// Whole content of the file at `path`.
    pub fn file_content(&mut self, path: &str) -> Result<Vec<u8>> {
        if self.is_dir(path)? {
            return Err(FtpError::PathIsDirectory(path.to_string()));
        }
        let mut content = Vec::new();
        self.transport.retrieve(path, 0, &mut content)?;
        Ok(content)
    }

    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        self.transport.remove_file(path)
    }

    /// Removes `path` with everything below it.
    ///
    /// Entries are removed deepest first so that every directory is empty
    /// by the time it is removed.
    pub fn remove_dir(&mut self, path: &str) -> Result<()> {
        if !self.is_dir(path)? {
            return Err(FtpError::NotFound(format!("no directory {}", path)));
        }
        let base = RemotePath::parse(path);
        let listing = self.list_dir_details(path, &ListOptions::recursive())?;
        let mut entries: Vec<(RemotePath, bool)> = listing
            .values()
            .rev()
            .map(|entry| (entry_path(&base, entry), entry.is_dir()))
            .collect();
        entries.sort_by_key(|(path, _)| Reverse(path.depth()));

        for (entry, is_dir) in entries {
            let entry = entry.to_string();
            if is_dir {
                self.transport.remove_directory(&entry)?;
            } else {
                self.transport.remove_file(&entry)?;
            }
        }
        self.transport.remove_directory(path)
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.transport.rename(from, to)
    }

    /// Moves `source` into the directory `dest_dir`, keeping its name.
    pub fn move_to(&mut self, source: &str, dest_dir: &str) -> Result<()> {
        let target = target_in(source, dest_dir)?;
        self.transport.rename(source, &target.to_string())
    }

    /// `SITE CHMOD` with `mode` written in octal.
    pub fn set_permissions(&mut self, path: &str, mode: u32) -> Result<()> {
        self.site(&format!("CHMOD {:o} {}", mode, path)).map(|_| ())
    }

    pub fn allocate_space(&mut self, bytes: u64) -> Result<()> {
        self.command(&format!("ALLO {}", bytes)).map(|_| ())
    }

    pub fn keep_alive(&mut self) -> Result<()> {
        self.transport.noop()
    }

    // Transfers

    /// Downloads `remote` into `local`. With `resume`, an existing `local`
    /// is completed instead of replaced.
    ///
    /// `local` is only touched once data arrives or the server confirms the
    /// transfer, a refused `RETR` leaves it as it was.
    pub fn download<P: AsRef<Path>>(&mut self, remote: &str, local: P, resume: bool) -> Result<u64> {
        let local = local.as_ref();
        let offset = if resume { local_size(local) } else { 0 };
        let mut sink = LocalSink::new(local, offset > 0);
        let received = self.transport.retrieve(remote, offset, &mut sink)?;
        sink.open()?;
        Ok(received)
    }

    /// Uploads `local` to `remote`. With `resume`, only the part of `local`
    /// past the current remote size is sent.
    pub fn upload<P: AsRef<Path>>(&mut self, local: P, remote: &str, resume: bool) -> Result<u64> {
        let offset = if resume { self.remote_size_or_zero(remote)? } else { 0 };
        let mut file = File::open(local.as_ref())?;
        file.seek(SeekFrom::Start(offset))?;
        self.transport.store(remote, offset, &mut file)
    }

    /// Non-blocking download reporting progress every
    /// `config.progress_interval` seconds.
    pub fn async_download<P, F>(&mut self, remote: &str, local: P, resume: bool, on_progress: F) -> Result<u64>
    where
        P: AsRef<Path>,
        F: FnMut(&TransferProgress),
    {
        let total_bytes = self.size(remote)?;
        let local = local.as_ref();
        let resume_offset = if resume { local_size(local) } else { 0 };
        let job = TransferJob {
            direction: TransferDirection::Download,
            local,
            remote,
            file_type: self.config.file_type.clone(),
            resume_offset,
            total_bytes,
        };
        TransferEngine::with_clock(self.config.progress_interval, &*self.clock).run(
            &mut self.transport,
            job,
            on_progress,
        )
    }

    /// Non-blocking upload, see [`async_download`](FtpClient::async_download).
    pub fn async_upload<P, F>(&mut self, local: P, remote: &str, resume: bool, on_progress: F) -> Result<u64>
    where
        P: AsRef<Path>,
        F: FnMut(&TransferProgress),
    {
        let local = local.as_ref();
        let total_bytes = fs::metadata(local)?.len();
        let resume_offset = if resume { self.remote_size_or_zero(remote)? } else { 0 };
        let job = TransferJob {
            direction: TransferDirection::Upload,
            local,
            remote,
            file_type: self.config.file_type.clone(),
            resume_offset,
            total_bytes,
        };
        TransferEngine::with_clock(self.config.progress_interval, &*self.clock).run(
            &mut self.transport,
            job,
            on_progress,
        )
    }

    fn remote_size_or_zero(&mut self, remote: &str) -> Result<u64> {
        match self.size(remote) {
            Ok(size) => Ok(size),
            Err(FtpError::NotFound(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }

    // Copies and search

    /// Copies `source` into the remote directory `dest_dir`.
    ///
    /// Files go through memory since FTP cannot copy on the server. For a
    /// directory the whole tree of directories is created before the first
    /// file is copied.
    pub fn copy(&mut self, source: &str, dest_dir: &str) -> Result<()> {
        let target = target_in(source, dest_dir)?;
        if !self.is_dir(source)? {
            self.copy_file(source, &target.to_string())?;
            return Ok(());
        }

        let base = RemotePath::parse(source);
        let mut files = Vec::new();
        self.ensure_dir(&target)?;
        for entry in self.list_dir_details(source, &ListOptions::recursive())?.values() {
            let path = entry_path(&base, entry);
            let relative = path
                .relative_to(&base)
                .ok_or_else(|| FtpError::InvalidResponse(format!("{} is not below {}", path, base)))?;
            if entry.is_dir() {
                self.ensure_dir(&target.join(relative))?;
            } else {
                files.push((path, target.join(relative)));
            }
        }
        for (from, to) in files {
            self.copy_file(&from.to_string(), &to.to_string())?;
        }
        Ok(())
    }

    fn copy_file(&mut self, from: &str, to: &str) -> Result<u64> {
        debug!("copying {} to {}", from, to);
        let mut buffer = Vec::new();
        self.transport.retrieve(from, 0, &mut buffer)?;
        let mut source = buffer.as_slice();
        self.transport.store(to, 0, &mut source)
    }

    /// Downloads `remote`, a file or a whole directory, into `local_dir`.
    pub fn copy_to_local<P: AsRef<Path>>(&mut self, remote: &str, local_dir: P) -> Result<()> {
        let base = RemotePath::parse(remote);
        let name = base
            .file_name()
            .ok_or_else(|| FtpError::OperationFailed(format!("{} has no name to copy to", remote)))?;
        let target = local_dir.as_ref().join(name);
        if !self.is_dir(remote)? {
            self.download(remote, &target, false)?;
            return Ok(());
        }

        fs::create_dir_all(&target)?;
        let mut files = Vec::new();
        for entry in self.list_dir_details(remote, &ListOptions::recursive())?.values() {
            let path = entry_path(&base, entry);
            let local = path
                .relative_to(&base)
                .map(|relative| relative.segments().iter().fold(target.clone(), |acc, s| acc.join(s)))
                .ok_or_else(|| FtpError::InvalidResponse(format!("{} is not below {}", path, base)))?;
            if entry.is_dir() {
                fs::create_dir_all(&local)?;
            } else {
                files.push((path, local));
            }
        }
        for (path, local) in files {
            self.download(&path.to_string(), &local, false)?;
        }
        Ok(())
    }

    /// Uploads `local`, a file or a whole directory, into `remote_dir`.
    pub fn copy_from_local<P: AsRef<Path>>(&mut self, local: P, remote_dir: &str) -> Result<()> {
        let local = local.as_ref();
        let name = local
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FtpError::OperationFailed(format!("{} has no name to copy to", local.display())))?;
        let target = RemotePath::parse(remote_dir).join(name);
        if !local.is_dir() {
            self.upload(local, &target.to_string(), false)?;
            return Ok(());
        }

        let mut dirs = vec![target.clone()];
        let mut files = Vec::new();
        walk_local(local, &target, &mut dirs, &mut files)?;
        for dir in &dirs {
            self.ensure_dir(dir)?;
        }
        for (local, remote) in files {
            self.upload(&local, &remote.to_string(), false)?;
        }
        Ok(())
    }

    /// Entries of `dir` whose path matches `pattern`.
    ///
    /// `pattern` is either a bare regular expression or one wrapped in
    /// slashes followed by modifiers, such as `/\.txt$/i`. Supported
    /// modifiers are `i`, `m`, `s`, `x` and `U`.
    pub fn find(&mut self, pattern: &str, dir: &str, recursive: bool) -> Result<Vec<FileEntry>> {
        let regex = compile_pattern(pattern)?;
        let options = ListOptions::default().with_recursive(recursive);
        Ok(self
            .list_dir_details(dir, &options)?
            .into_values()
            .filter(|entry| regex.is_match(&entry.path))
            .collect())
    }
}

fn rejected(reply: &Reply) -> FtpError {
    match reply.code {
        Some(code) => FtpError::UnexpectedResponse(Line(code, reply.raw.last().cloned().unwrap_or_default())),
        None => FtpError::InvalidResponse(reply.raw.join("\n")),
    }
}

/// Full path of a listed entry. Listings of a root directory carry bare names.
fn entry_path(directory: &RemotePath, entry: &FileEntry) -> RemotePath {
    if directory.is_root() {
        directory.join(entry.path.as_str())
    } else {
        RemotePath::parse(&entry.path)
    }
}

fn target_in(source: &str, dest_dir: &str) -> Result<RemotePath> {
    let name = RemotePath::parse(source)
        .file_name()
        .map(String::from)
        .ok_or_else(|| FtpError::OperationFailed(format!("{} has no name to copy to", source)))?;
    Ok(RemotePath::parse(dest_dir).join(name))
}

/// Download target opened on first use.
struct LocalSink<'a> {
    path: &'a Path,
    append: bool,
    file: Option<File>,
}

impl<'a> LocalSink<'a> {
    fn new(path: &'a Path, append: bool) -> Self {
        LocalSink { path, append, file: None }
    }

    fn open(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None if self.append => OpenOptions::new().append(true).open(self.path)?,
            None => File::create(self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl Write for LocalSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn local_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Collects the directories and files below `local`, parents before children.
fn walk_local(
    local: &Path,
    remote: &RemotePath,
    dirs: &mut Vec<RemotePath>,
    files: &mut Vec<(PathBuf, RemotePath)>,
) -> Result<()> {
    let mut entries = fs::read_dir(local)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| FtpError::OperationFailed(format!("{} is not valid UTF-8", entry.path().display())))?;
        let remote = remote.join(name);
        if entry.file_type()?.is_dir() {
            dirs.push(remote.clone());
            walk_local(&entry.path(), &remote, dirs, files)?;
        } else {
            files.push((entry.path(), remote));
        }
    }
    Ok(())
}

/// Compiles `pattern`, bare or in the `/body/modifiers` form.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let (body, modifiers) = match pattern.strip_prefix('/') {
        Some(rest) => split_delimited(rest)
            .ok_or_else(|| FtpError::InvalidPattern(format!("no closing delimiter in {}", pattern)))?,
        None => (pattern, ""),
    };
    let mut flags = String::new();
    for modifier in modifiers.chars() {
        match modifier {
            'i' | 'm' | 's' | 'x' | 'U' => {
                if !flags.contains(modifier) {
                    flags.push(modifier);
                }
            }
            other => {
                return Err(FtpError::InvalidPattern(format!("unknown modifier {:?} in {}", other, pattern)));
            }
        }
    }
    let source = if flags.is_empty() {
        body.to_string()
    } else {
        format!("(?{}){}", flags, body)
    };
    Regex::new(&source).map_err(|err| FtpError::InvalidPattern(err.to_string()))
}

/// Splits at the first `/` not preceded by a backslash.
fn split_delimited(rest: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '/' if !escaped => return Some((&rest[..i], &rest[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}
