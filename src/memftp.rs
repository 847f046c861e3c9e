//! In-memory server used by the unit tests.
//!
//! Paths are resolved against a working directory like a real server would,
//! listings are rendered as `ls -l` / `ls -lR` text, and every mutating
//! command is recorded so tests can assert on ordering.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::path::RemotePath;
use crate::transfer::Clock;
use crate::transport::{TransferDirection, TransferRequest, TransferStatus, Transport};
use crate::types::{FileType, FtpError, Line, Result};

/// Clock advanced by hand, shared between the server and the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug)]
struct MemTransfer {
    direction: TransferDirection,
    remote: String,
    local: PathBuf,
    data: Vec<u8>,
    sent: usize,
    chunks: usize,
}

#[derive(Debug)]
pub struct MemFtp {
    nodes: BTreeMap<String, Node>,
    cwd: String,
    calls: Vec<String>,
    features: Option<Vec<String>>,
    pending: Option<MemTransfer>,
    position: u64,
    chunk_size: usize,
    fail_after: Option<usize>,
    failures: BTreeMap<&'static str, u32>,
    replies: BTreeMap<String, Vec<String>>,
    clock: ManualClock,
    tick: Duration,
}

fn rejected(code: u32, message: &str) -> FtpError {
    FtpError::UnexpectedResponse(Line(code, format!("{} {}", code, message)))
}

fn not_found() -> FtpError {
    rejected(550, "No such file or directory.")
}

impl MemFtp {
    pub fn new() -> MemFtp {
        MemFtp {
            nodes: BTreeMap::new(),
            cwd: "/".to_string(),
            calls: Vec::new(),
            features: Some(vec!["MDTM".to_string(), "SIZE".to_string(), "REST STREAM".to_string()]),
            pending: None,
            position: 0,
            chunk_size: 1024,
            fail_after: None,
            failures: BTreeMap::new(),
            replies: BTreeMap::new(),
            clock: ManualClock::default(),
            tick: Duration::from_millis(10),
        }
    }

    /// Every `continue_transfer` advances `clock` by `tick`.
    pub fn with_clock(mut self, clock: ManualClock, tick: Duration) -> MemFtp {
        self.clock = clock;
        self.tick = tick;
        self
    }

    pub fn without_features(mut self) -> MemFtp {
        self.features = None;
        self
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Transfers fail once this many chunks have moved.
    pub fn fail_transfers_after(&mut self, chunks: usize) {
        self.fail_after = Some(chunks);
    }

    /// `verb` (`NLST`, `LIST`, `CWD`, `RETR` or `FEAT`) fails with `code`.
    pub fn fail_command(&mut self, verb: &'static str, code: u32) {
        self.failures.insert(verb, code);
    }

    /// `command` sent through `send_command` is answered with `lines`.
    pub fn set_reply(&mut self, command: &str, lines: &[&str]) {
        self.replies
            .insert(command.to_string(), lines.iter().map(|line| line.to_string()).collect());
    }

    fn check(&self, verb: &str) -> Result<()> {
        match self.failures.get(verb) {
            Some(&code) => Err(rejected(code, "Command failed.")),
            None => Ok(()),
        }
    }

    /// Creates a directory and its parents.
    pub fn put_dir(&mut self, path: &str) {
        let path = RemotePath::parse(path);
        for depth in 1..=path.depth() {
            let prefix = format!("/{}", path.segments()[..depth].join("/"));
            self.nodes.insert(prefix, Node::Dir);
        }
    }

    /// Creates a file and its parent directories.
    pub fn put_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        let path = RemotePath::parse(path);
        self.put_dir(&path.parent().to_string());
        self.nodes.insert(path.to_string(), Node::File(content.into()));
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(&RemotePath::parse(path).to_string()) {
            Some(Node::File(content)) => Some(content),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        let path = RemotePath::parse(path).to_string();
        path == "/" || matches!(self.nodes.get(&path), Some(Node::Dir))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.is_dir(path) || self.file(path).is_some()
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Mutating commands in the order they were received.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Absolute normalized form of `path`, `..` resolved.
    fn resolve(&self, path: &str) -> String {
        let joined = RemotePath::parse(&self.cwd).join(path);
        let mut segments: Vec<&str> = Vec::new();
        for segment in joined.segments() {
            if segment == ".." {
                segments.pop();
            } else {
                segments.push(segment.as_str());
            }
        }
        format!("/{}", segments.join("/"))
    }

    fn children(&self, dir: &str) -> Vec<(String, Node)> {
        let prefix = if dir == "/" { "/".to_string() } else { format!("{}/", dir) };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(key, node)| (key[prefix.len()..].to_string(), node.clone()))
            .collect()
    }

    fn render(name: &str, node: &Node) -> String {
        match node {
            Node::Dir => format!("drwxr-xr-x    2 ftp      ftp          4096 Mar 12 09:41 {}", name),
            Node::File(content) => {
                format!("-rw-r--r--    1 ftp      ftp      {:>8} Mar 12 09:41 {}", content.len(), name)
            }
        }
    }

    fn render_dir(&self, shown: &str, resolved: &str, recursive: bool, lines: &mut Vec<String>) {
        let children = self.children(resolved);
        if recursive {
            lines.push(format!("{}:", shown));
        }
        lines.push(format!("total {}", children.len()));
        if !recursive {
            lines.push(MemFtp::render(".", &Node::Dir));
            lines.push(MemFtp::render("..", &Node::Dir));
        }
        for (name, node) in &children {
            lines.push(MemFtp::render(name, node));
        }
        if recursive {
            for (name, node) in &children {
                if let Node::Dir = node {
                    lines.push(String::new());
                    let child = if resolved == "/" { format!("/{}", name) } else { format!("{}/{}", resolved, name) };
                    self.render_dir(&format!("{}/{}", shown, name), &child, true, lines);
                }
            }
        }
    }

    fn parent_is_dir(&self, resolved: &str) -> bool {
        self.is_dir(&RemotePath::parse(resolved).parent().to_string())
    }
}

impl Transport for MemFtp {
    fn send_command(&mut self, command: &str) -> Result<Vec<String>> {
        self.calls.push(command.to_string());
        if let Some(lines) = self.replies.get(command) {
            return Ok(lines.clone());
        }
        let mut words = command.split_whitespace();
        let lines = match (words.next(), words.next()) {
            (Some("SYST"), _) => vec!["215 UNIX Type: L8".to_string()],
            (Some("NOOP"), _) => vec!["200 NOOP ok.".to_string()],
            (Some("ALLO"), Some(_)) => vec!["202 ALLO command ignored.".to_string()],
            (Some("HELP"), Some("SITE")) => vec![
                "214-The following SITE commands are recognized.".to_string(),
                " CHMOD UMASK HELP".to_string(),
                " EXEC".to_string(),
                "214 Help OK.".to_string(),
            ],
            (Some("SITE"), Some("CHMOD")) => {
                let path = words.nth(1).unwrap_or("");
                if self.contains(&self.resolve(path)) {
                    vec!["200 SITE CHMOD command ok.".to_string()]
                } else {
                    vec!["550 SITE CHMOD command failed.".to_string()]
                }
            }
            (Some("SITE"), Some("EXEC")) => vec!["200-running".to_string(), "ok".to_string(), "200 Done.".to_string()],
            _ => vec!["500 Unknown command.".to_string()],
        };
        Ok(lines)
    }

    fn list_directory(&mut self, path: &str, recursive: bool) -> Result<Vec<String>> {
        self.check("LIST")?;
        let resolved = self.resolve(path);
        if !self.is_dir(&resolved) {
            return Err(not_found());
        }
        let shown = if path.is_empty() { "." } else { path.trim_end_matches('/') };
        let shown = if shown.is_empty() { "/" } else { shown };
        let mut lines = Vec::new();
        self.render_dir(shown, &resolved, recursive, &mut lines);
        Ok(lines)
    }

    fn name_list(&mut self, path: &str) -> Result<Vec<String>> {
        self.check("NLST")?;
        let resolved = self.resolve(path);
        if !self.is_dir(&resolved) {
            return Err(not_found());
        }
        // answer like servers that prefix names with the requested path
        let prefix = path.trim_end_matches('/');
        Ok(self
            .children(&resolved)
            .into_iter()
            .map(|(name, _)| if prefix.is_empty() || prefix == "." { name } else { format!("{}/{}", prefix, name) })
            .collect())
    }

    fn start_transfer(&mut self, request: TransferRequest) -> Result<TransferStatus> {
        if self.pending.is_some() {
            return Err(FtpError::OperationFailed("another transfer is in progress".to_string()));
        }
        let remote = self.resolve(&request.remote);
        if request.offset > 0 {
            self.calls.push(format!("REST {}", request.offset));
        }
        let offset = request.offset as usize;
        let data = match request.direction {
            TransferDirection::Download => {
                self.calls.push(format!("RETR {}", remote));
                let content = self.file(&remote).ok_or_else(not_found)?.to_vec();
                if offset == 0 {
                    fs::File::create(&request.local)?;
                }
                content.get(offset..).unwrap_or_default().to_vec()
            }
            TransferDirection::Upload => {
                self.calls.push(format!("STOR {}", remote));
                if !self.parent_is_dir(&remote) {
                    return Err(not_found());
                }
                let mut local = fs::read(&request.local)?;
                let existing = self.file(&remote).map(|c| c.to_vec()).unwrap_or_default();
                let kept = existing.get(..offset).unwrap_or(&existing[..]).to_vec();
                self.nodes.insert(remote.clone(), Node::File(kept));
                local.drain(..offset.min(local.len()));
                local
            }
        };
        self.position = request.offset;
        self.pending = Some(MemTransfer {
            direction: request.direction,
            remote,
            local: request.local,
            data,
            sent: 0,
            chunks: 0,
        });
        Ok(TransferStatus::MoreData)
    }

    fn continue_transfer(&mut self) -> Result<TransferStatus> {
        self.clock.advance(self.tick);
        let mut transfer = self
            .pending
            .take()
            .ok_or_else(|| FtpError::OperationFailed("no transfer in progress".to_string()))?;
        if self.fail_after == Some(transfer.chunks) {
            return Ok(TransferStatus::Failed("426 Connection closed; transfer aborted.".to_string()));
        }
        let end = (transfer.sent + self.chunk_size).min(transfer.data.len());
        let chunk = &transfer.data[transfer.sent..end];
        match transfer.direction {
            TransferDirection::Download => {
                OpenOptions::new().append(true).open(&transfer.local)?.write_all(chunk)?;
            }
            TransferDirection::Upload => {
                if let Some(Node::File(content)) = self.nodes.get_mut(&transfer.remote) {
                    content.extend_from_slice(chunk);
                }
            }
        }
        self.position += chunk.len() as u64;
        transfer.sent = end;
        transfer.chunks += 1;
        if transfer.sent == transfer.data.len() {
            Ok(TransferStatus::Finished)
        } else {
            self.pending = Some(transfer);
            Ok(TransferStatus::MoreData)
        }
    }

    fn transfer_position(&self) -> u64 {
        self.position
    }

    fn change_directory(&mut self, path: &str) -> Result<()> {
        let resolved = self.resolve(path);
        self.calls.push(format!("CWD {}", resolved));
        self.check("CWD")?;
        if self.is_dir(&resolved) {
            self.cwd = resolved;
            Ok(())
        } else {
            Err(not_found())
        }
    }

    fn current_directory(&mut self) -> Result<String> {
        Ok(self.cwd.clone())
    }

    fn parent_directory(&mut self) -> Result<()> {
        self.cwd = self.resolve("..");
        Ok(())
    }

    fn create_directory(&mut self, path: &str) -> Result<()> {
        let resolved = self.resolve(path);
        self.calls.push(format!("MKD {}", resolved));
        if self.contains(&resolved) || !self.parent_is_dir(&resolved) {
            return Err(rejected(550, "Create directory operation failed."));
        }
        self.nodes.insert(resolved, Node::Dir);
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        let resolved = self.resolve(path);
        self.calls.push(format!("DELE {}", resolved));
        match self.nodes.get(&resolved) {
            Some(Node::File(_)) => {
                self.nodes.remove(&resolved);
                Ok(())
            }
            _ => Err(rejected(550, "Delete operation failed.")),
        }
    }

    fn remove_directory(&mut self, path: &str) -> Result<()> {
        let resolved = self.resolve(path);
        self.calls.push(format!("RMD {}", resolved));
        if resolved == "/" || !self.is_dir(&resolved) || !self.children(&resolved).is_empty() {
            return Err(rejected(550, "Remove directory operation failed."));
        }
        self.nodes.remove(&resolved);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        self.calls.push(format!("RNFR {} RNTO {}", from, to));
        if !self.contains(&from) || from == "/" {
            return Err(rejected(550, "RNFR command failed."));
        }
        if self.contains(&to) || !self.parent_is_dir(&to) {
            return Err(rejected(553, "Could not rename."));
        }
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| **key == from || key.starts_with(&format!("{}/", from)))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                self.nodes.insert(format!("{}{}", to, &key[from.len()..]), node);
            }
        }
        Ok(())
    }

    fn features(&mut self) -> Result<Vec<String>> {
        self.check("FEAT")?;
        self.features.clone().ok_or_else(|| rejected(502, "FEAT not implemented."))
    }

    fn file_size(&mut self, path: &str) -> Result<Option<u64>> {
        if self.features.as_ref().map_or(true, |f| !f.iter().any(|f| f == "SIZE")) {
            return Err(rejected(500, "Unknown command."));
        }
        let resolved = self.resolve(path);
        self.file(&resolved)
            .map(|content| Some(content.len() as u64))
            .ok_or_else(|| rejected(550, "Could not get file size."))
    }

    fn modification_time(&mut self, path: &str) -> Result<Option<DateTime<Utc>>> {
        let resolved = self.resolve(path);
        self.file(&resolved).ok_or_else(not_found)?;
        Ok(Utc.with_ymd_and_hms(2024, 3, 12, 9, 41, 0).single())
    }

    fn set_transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.calls.push(format!("TYPE {}", file_type));
        Ok(())
    }

    fn retrieve(&mut self, path: &str, offset: u64, sink: &mut dyn Write) -> Result<u64> {
        let resolved = self.resolve(path);
        self.calls.push(format!("RETR {}", resolved));
        self.check("RETR")?;
        let content = self.file(&resolved).ok_or_else(not_found)?;
        let tail = content.get(offset as usize..).unwrap_or_default();
        sink.write_all(tail)?;
        Ok(tail.len() as u64)
    }

    fn store(&mut self, path: &str, offset: u64, source: &mut dyn Read) -> Result<u64> {
        let resolved = self.resolve(path);
        self.calls.push(format!("STOR {}", resolved));
        if self.is_dir(&resolved) || !self.parent_is_dir(&resolved) {
            return Err(rejected(553, "Could not create file."));
        }
        let mut content = self.file(&resolved).map(|c| c.to_vec()).unwrap_or_default();
        content.truncate(offset as usize);
        let written = source.read_to_end(&mut content)?;
        self.nodes.insert(resolved, Node::File(content));
        Ok(written as u64)
    }

    fn noop(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recursive_rendering() {
        let mut ftp = MemFtp::new();
        ftp.put_file("/srv/a/one.txt", "1");
        ftp.put_file("/srv/top.txt", "22");
        let lines = ftp.list_directory("/srv", true).unwrap();
        assert_eq!(
            lines,
            vec![
                "/srv:".to_string(),
                "total 2".to_string(),
                MemFtp::render("a", &Node::Dir),
                MemFtp::render("top.txt", &Node::File(b"22".to_vec())),
                String::new(),
                "/srv/a:".to_string(),
                "total 1".to_string(),
                MemFtp::render("one.txt", &Node::File(b"1".to_vec())),
            ]
        );
    }

    #[test]
    fn relative_paths_follow_cwd() {
        let mut ftp = MemFtp::new();
        ftp.put_dir("/a/b");
        ftp.change_directory("a").unwrap();
        assert_eq!(ftp.resolve("b/../c"), "/a/c");
        ftp.parent_directory().unwrap();
        assert_eq!(ftp.cwd(), "/");
    }
}
