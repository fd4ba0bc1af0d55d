//! [`ShareConnector`] backed by the Samba `smbclient` command-line client.
//!
//! Each operation is one `smbclient` invocation: `-L -g` for the share list
//! (which also proves the login), `-c ls` for a share root and `-c get` for a
//! download. Failures are classified from the `NT_STATUS_*` code the client
//! prints.
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use log::debug;
use regex::Regex;

use super::{ShareConnector, ShareCredentials, ShareSession};
use crate::error::NetworkError;
use crate::finding::RemoteFile;
use crate::target::Target;

const BINARY: &str = "smbclient";

static NT_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NT_STATUS_[A-Z_]+").expect("valid NT_STATUS pattern"));

static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+(?P<name>.+?)(?:\s{2,}(?P<attrs>[DAHSRNVI]+))?\s+(?P<size>\d+)\s+(?:Sun|Mon|Tue|Wed|Thu|Fri|Sat)\s+\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}\s+\d{4}\s*$",
    )
    .expect("valid listing pattern")
});

#[derive(Debug, Clone)]
pub struct SmbClientConnector {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl SmbClientConnector {
    /// Connector that looks `smbclient` up on `PATH` at login time.
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: None,
            timeout,
        }
    }

    pub fn with_binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn resolve_binary(&self) -> Result<PathBuf, NetworkError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which(BINARY).map_err(|_| NetworkError::Unavailable(BINARY.into())),
        }
    }
}

impl ShareConnector for SmbClientConnector {
    fn login(
        &self,
        target: &Target,
        credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>, NetworkError> {
        let invoker = Invoker {
            binary: self.resolve_binary()?,
            timeout: self.timeout,
            credentials: credentials.clone(),
        };
        let host = target.address.to_string();
        let mut cmd = invoker.command();
        cmd.arg("-g").arg("-L").arg(format!("//{}", host));
        let listing = invoker.run(cmd, false)?;
        let shares = parse_share_listing(&listing);
        debug!(
            "smbclient {} login to {} listed {} shares",
            credentials.label(),
            host,
            shares.len()
        );
        Ok(Box::new(SmbClientSession {
            invoker,
            host,
            shares,
        }))
    }
}

#[derive(Debug, Clone)]
struct Invoker {
    binary: PathBuf,
    timeout: Duration,
    credentials: ShareCredentials,
}

impl Invoker {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--timeout")
            .arg(self.timeout.as_secs().max(1).to_string())
            .arg(format!(
                "--user={}%{}",
                self.credentials.username, self.credentials.password
            ));
        if self.credentials.password.is_empty() {
            cmd.arg("-N");
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run a command and return its stdout. With `strict`, an `NT_STATUS_*`
    /// code in the output is an error even when the exit status is zero.
    fn run(&self, mut cmd: Command, strict: bool) -> Result<String, NetworkError> {
        let output = cmd
            .output()
            .map_err(|e| NetworkError::Unavailable(format!("{} ({})", BINARY, e)))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let status_out = status_lines(&stdout);
        if !output.status.success() || (strict && status_code(&status_out, &stderr).is_some()) {
            return Err(classify_failure(&status_out, &stderr));
        }
        Ok(stdout)
    }
}

struct SmbClientSession {
    invoker: Invoker,
    host: String,
    shares: Vec<String>,
}

impl SmbClientSession {
    fn unc(&self, share: &str) -> String {
        format!("//{}/{}", self.host, share)
    }
}

impl ShareSession for SmbClientSession {
    fn list_shares(&mut self) -> Result<Vec<String>, NetworkError> {
        Ok(self.shares.clone())
    }

    fn list_files(&mut self, share: &str) -> Result<Vec<RemoteFile>, NetworkError> {
        let mut cmd = self.invoker.command();
        cmd.arg(self.unc(share)).arg("-c").arg("ls");
        let listing = self.invoker.run(cmd, true)?;
        Ok(parse_directory_listing(share, &listing))
    }

    fn read_file(
        &mut self,
        share: &str,
        filename: &str,
        out: &mut dyn Write,
    ) -> Result<u64, NetworkError> {
        let scratch = tempfile::NamedTempFile::new()
            .map_err(|e| NetworkError::Transport(format!("scratch file: {}", e)))?;
        let remote = quote_arg(filename)?;
        let local = quote_arg(&scratch.path().to_string_lossy())?;
        let mut cmd = self.invoker.command();
        cmd.arg(self.unc(share))
            .arg("-c")
            .arg(format!("get {} {}", remote, local));
        self.invoker.run(cmd, true)?;
        let mut file = scratch
            .reopen()
            .map_err(|e| NetworkError::Transport(format!("scratch file: {}", e)))?;
        io::copy(&mut file, out)
            .map_err(|e| NetworkError::Transport(format!("copy {}: {}", filename, e)))
    }
}

/// Output lines that are not directory entries, so a file name never reads
/// as a status code.
fn status_lines(stdout: &str) -> String {
    stdout
        .lines()
        .filter(|line| !LISTING_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_code(stdout: &str, stderr: &str) -> Option<String> {
    NT_STATUS
        .find(stderr)
        .or_else(|| NT_STATUS.find(stdout))
        .map(|m| m.as_str().to_string())
        .filter(|code| code != "NT_STATUS_OK")
}

/// Map smbclient output to a typed error using the reported status code.
pub fn classify_failure(stdout: &str, stderr: &str) -> NetworkError {
    let Some(code) = status_code(stdout, stderr) else {
        let text = stderr.trim();
        let text = if text.is_empty() { stdout.trim() } else { text };
        return NetworkError::Protocol(format!("{} failed: {}", BINARY, text));
    };
    match code.as_str() {
        "NT_STATUS_LOGON_FAILURE"
        | "NT_STATUS_ACCESS_DENIED"
        | "NT_STATUS_ACCOUNT_DISABLED"
        | "NT_STATUS_ACCOUNT_RESTRICTION"
        | "NT_STATUS_ACCOUNT_LOCKED_OUT"
        | "NT_STATUS_WRONG_PASSWORD" => NetworkError::Auth(code),
        "NT_STATUS_CONNECTION_REFUSED"
        | "NT_STATUS_IO_TIMEOUT"
        | "NT_STATUS_HOST_UNREACHABLE"
        | "NT_STATUS_NETWORK_UNREACHABLE"
        | "NT_STATUS_CONNECTION_RESET"
        | "NT_STATUS_CONNECTION_DISCONNECTED" => NetworkError::Transport(code),
        _ => NetworkError::Protocol(code),
    }
}

/// Share names from `smbclient -g -L` output (`Type|Name|Comment` lines).
pub fn parse_share_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            let kind = parts.next()?;
            let name = parts.next()?;
            (matches!(kind, "Disk" | "IPC" | "Printer") && !name.is_empty())
                .then(|| name.to_string())
        })
        .collect()
}

/// Entries from `smbclient -c ls` output, without `.` and `..`.
pub fn parse_directory_listing(share: &str, output: &str) -> Vec<RemoteFile> {
    output
        .lines()
        .filter_map(|line| LISTING_LINE.captures(line))
        .filter_map(|caps| {
            let name = caps["name"].to_string();
            if name == "." || name == ".." {
                return None;
            }
            Some(RemoteFile {
                share: share.to_string(),
                filename: name,
                is_directory: caps
                    .name("attrs")
                    .is_some_and(|attrs| attrs.as_str().contains('D')),
            })
        })
        .collect()
}

/// Quote one argument of an `smbclient -c` command line. The client splits
/// the command string on `;` and newlines before tokenizing and has no escape
/// for embedded double quotes, so names containing any of them are refused.
fn quote_arg(arg: &str) -> Result<String, NetworkError> {
    if arg.contains(['"', ';', '\n', '\r']) {
        return Err(NetworkError::Protocol(format!(
            "unsupported file name {:?}",
            arg
        )));
    }
    Ok(format!("\"{}\"", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grepable_share_list() {
        let out = "Anonymous login successful\n\nDisk|Public|Public files\nIPC|IPC$|Remote IPC\nDisk|ADMIN$|Remote Admin\nPrinter|HP|\nWorkgroup|CORP|DC01\n";
        assert_eq!(
            parse_share_listing(out),
            vec!["Public", "IPC$", "ADMIN$", "HP"]
        );
    }

    #[test]
    fn parses_directory_listing_with_spaces_and_dirs() {
        let out = concat!(
            "  .                                   D        0  Mon Jun  2 10:11:12 2025\n",
            "  ..                                  D        0  Mon Jun  2 10:11:12 2025\n",
            "  passwords.txt                       A       52  Mon Jun  2 10:11:12 2025\n",
            "  Q3 finance report.xlsx              A    10240  Tue Jun 10 08:00:00 2025\n",
            "  Archive                             D        0  Wed Jan 15 23:59:59 2025\n",
            "  plain                                      7  Thu Feb  6 01:02:03 2025\n",
            "\n\t\t7735807 blocks of size 4096. 1066040 blocks available\n",
        );
        let files = parse_directory_listing("Public", out);
        let names: Vec<(&str, bool)> = files
            .iter()
            .map(|f| (f.filename.as_str(), f.is_directory))
            .collect();
        assert_eq!(
            names,
            vec![
                ("passwords.txt", false),
                ("Q3 finance report.xlsx", false),
                ("Archive", true),
                ("plain", false),
            ]
        );
        assert!(files.iter().all(|f| f.share == "Public"));
    }

    #[test]
    fn classifies_status_codes() {
        assert!(matches!(
            classify_failure("", "session setup failed: NT_STATUS_LOGON_FAILURE"),
            NetworkError::Auth(code) if code == "NT_STATUS_LOGON_FAILURE"
        ));
        assert!(matches!(
            classify_failure("", "do_connect: Connection to 10.0.0.1 failed (Error NT_STATUS_CONNECTION_REFUSED)"),
            NetworkError::Transport(_)
        ));
        assert!(matches!(
            classify_failure("tree connect failed: NT_STATUS_BAD_NETWORK_NAME", ""),
            NetworkError::Protocol(_)
        ));
        assert!(matches!(
            classify_failure("", "something odd"),
            NetworkError::Protocol(msg) if msg.contains("something odd")
        ));
    }

    #[test]
    fn quoting_refuses_command_separators() {
        assert_eq!(quote_arg("a b (1).txt").unwrap(), "\"a b (1).txt\"");
        for name in [
            "bad\"name",
            "Q3;final.txt",
            "x;lcd ..;rm *;a.txt",
            "two\nlines.txt",
            "cr\rname.txt",
        ] {
            assert!(
                matches!(quote_arg(name), Err(NetworkError::Protocol(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn attribute_column_needs_its_own_gap() {
        let out = concat!(
            "  FOO BAR                                    7  Thu Feb  6 01:02:03 2025\n",
            "  FOO HAD                             A      7  Thu Feb  6 01:02:03 2025\n",
            "  NT_STATUS_CODES.txt                 N    120  Mon Jun  2 10:11:12 2025\n",
        );
        let names: Vec<String> = parse_directory_listing("Public", out)
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["FOO BAR", "FOO HAD", "NT_STATUS_CODES.txt"]);
    }

    #[test]
    fn file_names_in_a_listing_are_not_status_codes() {
        let out = concat!(
            "  NT_STATUS_CODES.txt                 A      120  Mon Jun  2 10:11:12 2025\n",
            "  passwords.txt                       A       52  Mon Jun  2 10:11:12 2025\n",
            "\n\t\t7735807 blocks of size 4096. 1066040 blocks available\n",
        );
        assert_eq!(status_code(&status_lines(out), ""), None);
        assert_eq!(
            status_code(&status_lines("NT_STATUS_ACCESS_DENIED listing \\*\n"), ""),
            Some("NT_STATUS_ACCESS_DENIED".to_string())
        );
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let connector = SmbClientConnector::new(Duration::from_secs(1))
            .with_binary("/nonexistent/smbclient-for-tests");
        let target = Target::parse("127.0.0.1", "corp.local").unwrap();
        let err = connector
            .login(&target, &ShareCredentials::anonymous())
            .err()
            .unwrap();
        assert!(matches!(err, NetworkError::Unavailable(_)));
    }

    /// Stand-in `smbclient` that records every command line it receives.
    #[cfg(unix)]
    fn recording_client(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("invocations.log");
        let script = format!(
            r#"#!/bin/sh
printf '%s\n' "$*" >> "{log}"
case "$*" in
  *" -L "*) printf 'Disk|Public|\nIPC|IPC$|\n' ;;
  *"-c ls"*) printf '  NT_STATUS_CODES.txt                 A      120  Mon Jun  2 10:11:12 2025\n  passwords.txt                       A       52  Mon Jun  2 10:11:12 2025\n' ;;
esac
"#,
            log = log.display()
        );
        let binary = dir.join("smbclient");
        std::fs::write(&binary, script).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        (binary, log)
    }

    #[cfg(unix)]
    #[test]
    fn listing_with_status_like_file_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (binary, _log) = recording_client(dir.path());
        let target = Target::parse("127.0.0.1", "corp.local").unwrap();
        let mut session = SmbClientConnector::new(Duration::from_secs(1))
            .with_binary(binary)
            .login(&target, &ShareCredentials::guest())
            .ok()
            .unwrap();
        assert_eq!(session.list_shares().unwrap(), vec!["Public", "IPC$"]);
        let names: Vec<String> = session
            .list_files("Public")
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["NT_STATUS_CODES.txt", "passwords.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn download_of_name_with_separators_never_reaches_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let (binary, log) = recording_client(dir.path());
        let target = Target::parse("127.0.0.1", "corp.local").unwrap();
        let mut session = SmbClientConnector::new(Duration::from_secs(1))
            .with_binary(binary)
            .login(&target, &ShareCredentials::anonymous())
            .ok()
            .unwrap();
        let mut out = Vec::new();
        let res = session.read_file("Public", "x;lcd ..;rm *;a.txt", &mut out);
        assert!(matches!(res, Err(NetworkError::Protocol(_))));
        assert!(out.is_empty());
        let calls = std::fs::read_to_string(log).unwrap();
        assert_eq!(calls.lines().count(), 1, "{calls}");
        assert!(!calls.contains("get"));
    }
}
