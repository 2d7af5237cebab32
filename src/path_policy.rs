use std::path::{Path, PathBuf};

use regex::Regex;

/// Filesystem prefixes that must never be deleted, regardless of any other
/// signal. Matching is prefix-based on canonicalized paths.
const CRITICAL_SYSTEM_ROOTS: &[&str] = &["/System", "/usr", "/bin", "/sbin", "/etc", "/var"];

/// Basename glob patterns that indicate user secrets.
const SENSITIVE_GLOBS: &[&str] = &[
    "*.key",
    "*.pem",
    "*.crt",
    "*.pfx",
    "*.p12",
    "*_rsa",
    "*_dsa",
    "*_ecdsa",
    "*_ed25519",
    "*.kdbx",
    "*.keychain",
    "*.keystore",
    "id_*",
    "*.vault",
    "*.credentials",
    "*.secret",
];

/// Static, OS-specific rules that must hold regardless of scorer signals.
///
/// `is_critical` and `is_sensitive` never fail: I/O errors resolve to `true`
/// conservatively, per the audit's fail-closed contract.
pub struct PathPolicy {
    critical_roots: Vec<PathBuf>,
    sensitive_patterns: Vec<Regex>,
}

impl PathPolicy {
    pub fn new() -> Self {
        let home = dirs::home_dir();
        let mut critical_roots: Vec<PathBuf> =
            CRITICAL_SYSTEM_ROOTS.iter().map(PathBuf::from).collect();

        if let Some(home) = &home {
            critical_roots.push(home.join(".ssh"));
            critical_roots.push(home.join(".gnupg"));
            critical_roots.push(home.join(".aws"));
            critical_roots.push(home.join("Library/Keychains"));
            critical_roots.push(home.join("Library/Application Support/1Password"));
            critical_roots.push(home.join("Library/Application Support/Bitwarden"));
        }
        // Platform keychain/security directories outside the home tree.
        critical_roots.push(PathBuf::from("/Library/Keychains"));
        critical_roots.push(PathBuf::from("/private/etc/security"));

        let sensitive_patterns = SENSITIVE_GLOBS
            .iter()
            .map(|glob| Regex::new(&glob_to_regex(glob)).expect("sensitive glob is valid"))
            .collect();

        PathPolicy {
            critical_roots,
            sensitive_patterns,
        }
    }

    /// True iff `path` is a descendant of any entry in the critical-path
    /// set. Canonicalization failure (path vanished, permission denied)
    /// resolves to `true`: an unreadable path is never assumed safe.
    pub fn is_critical(&self, path: &Path) -> bool {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => return true,
        };
        self.critical_roots
            .iter()
            .any(|root| canonical.starts_with(root))
    }

    /// True iff the basename matches any sensitive-pattern glob.
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive_patterns.iter().any(|re| re.is_match(name))
    }
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Translates the limited glob dialect used by sensitive-pattern matching
/// (`*` and literal characters only) into an anchored regex.
fn glob_to_regex(glob: &str) -> String {
    let mut pattern = String::from("(?i)^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '.' | '^' | '$' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            other => pattern.push(other),
        }
    }
    pattern.push('$');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn critical_path_matches_system_roots() {
        let policy = PathPolicy::new();
        assert!(policy.is_critical(Path::new("/System/Library/CoreServices")));
        assert!(policy.is_critical(Path::new("/usr/bin/env")));
    }

    #[test]
    fn non_critical_path_under_temp_dir() {
        let policy = PathPolicy::new();
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("scratch.tmp");
        fs::write(&file, b"x").unwrap();
        assert!(!policy.is_critical(&file));
    }

    #[test]
    fn sensitive_glob_matches_key_files() {
        let policy = PathPolicy::new();
        assert!(policy.is_sensitive("id_rsa"));
        assert!(policy.is_sensitive("server.pem"));
        assert!(policy.is_sensitive("wallet.keystore"));
        assert!(!policy.is_sensitive("notes.txt"));
    }

    #[test]
    fn unreadable_path_resolves_critical_conservatively() {
        let policy = PathPolicy::new();
        assert!(policy.is_critical(Path::new("/this/path/does/not/exist/at/all")));
    }
}
