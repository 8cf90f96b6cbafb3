//! Registry access behind a trait so the engine can run against the real
//! Windows registry in production and an in-memory fake in tests.
//!
//! The production adapter shells out to `reg.exe`; its exit status is the
//! only success signal consulted. Key paths use the `HKLM\...` / `HKU\...`
//! locator scheme throughout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{op} failed for {key}: {detail}")]
    Command {
        op: &'static str,
        key: String,
        detail: String,
    },
}

pub trait Registry {
    fn key_exists(&self, key: &str) -> Result<bool, RegistryError>;
    fn list_subkeys(&self, key: &str) -> Result<Vec<String>, RegistryError>;
    fn read_string(&self, key: &str, value: &str) -> Result<Option<String>, RegistryError>;
    fn export(&mut self, key: &str, dest: &Path) -> Result<(), RegistryError>;
    fn delete_tree(&mut self, key: &str) -> Result<(), RegistryError>;
}

/// Adapter over the `reg.exe` command-line utility.
pub struct RegExe;

impl RegExe {
    fn reg(&self, args: &[&str]) -> Result<std::process::Output, RegistryError> {
        Command::new("reg.exe")
            .args(args)
            .output()
            .map_err(|source| RegistryError::Spawn {
                tool: "reg.exe",
                source,
            })
    }
}

impl Registry for RegExe {
    fn key_exists(&self, key: &str) -> Result<bool, RegistryError> {
        // `reg query` exits non-zero when the key is absent; absence is not
        // an error at this layer.
        let out = self.reg(&["query", key])?;
        Ok(out.status.success())
    }

    fn list_subkeys(&self, key: &str) -> Result<Vec<String>, RegistryError> {
        let out = self.reg(&["query", key])?;
        if !out.status.success() {
            return Ok(Vec::new());
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        let prefix = format!("{key}\\");
        Ok(stdout
            .lines()
            .filter_map(|line| {
                let line = line.trim_end();
                let rest = strip_prefix_ci(line, &prefix)?;
                // Direct children only; deeper paths still contain a slash.
                if rest.is_empty() || rest.contains('\\') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect())
    }

    fn read_string(&self, key: &str, value: &str) -> Result<Option<String>, RegistryError> {
        let out = self.reg(&["query", key, "/v", value])?;
        if !out.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        Ok(parse_reg_value(&stdout, value))
    }

    fn export(&mut self, key: &str, dest: &Path) -> Result<(), RegistryError> {
        let dest = dest.to_string_lossy();
        let out = self.reg(&["export", key, dest.as_ref(), "/y"])?;
        if out.status.success() {
            Ok(())
        } else {
            Err(RegistryError::Command {
                op: "export",
                key: key.to_string(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }

    fn delete_tree(&mut self, key: &str) -> Result<(), RegistryError> {
        let out = self.reg(&["delete", key, "/f"])?;
        if out.status.success() {
            Ok(())
        } else {
            Err(RegistryError::Command {
                op: "delete",
                key: key.to_string(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    // `get` refuses a split inside a multibyte character; such a line cannot
    // match the ASCII key prefix anyway. Localized `reg query` output must
    // not panic the run.
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// Pull the data column out of a `reg query /v` output line, e.g.
/// `    ProviderID    REG_SZ    MS DM Server`.
fn parse_reg_value(stdout: &str, value: &str) -> Option<String> {
    for line in stdout.lines() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with(value) {
            continue;
        }
        // The name must end here; `ProviderIDBackup` is not `ProviderID`.
        let rest = &trimmed[value.len()..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let rest = rest.trim_start();
        let mut cols = rest.splitn(2, char::is_whitespace);
        let _reg_type = cols.next()?;
        return Some(cols.next().unwrap_or("").trim().to_string());
    }
    None
}

/// In-memory registry used by the test suites. Keys are case-insensitive,
/// like the real registry; failures can be injected per key to simulate
/// export or delete errors.
#[derive(Default)]
pub struct MemRegistry {
    keys: BTreeMap<String, BTreeMap<String, String>>,
    pub fail_exports: Vec<String>,
    pub fail_deletes: Vec<String>,
    pub exported: Vec<(String, PathBuf)>,
}

fn norm(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl MemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&mut self, key: &str) {
        self.keys.entry(norm(key)).or_default();
    }

    pub fn set_value(&mut self, key: &str, name: &str, data: &str) {
        self.keys
            .entry(norm(key))
            .or_default()
            .insert(name.to_string(), data.to_string());
    }

    pub fn fail_export_for(&mut self, key: &str) {
        self.fail_exports.push(norm(key));
    }

    pub fn fail_delete_for(&mut self, key: &str) {
        self.fail_deletes.push(norm(key));
    }

    fn covered_by(&self, key: &str) -> bool {
        let k = norm(key);
        let prefix = format!("{k}\\");
        self.keys
            .keys()
            .any(|stored| *stored == k || stored.starts_with(&prefix))
    }
}

impl Registry for MemRegistry {
    fn key_exists(&self, key: &str) -> Result<bool, RegistryError> {
        Ok(self.covered_by(key))
    }

    fn list_subkeys(&self, key: &str) -> Result<Vec<String>, RegistryError> {
        let prefix = format!("{}\\", norm(key));
        let mut children: Vec<String> = Vec::new();
        for stored in self.keys.keys() {
            if let Some(rest) = stored.strip_prefix(&prefix) {
                let child = rest.split('\\').next().unwrap_or(rest);
                if !children.iter().any(|c| c == child) {
                    children.push(child.to_string());
                }
            }
        }
        Ok(children)
    }

    fn read_string(&self, key: &str, value: &str) -> Result<Option<String>, RegistryError> {
        Ok(self
            .keys
            .get(&norm(key))
            .and_then(|values| values.get(value).cloned()))
    }

    fn export(&mut self, key: &str, dest: &Path) -> Result<(), RegistryError> {
        if self.fail_exports.contains(&norm(key)) {
            return Err(RegistryError::Command {
                op: "export",
                key: key.to_string(),
                detail: "injected export failure".to_string(),
            });
        }
        std::fs::write(dest, format!("Windows Registry Editor Version 5.00\r\n\r\n[{key}]\r\n"))
            .map_err(|e| RegistryError::Command {
                op: "export",
                key: key.to_string(),
                detail: e.to_string(),
            })?;
        self.exported.push((key.to_string(), dest.to_path_buf()));
        Ok(())
    }

    fn delete_tree(&mut self, key: &str) -> Result<(), RegistryError> {
        let k = norm(key);
        if self.fail_deletes.contains(&k) {
            return Err(RegistryError::Command {
                op: "delete",
                key: key.to_string(),
                detail: "injected delete failure".to_string(),
            });
        }
        let prefix = format!("{k}\\");
        self.keys
            .retain(|stored, _| *stored != k && !stored.starts_with(&prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reg_query_value_lines() {
        let stdout = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Enrollments\\{guid}\r\n    ProviderID    REG_SZ    MS DM Server\r\n";
        assert_eq!(
            parse_reg_value(stdout, "ProviderID"),
            Some("MS DM Server".to_string())
        );
        assert_eq!(parse_reg_value(stdout, "UPN"), None);
    }

    #[test]
    fn localized_query_lines_never_split_mid_character() {
        // A line long enough to reach the prefix length but carrying a
        // multibyte character before that offset must be rejected, not
        // sliced at a non-boundary.
        assert_eq!(strip_prefix_ci("a\u{e9} x", "ab"), None);
        assert_eq!(strip_prefix_ci("\u{e9}\u{e9}\u{e9}\u{e9}", "abc"), None);
        assert_eq!(strip_prefix_ci(r"HKLM\Sub\Child", r"HKLM\Sub\"), Some("Child"));
    }

    #[test]
    fn value_name_must_end_at_a_column_boundary() {
        let stdout = "    ProviderIDBackup    REG_SZ    stale\r\n    ProviderID    REG_SZ    MS DM Server\r\n";
        assert_eq!(
            parse_reg_value(stdout, "ProviderID"),
            Some("MS DM Server".to_string())
        );
    }

    #[test]
    fn parsed_value_may_contain_spaces() {
        let stdout = "    ProfileImagePath    REG_EXPAND_SZ    C:\\Users\\Jane Doe\r\n";
        assert_eq!(
            parse_reg_value(stdout, "ProfileImagePath"),
            Some("C:\\Users\\Jane Doe".to_string())
        );
    }

    #[test]
    fn mem_registry_is_case_insensitive() {
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Policies\Microsoft");
        assert!(reg.key_exists(r"hklm\software\policies\microsoft").unwrap());
        reg.delete_tree(r"HKLM\Software\POLICIES\Microsoft").unwrap();
        assert!(!reg.key_exists(r"HKLM\SOFTWARE\Policies\Microsoft").unwrap());
    }

    #[test]
    fn parent_of_stored_key_exists() {
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Microsoft\Enrollments\{guid}\DMClient");
        assert!(reg.key_exists(r"HKLM\SOFTWARE\Microsoft\Enrollments").unwrap());
        assert_eq!(
            reg.list_subkeys(r"HKLM\SOFTWARE\Microsoft\Enrollments").unwrap(),
            vec!["{guid}".to_string()]
        );
    }

    #[test]
    fn delete_tree_removes_children() {
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Microsoft\Enrollments\{guid}");
        reg.add_key(r"HKLM\SOFTWARE\Microsoft\Enrollments\{guid}\DMClient");
        reg.delete_tree(r"HKLM\SOFTWARE\Microsoft\Enrollments").unwrap();
        assert!(!reg
            .key_exists(r"HKLM\SOFTWARE\Microsoft\Enrollments\{guid}\DMClient")
            .unwrap());
    }
}
