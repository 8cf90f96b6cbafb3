//! Every mutating primitive the engine uses, gated by the run's dry-run
//! flag in exactly one place each. Higher-level steps must call through
//! this facade instead of touching the filesystem, registry or external
//! tools directly; duplicating the dry-run check per call site is the
//! defect this module exists to prevent.
//!
//! Under dry-run each primitive logs the identical line it would log on
//! success and returns a success value with zero side effects. Read-only
//! operations are never gated.

use crate::domain::models::RunContext;
use crate::services::registry::{Registry, RegistryError};
use std::io;
use std::path::Path;
use std::process::Command;

pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
}

/// External command invocation seam. Production runs the real tool;
/// tests substitute a recording fake.
pub trait ToolRunner {
    fn run(&mut self, program: &str, args: &[&str]) -> io::Result<ToolOutput>;
}

pub struct SystemTools;

impl ToolRunner for SystemTools {
    fn run(&mut self, program: &str, args: &[&str]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}

pub struct Ops<'a> {
    pub registry: &'a mut dyn Registry,
    pub tools: &'a mut dyn ToolRunner,
}

impl<'a> Ops<'a> {
    pub fn new(registry: &'a mut dyn Registry, tools: &'a mut dyn ToolRunner) -> Self {
        Self { registry, tools }
    }

    pub fn create_dir_all(&mut self, ctx: &mut RunContext, path: &Path) -> io::Result<()> {
        if !ctx.dry_run {
            std::fs::create_dir_all(path)?;
        }
        ctx.log.info(format!("Created directory {}", path.display()));
        Ok(())
    }

    pub fn copy_tree(&mut self, ctx: &mut RunContext, src: &Path, dst: &Path) -> io::Result<()> {
        if !ctx.dry_run {
            copy_dir_all(src, dst)?;
        }
        ctx.log.info(format!(
            "Copied {} to {}",
            src.display(),
            dst.display()
        ));
        Ok(())
    }

    pub fn remove_tree(&mut self, ctx: &mut RunContext, path: &Path) -> io::Result<()> {
        if !ctx.dry_run {
            std::fs::remove_dir_all(path)?;
        }
        ctx.log
            .info(format!("Removed directory tree {}", path.display()));
        Ok(())
    }

    pub fn rename(&mut self, ctx: &mut RunContext, from: &Path, to: &Path) -> io::Result<()> {
        if !ctx.dry_run {
            std::fs::rename(from, to)?;
        }
        ctx.log
            .info(format!("Renamed {} to {}", from.display(), to.display()));
        Ok(())
    }

    pub fn write_file(
        &mut self,
        ctx: &mut RunContext,
        path: &Path,
        contents: &str,
    ) -> io::Result<()> {
        if !ctx.dry_run {
            std::fs::write(path, contents)?;
        }
        ctx.log.info(format!("Wrote {}", path.display()));
        Ok(())
    }

    pub fn export_key(
        &mut self,
        ctx: &mut RunContext,
        key: &str,
        dest: &Path,
    ) -> Result<(), RegistryError> {
        if !ctx.dry_run {
            self.registry.export(key, dest)?;
        }
        ctx.log
            .info(format!("Exported {} to {}", key, dest.display()));
        Ok(())
    }

    pub fn delete_key_tree(&mut self, ctx: &mut RunContext, key: &str) -> Result<(), RegistryError> {
        if !ctx.dry_run {
            self.registry.delete_tree(key)?;
        }
        ctx.log.info(format!("Deleted registry key {key}"));
        Ok(())
    }

    pub fn run_tool(
        &mut self,
        ctx: &mut RunContext,
        program: &str,
        args: &[&str],
    ) -> io::Result<ToolOutput> {
        if ctx.dry_run {
            ctx.log.info(format!("Ran {} {}", program, args.join(" ")));
            return Ok(ToolOutput {
                code: 0,
                stdout: String::new(),
            });
        }
        let out = self.tools.run(program, args)?;
        ctx.log.info(format!(
            "Ran {} {} (exit code {})",
            program,
            args.join(" "),
            out.code
        ));
        Ok(out)
    }
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let to = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            std::fs::copy(entry.path(), to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::MemRegistry;
    use std::path::PathBuf;

    fn dry_ctx() -> RunContext {
        RunContext::new(PathBuf::from("unused"), true, false, false, false)
    }

    struct NoTools;
    impl ToolRunner for NoTools {
        fn run(&mut self, _program: &str, _args: &[&str]) -> io::Result<ToolOutput> {
            panic!("dry-run must not reach the tool runner");
        }
    }

    #[test]
    fn dry_run_logs_without_side_effects() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reg = MemRegistry::new();
        reg.add_key(r"HKLM\SOFTWARE\Policies\Microsoft");
        let mut tools = NoTools;
        let mut ctx = dry_ctx();
        let mut ops = Ops::new(&mut reg, &mut tools);

        let dir = tmp.path().join("newdir");
        ops.create_dir_all(&mut ctx, &dir).unwrap();
        assert!(!dir.exists());

        ops.delete_key_tree(&mut ctx, r"HKLM\SOFTWARE\Policies\Microsoft")
            .unwrap();
        drop(ops);
        assert!(reg.key_exists(r"HKLM\SOFTWARE\Policies\Microsoft").unwrap());
        let mut ops = Ops::new(&mut reg, &mut tools);

        let file = tmp.path().join("summary.json");
        ops.write_file(&mut ctx, &file, "{}").unwrap();
        assert!(!file.exists());

        assert_eq!(ctx.log.entries().len(), 3);
    }

    #[test]
    fn dry_run_tool_reports_success_without_spawning() {
        let mut reg = MemRegistry::new();
        let mut tools = NoTools;
        let mut ctx = dry_ctx();
        let mut ops = Ops::new(&mut reg, &mut tools);

        let out = ops.run_tool(&mut ctx, "gpupdate", &["/force"]).unwrap();
        assert_eq!(out.code, 0);
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested/a.pol"), b"data").unwrap();

        let mut reg = MemRegistry::new();
        let mut tools = SystemTools;
        let mut ctx = RunContext::new(tmp.path().to_path_buf(), false, false, false, false);
        let mut ops = Ops::new(&mut reg, &mut tools);

        let dst = tmp.path().join("dst");
        ops.copy_tree(&mut ctx, &src, &dst).unwrap();
        assert_eq!(std::fs::read(dst.join("nested/a.pol")).unwrap(), b"data");
    }
}
