use std::path::{Path, PathBuf};

use anyhow::Context;

/// Crates the domain must never depend on; it stays a pure function of its inputs.
const DOMAIN_FORBIDDEN_DEPS: &[&str] = &["tokio", "tracing", "async-trait", "dashmap", "dotenvy"];

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;

    let mut violations = Vec::new();
    violations.extend(check_domain_dependencies(&metadata)?);

    let domain_src = workspace_root(&metadata)?.join("crates/domain/src");
    violations.extend(check_domain_sources(&domain_src)?);

    if violations.is_empty() {
        println!("arch-check: ok");
        return Ok(());
    }
    for violation in &violations {
        eprintln!("arch-check: {violation}");
    }
    anyhow::bail!("{} architecture violation(s)", violations.len())
}

fn workspace_root(metadata: &serde_json::Value) -> anyhow::Result<PathBuf> {
    metadata["workspace_root"]
        .as_str()
        .map(PathBuf::from)
        .context("cargo metadata has no workspace_root")
}

fn check_domain_dependencies(metadata: &serde_json::Value) -> anyhow::Result<Vec<String>> {
    let packages = metadata["packages"]
        .as_array()
        .context("cargo metadata has no packages")?;
    let domain = packages
        .iter()
        .find(|p| p["name"] == "charforge-domain")
        .context("charforge-domain not in workspace")?;

    let deps = domain["dependencies"].as_array().cloned().unwrap_or_default();
    Ok(deps
        .iter()
        .filter_map(|d| d["name"].as_str())
        .filter(|name| DOMAIN_FORBIDDEN_DEPS.contains(name))
        .map(|name| format!("charforge-domain depends on '{name}'"))
        .collect())
}

fn check_domain_sources(dir: &Path) -> anyhow::Result<Vec<String>> {
    let rules = ImportRules::new()?;

    let mut violations = Vec::new();
    for path in rust_files(dir)? {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        for (line_no, line) in content.lines().enumerate() {
            if let Some(name) = rules.forbidden_use(line) {
                violations.push(format!(
                    "{}:{} uses '{}' in the domain",
                    path.display(),
                    line_no + 1,
                    name
                ));
            }
        }
    }
    Ok(violations)
}

/// I/O and runtime paths the domain sources must not name.
struct ImportRules {
    /// `tokio::spawn`, `use tokio;`, `use std::fs;`, `std::env::var`
    direct: regex_lite::Regex,
    /// `use std::{fs, io};`
    grouped: regex_lite::Regex,
}

impl ImportRules {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            direct: regex_lite::Regex::new(r"\b(tokio|tracing|std::fs|std::env|std::net)\b")
                .context("compiling import pattern")?,
            grouped: regex_lite::Regex::new(r"\bstd::\{[^}]*\b(fs|env|net)\b")
                .context("compiling grouped import pattern")?,
        })
    }

    fn forbidden_use(&self, line: &str) -> Option<String> {
        if line.trim_start().starts_with("//") {
            return None;
        }
        if let Some(caps) = self.direct.captures(line) {
            return Some(caps[1].to_string());
        }
        self.grouped
            .captures(line)
            .map(|caps| format!("std::{}", &caps[1]))
    }
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current)
            .with_context(|| format!("listing {}", current.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
