//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{CacheBackend, Settings, TranscriptionBackendKind};
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Herald Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Check API keys
    println!("{}", style("API Configuration").bold());
    let api_checks = vec![
        check_openai_api_key(),
        check_optional_key(
            &settings.transcription.assemblyai.api_key_env,
            "Needed only for the assemblyai transcription backend",
        ),
    ];
    for check in &api_checks {
        check.print();
    }
    checks.extend(api_checks);

    println!();

    // Check transcription backends
    println!("{}", style("Transcription").bold());
    let whisper = &settings.transcription.local_whisper.command;
    let whisper_check = if settings
        .transcription
        .backends
        .contains(&TranscriptionBackendKind::LocalWhisper)
    {
        check_tool(whisper, &["--help"], install_hint_whisper())
    } else {
        CheckResult::ok(whisper, "not in backend list")
    };
    whisper_check.print();
    checks.push(whisper_check);

    let order: Vec<String> = settings
        .transcription
        .backends
        .iter()
        .map(|b| b.to_string())
        .collect();
    let order_check = CheckResult::ok("Backend order", &order.join(" -> "));
    order_check.print();
    checks.push(order_check);

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(settings);
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Herald.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Herald is ready to use.");
    }

    Ok(())
}

/// Check if an external tool runs.
fn check_tool(command: &str, args: &[&str], hint: &str) -> CheckResult {
    match Command::new(command).args(args).output() {
        Ok(output) if output.status.success() => CheckResult::ok(command, "installed"),
        Ok(_) => CheckResult::error(command, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(command, "not found", hint)
        }
        Err(e) => CheckResult::error(command, &format!("error: {}", e), hint),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check a key that only some backends need.
fn check_optional_key(var: &str, hint: &str) -> CheckResult {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => CheckResult::ok(var, "configured"),
        _ => CheckResult::warning(var, "not set", hint),
    }
}

/// Check data and cache locations.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let cache = match settings.cache.backend {
        CacheBackend::Memory => CheckResult::ok("Embedding cache", "in memory (not persisted)"),
        CacheBackend::File => {
            let dir = settings.cache_dir();
            if dir.exists() {
                let size = dir_size(&dir);
                CheckResult::ok(
                    "Embedding cache",
                    &format!("{} ({})", dir.display(), format_size(size)),
                )
            } else {
                CheckResult::warning(
                    "Embedding cache",
                    &format!("{} (not created yet)", dir.display()),
                    "Cache will be created on first index",
                )
            }
        }
        CacheBackend::Sqlite => {
            let db_path = settings.cache_sqlite_path();
            if db_path.exists() {
                let size = std::fs::metadata(&db_path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                CheckResult::ok(
                    "Embedding cache",
                    &format!("{} ({})", db_path.display(), size),
                )
            } else {
                CheckResult::warning(
                    "Embedding cache",
                    &format!("{} (not created yet)", db_path.display()),
                    "Database will be created on first index",
                )
            }
        }
    };
    results.push(cache);

    results
}

/// Total size of the files directly inside `dir`.
fn dir_size(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Check that the config file exists and loads.
fn check_config_file(settings: &Settings) -> CheckResult {
    let config_path = Settings::default_config_path();
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: herald config edit",
        );
    }
    match settings.validate() {
        Ok(()) => CheckResult::ok("Config file", &format!("{}", config_path.display())),
        Err(e) => CheckResult::error("Config file", &e.to_string(), "Fix with: herald config edit"),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Install hint for the Whisper CLI.
fn install_hint_whisper() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install openai-whisper"
    } else {
        "Install with: pip install openai-whisper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_optional_key_missing_is_warning() {
        let result = check_optional_key("HERALD_TEST_UNSET_KEY", "hint");
        assert_eq!(result.status, CheckStatus::Warning);
    }

    #[test]
    fn test_missing_tool_is_error() {
        let result = check_tool("herald-no-such-binary", &["--help"], "install it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.message, "not found");
    }

    #[test]
    fn test_dir_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), [0u8; 10]).unwrap();
        std::fs::write(dir.path().join("b.json"), [0u8; 5]).unwrap();
        assert_eq!(dir_size(dir.path()), 15);
        assert_eq!(dir_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
