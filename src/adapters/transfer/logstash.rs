//! Logstash transfer driver
//!
//! This module drives one window's worth of document copying by rendering
//! a Logstash pipeline for the window and running the logstash binary on
//! it. The pipeline reads the window from the source cluster and upserts
//! into the target by document id, which is what makes re-running a
//! window after a crash safe.

use crate::adapters::transfer::traits::TransferDriver;
use crate::config::{CaravelConfig, ClusterConfig, MigrationConfig, SecretString, TransferConfig};
use crate::domain::{BatchResult, Result, TimeWindow, TransferError, TransferJob};
use async_trait::async_trait;
use chrono::SecondsFormat;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Pipeline used when no template file is configured
const DEFAULT_PIPELINE_TEMPLATE: &str = r##"input {
  elasticsearch {
    hosts => ["{{source_url}}"]
    index => "{{index_pattern}}"
    query => '{"query":{"range":{"{{timestamp_field}}":{"gte":{{window_start_millis}},"lt":{{window_end_millis}},"format":"epoch_millis"}}},"sort":[{"{{timestamp_field}}":"asc"}]}'
    docinfo => true
    docinfo_target => "[@metadata][doc]"
    {{source_auth}}
    {{source_tls}}
  }
}

filter {
  mutate {
    remove_field => ["@version"]
  }
}

output {
  elasticsearch {
    hosts => ["{{target_url}}"]
    index => "%{[@metadata][doc][_index]}"
    document_id => "%{[@metadata][doc][_id]}"
    action => "index"
    {{target_auth}}
    {{target_tls}}
  }
}
"##;

/// Transfer driver that shells out to Logstash
///
/// Each window gets its own rendered pipeline file in the workdir, named
/// after the window bounds, so a failed run leaves the exact pipeline
/// behind for inspection.
pub struct LogstashDriver {
    transfer: TransferConfig,
    source: ClusterConfig,
    target: ClusterConfig,
    migration: MigrationConfig,
    template: String,
}

impl LogstashDriver {
    /// Create a driver from the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configured template file cannot be read.
    pub fn new(config: &CaravelConfig) -> Result<Self> {
        let template = match &config.transfer.template_path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                TransferError::Template(format!("cannot read template {path}: {e}"))
            })?,
            None => DEFAULT_PIPELINE_TEMPLATE.to_string(),
        };

        Ok(Self {
            transfer: config.transfer.clone(),
            source: config.source.clone(),
            target: config.target.clone(),
            migration: config.migration.clone(),
            template,
        })
    }

    /// Render the pipeline for one window
    ///
    /// Window bounds are offered both as epoch milliseconds (what the
    /// default query uses) and as RFC 3339 for custom templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the template still contains an unresolved
    /// placeholder after substitution.
    fn render_pipeline(&self, window: &TimeWindow) -> Result<String> {
        let rendered = self
            .template
            .replace("{{source_url}}", &self.source.url)
            .replace("{{target_url}}", &self.target.url)
            .replace("{{index_pattern}}", &self.migration.index_pattern)
            .replace("{{timestamp_field}}", &self.migration.timestamp_field)
            .replace(
                "{{window_start_millis}}",
                &window.start().timestamp_millis().to_string(),
            )
            .replace(
                "{{window_end_millis}}",
                &window.end().timestamp_millis().to_string(),
            )
            .replace(
                "{{window_start}}",
                &window.start().to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .replace(
                "{{window_end}}",
                &window.end().to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .replace(
                "{{source_auth}}",
                &auth_fragment(&self.source.username, &self.source.password),
            )
            .replace(
                "{{target_auth}}",
                &auth_fragment(&self.target.username, &self.target.password),
            )
            .replace("{{source_tls}}", tls_fragment(self.source.tls_verify))
            .replace("{{target_tls}}", tls_fragment(self.target.tls_verify));

        if let Some(start) = rendered.find("{{") {
            let tail = &rendered[start..];
            let placeholder = match tail.find("}}") {
                Some(end) => &tail[..end + 2],
                None => "{{",
            };
            return Err(TransferError::Template(format!(
                "unresolved placeholder {placeholder} in pipeline template"
            ))
            .into());
        }

        Ok(rendered)
    }

    fn pipeline_path(&self, window: &TimeWindow) -> PathBuf {
        PathBuf::from(&self.transfer.workdir).join(format!(
            "pipeline-{}-{}.conf",
            window.start().timestamp_millis(),
            window.end().timestamp_millis()
        ))
    }

    fn write_pipeline(&self, window: &TimeWindow, rendered: &str) -> Result<PathBuf> {
        let workdir = PathBuf::from(&self.transfer.workdir);
        std::fs::create_dir_all(&workdir).map_err(|e| {
            TransferError::Workspace(format!(
                "cannot create workdir {}: {e}",
                workdir.display()
            ))
        })?;

        let path = self.pipeline_path(window);
        std::fs::write(&path, rendered).map_err(|e| {
            TransferError::Workspace(format!("cannot write pipeline {}: {e}", path.display()))
        })?;

        Ok(path)
    }
}

#[async_trait]
impl TransferDriver for LogstashDriver {
    async fn transfer(&self, job: &TransferJob) -> Result<BatchResult> {
        let rendered = self.render_pipeline(&job.window)?;
        let pipeline_path = self.write_pipeline(&job.window, &rendered)?;

        tracing::info!(
            window = %job.window,
            estimated_rows = job.estimated_rows,
            pipeline = %pipeline_path.display(),
            "Starting transfer"
        );

        let mut command = Command::new(&self.transfer.executable);
        command
            .arg("-f")
            .arg(&pipeline_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(java_home) = &self.transfer.java_home {
            command.env("LS_JAVA_HOME", java_home);
        }

        let child = command.spawn().map_err(|e| {
            TransferError::SpawnFailed(format!(
                "failed to spawn `{}`: {e}",
                self.transfer.executable
            ))
        })?;

        let timeout = Duration::from_secs(self.transfer.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                TransferError::SpawnFailed(format!("failed waiting for transfer process: {e}"))
            })?,
            // Dropping the future kills the process (kill_on_drop)
            Err(_) => return Err(TransferError::Timeout(self.transfer.timeout_secs).into()),
        };

        if output.status.success() {
            tracing::info!(window = %job.window, "Transfer process completed");
            return Ok(BatchResult::success(job.window, job.estimated_rows));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(TransferError::ExitFailure {
            code: output.status.code().unwrap_or(-1),
            message: tail(&stderr, 4_000),
        }
        .into())
    }
}

fn auth_fragment(username: &Option<String>, password: &Option<SecretString>) -> String {
    match (username, password) {
        (Some(user), Some(pass)) => {
            let secret: &str = pass.expose_secret().as_ref();
            format!("user => \"{user}\"\n    password => \"{secret}\"")
        }
        _ => String::new(),
    }
}

fn tls_fragment(tls_verify: bool) -> &'static str {
    if tls_verify {
        ""
    } else {
        "ssl_certificate_verification => false"
    }
}

/// Last `max` bytes of a string, on a character boundary
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = s.len() - max;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    s[cut..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        TimeWindow::starting_at(start, chrono::Duration::hours(1)).unwrap()
    }

    fn base_config(workdir: &TempDir) -> CaravelConfig {
        let toml = format!(
            r#"
            [source]
            url = "http://source.internal:9200"

            [target]
            url = "http://target.internal:9200"

            [migration]
            index_pattern = "logs-*"

            [transfer]
            workdir = "{}"
            "#,
            workdir.path().display()
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn test_default_template_renders_completely() {
        let dir = TempDir::new().unwrap();
        let driver = LogstashDriver::new(&base_config(&dir)).unwrap();

        let rendered = driver.render_pipeline(&sample_window()).unwrap();

        assert!(!rendered.contains("{{"));
        assert!(rendered.contains("http://source.internal:9200"));
        assert!(rendered.contains("http://target.internal:9200"));
        assert!(rendered.contains("logs-*"));
        assert!(rendered.contains("@timestamp"));
        assert!(rendered.contains("\"gte\":1709251200000"));
        assert!(rendered.contains("\"lt\":1709254800000"));
        assert!(rendered.contains("epoch_millis"));
    }

    #[test]
    fn test_custom_template_gets_rfc3339_bounds() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("custom.conf");
        std::fs::write(&template_path, "# {{window_start}} .. {{window_end}}").unwrap();

        let mut config = base_config(&dir);
        config.transfer.template_path = Some(template_path.display().to_string());

        let driver = LogstashDriver::new(&config).unwrap();
        let rendered = driver.render_pipeline(&sample_window()).unwrap();

        assert_eq!(rendered, "# 2024-03-01T00:00:00.000Z .. 2024-03-01T01:00:00.000Z");
    }

    #[test]
    fn test_render_includes_credentials_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(&dir);
        config.source.username = Some("reader".to_string());
        config.source.password = Some(secret_string("hunter2".to_string()));

        let driver = LogstashDriver::new(&config).unwrap();
        let rendered = driver.render_pipeline(&sample_window()).unwrap();

        assert!(rendered.contains("user => \"reader\""));
        assert!(rendered.contains("password => \"hunter2\""));
    }

    #[test]
    fn test_render_omits_credentials_when_absent() {
        let dir = TempDir::new().unwrap();
        let driver = LogstashDriver::new(&base_config(&dir)).unwrap();

        let rendered = driver.render_pipeline(&sample_window()).unwrap();

        assert!(!rendered.contains("user =>"));
        assert!(!rendered.contains("password =>"));
    }

    #[test]
    fn test_render_disables_tls_verification_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(&dir);
        config.target.tls_verify = false;

        let driver = LogstashDriver::new(&config).unwrap();
        let rendered = driver.render_pipeline(&sample_window()).unwrap();

        assert!(rendered.contains("ssl_certificate_verification => false"));
    }

    #[test]
    fn test_unknown_placeholder_is_a_template_error() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("custom.conf");
        std::fs::write(&template_path, "input { {{no_such_thing}} }").unwrap();

        let mut config = base_config(&dir);
        config.transfer.template_path = Some(template_path.display().to_string());

        let driver = LogstashDriver::new(&config).unwrap();
        let err = driver.render_pipeline(&sample_window()).unwrap_err();

        assert!(err.to_string().contains("{{no_such_thing}}"));
    }

    #[test]
    fn test_missing_template_file_fails_construction() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(&dir);
        config.transfer.template_path = Some("/no/such/template.conf".to_string());

        assert!(LogstashDriver::new(&config).is_err());
    }

    #[test]
    fn test_tail_keeps_short_strings() {
        assert_eq!(tail("short", 100), "short");
    }

    #[test]
    fn test_tail_truncates_long_strings() {
        let long = "x".repeat(50);
        let tailed = tail(&long, 10);
        assert_eq!(tailed.len(), 10);
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_executable(dir: &TempDir, script: &str) -> String {
            let path = dir.path().join("fake-logstash");
            std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.display().to_string()
        }

        fn job() -> TransferJob {
            TransferJob::new(sample_window(), 2_500)
        }

        #[tokio::test]
        async fn test_successful_run_reports_estimated_rows() {
            let dir = TempDir::new().unwrap();
            let mut config = base_config(&dir);
            config.transfer.executable = fake_executable(&dir, "exit 0");

            let driver = LogstashDriver::new(&config).unwrap();
            let result = driver.transfer(&job()).await.unwrap();

            assert!(result.succeeded);
            assert_eq!(result.rows_transferred, 2_500);
        }

        #[tokio::test]
        async fn test_pipeline_file_is_written_before_run() {
            let dir = TempDir::new().unwrap();
            let mut config = base_config(&dir);
            // The script fails unless the -f argument points at a real file
            config.transfer.executable = fake_executable(&dir, r#"test -f "$2" || exit 9"#);

            let driver = LogstashDriver::new(&config).unwrap();
            let result = driver.transfer(&job()).await.unwrap();

            assert!(result.succeeded);
            assert!(driver.pipeline_path(&sample_window()).exists());
        }

        #[tokio::test]
        async fn test_nonzero_exit_surfaces_stderr() {
            let dir = TempDir::new().unwrap();
            let mut config = base_config(&dir);
            config.transfer.executable =
                fake_executable(&dir, "echo 'pipeline exploded' >&2; exit 3");

            let driver = LogstashDriver::new(&config).unwrap();
            let err = driver.transfer(&job()).await.unwrap_err();

            match err {
                crate::domain::CaravelError::Transfer(TransferError::ExitFailure {
                    code,
                    message,
                }) => {
                    assert_eq!(code, 3);
                    assert!(message.contains("pipeline exploded"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_slow_process_times_out() {
            let dir = TempDir::new().unwrap();
            let mut config = base_config(&dir);
            config.transfer.executable = fake_executable(&dir, "sleep 30");
            config.transfer.timeout_secs = 1;

            let driver = LogstashDriver::new(&config).unwrap();
            let err = driver.transfer(&job()).await.unwrap_err();

            assert!(matches!(
                err,
                crate::domain::CaravelError::Transfer(TransferError::Timeout(1))
            ));
        }

        #[tokio::test]
        async fn test_missing_executable_is_spawn_failure() {
            let dir = TempDir::new().unwrap();
            let mut config = base_config(&dir);
            config.transfer.executable = "/no/such/binary".to_string();

            let driver = LogstashDriver::new(&config).unwrap();
            let err = driver.transfer(&job()).await.unwrap_err();

            assert!(matches!(
                err,
                crate::domain::CaravelError::Transfer(TransferError::SpawnFailed(_))
            ));
        }
    }
}
