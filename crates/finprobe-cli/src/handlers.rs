//! Subcommand implementations

use finprobe::reporter::FailureCategory;
use finprobe::SuiteConfig;
use tracing::debug;

use crate::commands::{CategorizeArgs, Cli, Commands, ConfigArgs, ConfigFormat, ProjectsArgs, SetupArgs};
use crate::error::{CliError, CliResult};
use crate::output::Printer;

/// Test target the setup project runs
pub const SETUP_SUITE: &str = "auth_setup";

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> CliResult<()> {
    let printer = Printer::new(cli.quiet);
    let config = SuiteConfig::load(cli.config.as_deref())?;
    debug!(base_url = %config.base_url, "configuration resolved");

    match cli.command {
        Commands::Setup(args) => setup(config, &args, &printer),
        Commands::Config(args) => show_config(&config, &args, &printer),
        Commands::Projects(args) => projects(&config, &args, &printer),
        Commands::Categorize(args) => categorize(&args, &printer),
    }
}

// =============================================================================
// config / projects / categorize
// =============================================================================

/// Serialized configuration
pub fn render_config(config: &SuiteConfig, format: ConfigFormat) -> CliResult<String> {
    match format {
        ConfigFormat::Yaml => Ok(config.to_yaml()?),
        ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
    }
}

fn show_config(config: &SuiteConfig, args: &ConfigArgs, printer: &Printer) -> CliResult<()> {
    let rendered = render_config(config, args.format)?;
    printer.line(rendered.trim_end())?;
    Ok(())
}

/// One line per project
#[must_use]
pub fn render_projects(config: &SuiteConfig) -> Vec<String> {
    config
        .projects
        .iter()
        .map(|p| {
            let deps = if p.dependencies.is_empty() {
                "-".to_string()
            } else {
                p.dependencies.join(",")
            };
            format!(
                "{:<10} match={} ignore={} timeout={}ms session={} deps={}",
                p.name,
                p.test_match.as_deref().unwrap_or("*"),
                p.test_ignore.as_deref().unwrap_or("-"),
                p.timeout_ms.unwrap_or(config.test_timeout_ms),
                if p.uses_session { "yes" } else { "no" },
                deps,
            )
        })
        .collect()
}

/// `suite -> project` line for the project that runs `suite`
pub fn resolve_suite(config: &SuiteConfig, suite: &str) -> CliResult<String> {
    let project = config
        .project_for(suite)
        .ok_or_else(|| CliError::UnknownSuite {
            suite: suite.to_string(),
        })?;
    Ok(format!(
        "{suite} -> {} (timeout {}ms)",
        project.name,
        config.test_timeout_for(suite).as_millis()
    ))
}

fn projects(config: &SuiteConfig, args: &ProjectsArgs, printer: &Printer) -> CliResult<()> {
    if let Some(suite) = &args.suite {
        printer.line(&resolve_suite(config, suite)?)?;
        return Ok(());
    }
    printer.heading("Projects")?;
    for line in render_projects(config) {
        printer.line(&line)?;
    }
    Ok(())
}

fn categorize(args: &CategorizeArgs, printer: &Printer) -> CliResult<()> {
    printer.line(FailureCategory::categorize(&args.message).as_str())?;
    Ok(())
}

// =============================================================================
// setup
// =============================================================================

#[cfg(not(feature = "browser"))]
fn setup(_config: SuiteConfig, _args: &SetupArgs, _printer: &Printer) -> CliResult<()> {
    Err(CliError::FeatureDisabled {
        command: "setup",
        feature: "browser",
    })
}

#[cfg(feature = "browser")]
fn setup(config: SuiteConfig, args: &SetupArgs, printer: &Printer) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(browser_setup::run(config, args, printer))
}

#[cfg(feature = "browser")]
mod browser_setup {
    use finprobe::dates::unique_email;
    use finprobe::pages::{AuthPage, DashboardPage};
    use finprobe::reporter::render_steps;
    use finprobe::{SuiteConfig, TestContext, TestStatus};
    use tracing::{info, warn};

    use super::SETUP_SUITE;
    use crate::commands::SetupArgs;
    use crate::error::{CliError, CliResult};
    use crate::output::Printer;

    const SMOKE_PASSWORD: &str = "SecurePass123!";

    pub(super) async fn run(
        mut config: SuiteConfig,
        args: &SetupArgs,
        printer: &Printer,
    ) -> CliResult<()> {
        if args.headed {
            config.headless = false;
        }
        let session_path = config.session_path.clone();
        let register = !args.skip_register;

        let spinner = printer.spinner("launching chromium");
        let ctx = TestContext::launch_with(config, SETUP_SUITE).await?;
        let credentials = &ctx.config().credentials;
        let session = ctx.session();

        spinner.set_message("registering and signing in");
        let entry = ctx
            .run("setup", |page| async move {
                let auth = AuthPage::new(&page);
                if register {
                    let email = unique_email("john.doe", "example.com");
                    info!(%email, "registering smoke account");
                    auth.navigate_to_register().await?;
                    auth.register(&credentials.full_name, &email, SMOKE_PASSWORD)
                        .await?;
                    auth.verify_registration_success().await?;
                }
                auth.navigate_to_login().await?;
                auth.login(&credentials.email, &credentials.password).await?;
                DashboardPage::for_user(&page, &credentials.full_name)
                    .verify_welcome_message()
                    .await?;
                session.ensure(|| page.storage_state()).await.map(drop)
            })
            .await;
        spinner.finish_and_clear();

        let report = ctx.write_report(vec![entry.clone()]);
        if let Err(e) = ctx.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        let reporter = report?;

        if entry.status != TestStatus::Passed {
            printer.failure(&render_steps(&entry.steps))?;
            return Err(CliError::setup_failed(entry.error.unwrap_or_default()));
        }
        printer.success(&format!("session saved to {}", session_path.display()))?;
        printer.line(&reporter.summary())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use finprobe::ProjectConfig;

    mod render_tests {
        use super::*;

        #[test]
        fn test_yaml_and_json_carry_the_same_config() {
            let config = SuiteConfig::default();
            let yaml = render_config(&config, ConfigFormat::Yaml).unwrap();
            let json = render_config(&config, ConfigFormat::Json).unwrap();
            assert_eq!(SuiteConfig::from_yaml_str(&yaml).unwrap(), config);
            let parsed: SuiteConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, config);
        }

        #[test]
        fn test_default_projects_listed_in_order() {
            let lines = render_projects(&SuiteConfig::default());
            assert_eq!(lines.len(), 3);
            assert!(lines[0].starts_with("setup"));
            assert!(lines[0].contains("session=no"));
            assert!(lines[2].starts_with("ai-tests"));
            assert!(lines[2].contains("timeout=30000ms"));
            assert!(lines[2].contains("deps=setup"));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_ai_suite_resolves_to_ai_project() {
            let line = resolve_suite(&SuiteConfig::default(), "ai_insights").unwrap();
            assert_eq!(line, "ai_insights -> ai-tests (timeout 30000ms)");
        }

        #[test]
        fn test_setup_suite_resolves_to_setup() {
            let line = resolve_suite(&SuiteConfig::default(), SETUP_SUITE).unwrap();
            assert!(line.starts_with("auth_setup -> setup"));
        }

        #[test]
        fn test_unclaimed_suite_is_an_error() {
            let config = SuiteConfig {
                projects: vec![ProjectConfig {
                    name: "setup".to_string(),
                    test_match: Some("^auth_setup$".to_string()),
                    ..ProjectConfig::default()
                }],
                ..SuiteConfig::default()
            };
            let err = resolve_suite(&config, "expenses").unwrap_err();
            assert!(matches!(err, CliError::UnknownSuite { .. }));
        }
    }
}
