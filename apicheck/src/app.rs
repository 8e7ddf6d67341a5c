use apicheck_core::{
    get_apicheck_config, Aggregator, Artifacts, Client, Filter, Format, IgnoreFilter,
    ListReporter, NullReporter, ProjectConfig, ProjectName, Reporter, ReporterType, Runner,
    Scenario, TableReporter,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};
use console::{style, Term};
use itertools::Itertools;
use std::{collections::HashMap, path::PathBuf, str::FromStr, sync::Arc};
use tracing::*;

type BoxedReporter = Box<dyn Reporter + Send>;

/// Builds the scenario list for a project.
pub type SuiteFactory = Box<dyn Fn(&ProjectConfig) -> eyre::Result<Vec<Scenario>> + Send + Sync>;

/// Build the CLI with clap's builder pattern
fn build_cli<'a>(third_party_reporters: impl Iterator<Item = &'a String>) -> ClapCommand {
    let reporter_choices = [
        ReporterType::List.to_string(),
        ReporterType::Table.to_string(),
        ReporterType::Null.to_string(),
    ]
    .into_iter()
    .chain(third_party_reporters.cloned())
    .join(", ");
    ClapCommand::new("apicheck")
        .about("apicheck verifies a JSON/HTTP API against declared response contracts")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .subcommand(
            ClapCommand::new("test")
                .about("Run scenarios and write the report")
                .arg(Arg::new("capture-http")
                    .long("capture-http")
                    .help("Print captured requests and responses")
                    .action(ArgAction::SetTrue))
                .arg(Arg::new("capture-rust")
                    .long("capture-rust")
                    .help("Print apicheck's internal tracing logs. The filter can be set with RUST_LOG (default \"info\")")
                    .action(ArgAction::SetTrue))
                .arg(Arg::new("show-sensitive")
                    .long("show-sensitive")
                    .help("Do not mask credentials in captured requests")
                    .action(ArgAction::SetTrue))
                .arg(Arg::new("projects")
                    .short('p')
                    .long("projects")
                    .help("Specify projects to run in comma-separated string. --projects dev,staging")
                    .value_delimiter(',')
                    .action(ArgAction::Append))
                .arg(Arg::new("scenarios")
                    .short('s')
                    .long("scenarios")
                    .help("Specify scenarios to run in comma-separated string. e.g. --scenarios login,get_users")
                    .value_delimiter(',')
                    .action(ArgAction::Append))
                .arg(Arg::new("reporters")
                    .long("reporters")
                    .help(format!("Specify the reporters to use in comma-separated string. Default is \"list\". [possible values: {reporter_choices}]"))
                    .value_delimiter(',')
                    .action(ArgAction::Append))
                .arg(Arg::new("concurrency")
                    .short('c')
                    .long("concurrency")
                    .help("Specify the maximum number of scenarios to run in parallel. When unspecified, the project setting applies, otherwise all run in parallel")
                    .value_parser(value_parser!(usize)))
                .arg(Arg::new("report-dir")
                    .long("report-dir")
                    .help("Directory the report artifacts are written to")
                    .default_value("apicheck-report")
                    .value_parser(value_parser!(PathBuf)))
                .arg(Arg::new("format")
                    .long("format")
                    .help("Report artifact formats in comma-separated string [possible values: json, html]")
                    .value_delimiter(',')
                    .default_values(["html", "json"])
                    .action(ArgAction::Append))
                .arg(Arg::new("no-report")
                    .long("no-report")
                    .help("Do not write report artifacts")
                    .action(ArgAction::SetTrue))
                .arg(Arg::new("color")
                    .long("color")
                    .help("Produce color output. Default is \"auto\" [env: CARGO_TERM_COLOR]")
                    .value_parser(["auto", "always", "never"]))
        )
        .subcommand(
            ClapCommand::new("ls")
                .about("List scenarios")
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|vals| vals.cloned().collect::<Vec<_>>())
        .unwrap_or_default()
}

/// apicheck CLI.
pub struct App {
    suite: SuiteFactory,
    third_party_reporters: HashMap<String, BoxedReporter>,
}

impl Default for App {
    fn default() -> App {
        App::with_suite(crate::suite::dummyjson)
    }
}

impl App {
    /// CLI running the built-in dummyjson suite.
    pub fn new() -> App {
        App::default()
    }

    /// CLI running a custom suite.
    pub fn with_suite(
        suite: impl Fn(&ProjectConfig) -> eyre::Result<Vec<Scenario>> + Send + Sync + 'static,
    ) -> App {
        App {
            suite: Box::new(suite),
            third_party_reporters: HashMap::new(),
        }
    }

    /// Install a third-party reporter.
    pub fn install_reporter(
        &mut self,
        name: impl Into<String>,
        reporter: impl Reporter + 'static + Send,
    ) {
        self.third_party_reporters
            .insert(name.into(), Box::new(reporter));
    }

    /// Parse command-line args and run apicheck CLI sub command.
    pub async fn run(mut self) -> eyre::Result<()> {
        let matches = build_cli(self.third_party_reporters.keys()).get_matches();
        color_eyre::install()?;

        match matches.subcommand() {
            Some(("test", test_matches)) => self.test(test_matches).await,
            Some(("ls", _)) => self.list(),
            _ => unreachable!("Subcommand required is set to true"),
        }
    }

    fn projects(names: &[ProjectName]) -> eyre::Result<Vec<Arc<ProjectConfig>>> {
        let cfg = get_apicheck_config()?;
        if names.is_empty() {
            return Ok(cfg.projects.clone());
        }
        names
            .iter()
            .map(|name| {
                cfg.project(name)
                    .cloned()
                    .ok_or_else(|| eyre::eyre!("project \"{name}\" not found in apicheck.toml"))
            })
            .collect()
    }

    async fn test(&mut self, matches: &ArgMatches) -> eyre::Result<()> {
        let capture_http = matches.get_flag("capture-http");
        let show_sensitive = matches.get_flag("show-sensitive");
        let projects = strings(matches, "projects");
        let scenarios = strings(matches, "scenarios");
        let reporter_names = Some(strings(matches, "reporters"))
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| vec![ReporterType::List.to_string()]);
        let concurrency = matches.get_one::<usize>("concurrency").cloned();
        let report_dir = if matches.get_flag("no-report") {
            None
        } else {
            matches.get_one::<PathBuf>("report-dir").cloned()
        };
        let formats = strings(matches, "format")
            .iter()
            .map(|f| Format::from_str(f).map_err(|_| eyre::eyre!("Unknown report format: {f}")))
            .collect::<eyre::Result<Vec<_>>>()?;
        let color_command = matches
            .get_one::<String>("color")
            .and_then(|s| Color::from_str(s).ok());

        if matches.get_flag("capture-rust") {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        apply_color(color_command);

        let term = Term::stdout();
        let mut has_any_failure = false;

        for project in Self::projects(&projects)? {
            term.write_line(&format!("{}", style(format!("[{}]", project.name)).bold()))?;

            let transport = Arc::new(Client::with_base_url(project.base_url()?)?);
            let aggregator = match &report_dir {
                Some(dir) => Aggregator::with_artifacts(
                    project.name.clone(),
                    Artifacts {
                        dir: dir.clone(),
                        stem: project.name.clone(),
                        formats: formats.clone(),
                    },
                ),
                None => Aggregator::new(project.name.clone()),
            };

            let mut runner = Runner::for_project(&project, transport, aggregator);
            runner.options_mut().mask_sensitive = !show_sensitive;
            if capture_http {
                runner.capture_http();
            }
            if let Some(concurrency) = concurrency {
                runner.set_concurrency(concurrency);
            }
            runner.add_scenarios((self.suite)(&project)?);

            let mut builtin: Vec<BoxedReporter> = Vec::new();
            let mut third_party = Vec::new();
            for name in &reporter_names {
                match ReporterType::from_str(name) {
                    Ok(ReporterType::List) => builtin.push(Box::new(ListReporter::new(capture_http))),
                    Ok(ReporterType::Table) => builtin.push(Box::new(TableReporter::new())),
                    Ok(ReporterType::Null) => builtin.push(Box::new(NullReporter)),
                    Err(_) => third_party.push(name.as_str()),
                }
            }
            if let Some(unknown) = third_party
                .iter()
                .find(|name| !self.third_party_reporters.contains_key(**name))
            {
                eyre::bail!("Unknown reporter: {unknown}");
            }
            let mut reporters: Vec<&mut BoxedReporter> = builtin.iter_mut().collect();
            for (name, reporter) in self.third_party_reporters.iter_mut() {
                if third_party.contains(&name.as_str()) {
                    reporters.push(reporter);
                }
            }

            let reporting = futures::future::join_all(
                reporters
                    .into_iter()
                    .map(|reporter| {
                        let rx = runner.subscribe();
                        reporter.run(rx)
                    })
                    .collect::<Vec<_>>(),
            );

            let cancel = runner.cancel_handle();
            let ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted; waiting for in-flight scenarios");
                    cancel.cancel();
                }
            });

            let (report, reported) = tokio::join!(runner.run(&scenarios), reporting);
            ctrl_c.abort();

            for result in reported {
                if let Err(e) = result {
                    error!("reporter failed: {e:#}");
                }
            }
            let report = report?;

            let summary = format!(
                "{} passed, {} failed, {} errored",
                report.passed(),
                report.failed(),
                report.errored()
            );
            if report.all_passed() {
                term.write_line(&format!("{}", style(summary).green()))?;
            } else {
                has_any_failure = true;
                term.write_line(&format!("{}", style(summary).red()))?;
            }
            if let Some(dir) = &report_dir {
                term.write_line(&format!("report written to {}", dir.display()))?;
            }
        }

        if has_any_failure {
            eyre::bail!("one or more scenarios failed");
        }

        Ok(())
    }

    fn list(&self) -> eyre::Result<()> {
        let term = Term::stdout();
        for project in Self::projects(&[])? {
            term.write_line(&format!("* {}", project.name))?;
            let filter = IgnoreFilter::new(&project);
            for scenario in (self.suite)(&project)? {
                if !filter.filter(&scenario) {
                    continue;
                }
                term.write_line(&format!(
                    "  - {} ({} {})",
                    scenario.name, scenario.request.method, scenario.request.path
                ))?;
            }
        }
        Ok(())
    }
}

fn apply_color(color_command: Option<Color>) {
    let color_env = std::env::var("CARGO_TERM_COLOR");
    let color = match (color_command, color_env) {
        (color @ Some(Color::Always), _) => color,
        (color @ Some(Color::Never), _) => color,
        (None, Ok(color)) => Color::from_str(&color).ok(),
        _ => None,
    };
    match color {
        Some(Color::Always) => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        }
        Some(Color::Never) => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Default, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}
