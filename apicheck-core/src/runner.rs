/// apicheck's scenario runner
use chrono::{DateTime, Utc};
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tracing::*;

use crate::{
    aggregator::{Aggregator, RunReport},
    assertion::{Evaluation, FieldResult, ResponseContract},
    config::{ProjectConfig, DEFAULT_TIMEOUT},
    http::{self, Request, Transport, TransportError},
    masking, Error, ScenarioName,
};

/// A declared request together with the contract its response must satisfy.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: ScenarioName,
    pub request: Request,
    pub contract: ResponseContract,
}

impl Scenario {
    pub fn new(name: impl Into<String>, request: Request, contract: ResponseContract) -> Scenario {
        Scenario {
            name: name.into(),
            request,
            contract,
        }
    }

    /// Reject declarations that can never be dispatched.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |reason: String| Error::InvalidScenario {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("scenario name is empty".into()));
        }
        if self.request.path.trim().is_empty() {
            return Err(invalid("request path is empty".into()));
        }
        self.request
            .header_map()
            .map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

/// Lifecycle of a single scenario execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Pending,
    Dispatched,
    Evaluated,
    Errored,
    Recorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// A response arrived and the contract was evaluated against it.
    Evaluated(Evaluation),
    /// The exchange failed before a response was received.
    Errored { expected_status: u16, error: String },
}

/// Recorded outcome of one scenario execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    name: ScenarioName,
    method: String,
    path: String,
    started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    elapsed: Duration,
    outcome: Outcome,
}

impl ScenarioResult {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn expected_status(&self) -> u16 {
        match &self.outcome {
            Outcome::Evaluated(evaluation) => evaluation.expected_status,
            Outcome::Errored {
                expected_status, ..
            } => *expected_status,
        }
    }

    /// `None` when the scenario errored before receiving a response.
    pub fn actual_status(&self) -> Option<u16> {
        match &self.outcome {
            Outcome::Evaluated(evaluation) => Some(evaluation.actual_status),
            Outcome::Errored { .. } => None,
        }
    }

    pub fn status_matched(&self) -> bool {
        matches!(&self.outcome, Outcome::Evaluated(e) if e.status_matched)
    }

    pub fn field_results(&self) -> &[FieldResult] {
        match &self.outcome {
            Outcome::Evaluated(evaluation) => &evaluation.field_results,
            Outcome::Errored { .. } => &[],
        }
    }

    pub fn overall_passed(&self) -> bool {
        matches!(&self.outcome, Outcome::Evaluated(e) if e.passed())
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.outcome, Outcome::Errored { .. })
    }

    /// Transport diagnostic of an errored scenario.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Errored { error, .. } => Some(error),
            Outcome::Evaluated(_) => None,
        }
    }
}

/// Events published while a run progresses.
#[derive(Debug, Clone)]
pub enum Message {
    Start(ScenarioName),
    HttpLog(ScenarioName, Box<http::Log>),
    End(ScenarioName, Box<ScenarioResult>),
}

fn publish(tx: &broadcast::Sender<Message>, msg: Message) {
    // Sending only fails when nobody is subscribed.
    if tx.send(msg).is_err() {
        trace!("no subscriber for runner message");
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of scenarios in flight. `None` dispatches all at once.
    pub concurrency: Option<usize>,
    pub timeout: Duration,
    pub capture_http: bool,
    pub mask_sensitive: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            concurrency: None,
            timeout: DEFAULT_TIMEOUT,
            capture_http: false,
            mask_sensitive: true,
        }
    }
}

impl Options {
    pub fn from_project(project: &ProjectConfig) -> Options {
        Options {
            concurrency: project.concurrency,
            timeout: project.timeout(),
            ..Options::default()
        }
    }
}

/// Stops a run from dispatching further scenarios. Scenarios already in
/// flight still complete and are recorded.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scenario filter trait.
pub trait Filter {
    fn filter(&self, scenario: &Scenario) -> bool;
}

/// Filter scenarios by name. An empty list selects everything.
pub struct NameFilter<'a> {
    names: &'a [String],
}

impl<'a> NameFilter<'a> {
    pub fn new(names: &'a [String]) -> NameFilter<'a> {
        NameFilter { names }
    }
}

impl Filter for NameFilter<'_> {
    fn filter(&self, scenario: &Scenario) -> bool {
        self.names.is_empty() || self.names.iter().any(|name| name == &scenario.name)
    }
}

/// Skip scenarios listed in the project's `scenario_ignore`.
pub struct IgnoreFilter<'a> {
    ignores: &'a [String],
}

impl<'a> IgnoreFilter<'a> {
    pub fn new(project: &'a ProjectConfig) -> IgnoreFilter<'a> {
        IgnoreFilter {
            ignores: &project.scenario_ignore,
        }
    }
}

impl Filter for IgnoreFilter<'_> {
    fn filter(&self, scenario: &Scenario) -> bool {
        self.ignores.iter().all(|name| name != &scenario.name)
    }
}

/// Execute a single scenario: dispatch, then evaluate. Never fails; transport
/// problems become an errored result.
pub async fn run_scenario(
    scenario: &Scenario,
    transport: &dyn Transport,
    timeout: Duration,
) -> ScenarioResult {
    execute(scenario, transport, timeout, false).await.0
}

async fn execute(
    scenario: &Scenario,
    transport: &dyn Transport,
    timeout: Duration,
    mask_sensitive: bool,
) -> (ScenarioResult, http::Log) {
    let name = &scenario.name;
    let request = &scenario.request;
    debug!("{name}: {}", Phase::Dispatched);

    let started_at = Utc::now();
    let started = Instant::now();
    let res = match tokio::time::timeout(timeout, transport.send(request)).await {
        Ok(res) => res,
        Err(_) => Err(TransportError::Timeout(timeout)),
    };
    let elapsed = started.elapsed();

    let request_headers = request.header_map().unwrap_or_default();
    let mut log = http::Log {
        request: http::LogRequest {
            method: request.method.clone(),
            target: request.path.clone(),
            headers: request_headers,
        },
        response: None,
    };

    let outcome = match res {
        Ok(response) => {
            let evaluation = scenario
                .contract
                .check(response.status.as_u16(), &response.body);
            debug!(
                "{name}: {} (status {}, passed={})",
                Phase::Evaluated,
                response.status,
                evaluation.passed()
            );
            log.request.target = response.url;
            log.response = Some(http::LogResponse {
                status: response.status,
                headers: response.headers,
                body: response.text,
            });
            Outcome::Evaluated(evaluation)
        }
        Err(e) => {
            warn!("{name}: {}: {e}", Phase::Errored);
            Outcome::Errored {
                expected_status: scenario.contract.expected_status(),
                error: e.to_string(),
            }
        }
    };

    if mask_sensitive {
        log.request.target = masking::mask_target(&log.request.target);
        log.request.headers = masking::mask_headers(&log.request.headers);
    }

    let result = ScenarioResult {
        name: name.clone(),
        method: request.method.to_string(),
        path: request.path.clone(),
        started_at,
        elapsed,
        outcome,
    };
    (result, log)
}

/// What is known about a scenario before its task is spawned, so a panicking
/// task still yields an errored result in its slot.
struct Panicked {
    name: ScenarioName,
    method: String,
    path: String,
    expected_status: u16,
    started_at: DateTime<Utc>,
    started: Instant,
    tx: broadcast::Sender<Message>,
}

impl Panicked {
    fn of(scenario: &Scenario, tx: broadcast::Sender<Message>) -> Panicked {
        Panicked {
            name: scenario.name.clone(),
            method: scenario.request.method.to_string(),
            path: scenario.request.path.clone(),
            expected_status: scenario.contract.expected_status(),
            started_at: Utc::now(),
            started: Instant::now(),
            tx,
        }
    }

    fn into_result(self, e: tokio::task::JoinError) -> ScenarioResult {
        error!("{}: scenario panicked: {e}", self.name);
        let result = ScenarioResult {
            name: self.name,
            method: self.method,
            path: self.path,
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
            outcome: Outcome::Errored {
                expected_status: self.expected_status,
                error: format!("scenario panicked: {e}"),
            },
        };
        publish(
            &self.tx,
            Message::End(result.name.clone(), Box::new(result.clone())),
        );
        result
    }
}

/// Runs a list of scenarios against one transport and aggregates the results
/// into a [`RunReport`]. A runner performs exactly one run.
pub struct Runner {
    options: Options,
    transport: Arc<dyn Transport>,
    scenarios: Vec<Scenario>,
    ignores: Vec<String>,
    aggregator: Aggregator,
    cancel: CancelHandle,
    tx: broadcast::Sender<Message>,
}

impl Runner {
    pub fn new(transport: Arc<dyn Transport>, aggregator: Aggregator) -> Runner {
        Runner {
            options: Options::default(),
            transport,
            scenarios: Vec::new(),
            ignores: Vec::new(),
            aggregator,
            cancel: CancelHandle::default(),
            tx: broadcast::channel(1000).0,
        }
    }

    /// Runner configured from a project: timeout, concurrency and ignores.
    pub fn for_project(
        project: &ProjectConfig,
        transport: Arc<dyn Transport>,
        aggregator: Aggregator,
    ) -> Runner {
        let mut runner = Runner::new(transport, aggregator);
        runner.options = Options::from_project(project);
        runner.ignores = project.scenario_ignore.clone();
        runner
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn capture_http(&mut self) {
        self.options.capture_http = true;
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.options.concurrency = Some(concurrency);
    }

    pub fn add_scenario(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    pub fn add_scenarios(&mut self, scenarios: impl IntoIterator<Item = Scenario>) {
        self.scenarios.extend(scenarios);
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Subscribe to the run's events. Subscribe before calling [`Runner::run`].
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::InvalidScenario {
                    name: scenario.name.clone(),
                    reason: "duplicate scenario name".into(),
                });
            }
        }
        Ok(())
    }

    /// Run the scenarios selected by `names` (all when empty).
    ///
    /// Scenarios execute concurrently up to the configured limit, but results
    /// are recorded in declaration order. Failed or errored scenarios are
    /// part of the returned report; only harness misuse returns `Err`.
    pub async fn run(self, names: &[String]) -> eyre::Result<Arc<RunReport>> {
        self.validate()?;

        let Runner {
            options,
            transport,
            scenarios,
            ignores,
            aggregator,
            cancel,
            tx,
        } = self;

        let name_filter = NameFilter::new(names);
        let ignore_filter = IgnoreFilter { ignores: &ignores };
        let selected: Vec<_> = scenarios
            .into_iter()
            .filter(|scenario| name_filter.filter(scenario))
            .filter(|scenario| ignore_filter.filter(scenario))
            .collect();
        if let Some(unknown) = names
            .iter()
            .find(|name| !selected.iter().any(|s| &&s.name == name))
        {
            warn!("scenario \"{unknown}\" not found or ignored");
        }

        let concurrency = options.concurrency.unwrap_or(selected.len()).max(1);
        info!(
            "running {} scenario(s) with concurrency {concurrency}",
            selected.len()
        );

        aggregator.start();
        let mut completed = stream::iter(selected)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|scenario| {
                let transport = transport.clone();
                let options = options.clone();
                let tx = tx.clone();
                let panicked = Panicked::of(&scenario, tx.clone());
                let handle = tokio::spawn(async move {
                    publish(&tx, Message::Start(scenario.name.clone()));
                    let (result, log) = execute(
                        &scenario,
                        transport.as_ref(),
                        options.timeout,
                        options.mask_sensitive,
                    )
                    .await;
                    if options.capture_http {
                        publish(&tx, Message::HttpLog(scenario.name.clone(), Box::new(log)));
                    }
                    publish(
                        &tx,
                        Message::End(scenario.name.clone(), Box::new(result.clone())),
                    );
                    result
                });
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => panicked.into_result(e),
                    }
                }
            })
            .buffered(concurrency);

        while let Some(result) = completed.next().await {
            let name = result.name().to_string();
            aggregator.record(result)?;
            debug!("{name}: {}", Phase::Recorded);
        }
        drop(completed);
        // Closing the channel lets subscribers drain and stop.
        drop(tx);

        if cancel.is_cancelled() {
            warn!("run cancelled; remaining scenarios were not dispatched");
        }

        let report = aggregator.finalize()?;
        info!(
            "run finished: {} passed, {} failed, {} errored",
            report.passed(),
            report.failed(),
            report.errored()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{http::Client, matcher::Matcher, Aggregator};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport answering from a fixed table, optionally after a delay.
    struct StubTransport {
        routes: Vec<(String, u16, serde_json::Value, Duration)>,
        sent: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn new() -> StubTransport {
            StubTransport {
                routes: Vec::new(),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn route(mut self, path: &str, status: u16, body: serde_json::Value) -> StubTransport {
            self.routes
                .push((path.into(), status, body, Duration::ZERO));
            self
        }

        fn slow_route(
            mut self,
            path: &str,
            status: u16,
            body: serde_json::Value,
            delay: Duration,
        ) -> StubTransport {
            self.routes.push((path.into(), status, body, delay));
            self
        }
    }

    #[async_trait::async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: &Request) -> Result<http::Response, TransportError> {
            self.sent.lock().unwrap().push(request.path.clone());
            let Some((_, status, body, delay)) =
                self.routes.iter().find(|(path, ..)| path == &request.path)
            else {
                return Err(TransportError::Connect("connection refused".into()));
            };
            tokio::time::sleep(*delay).await;
            Ok(http::Response {
                url: format!("http://stub{}", request.path),
                status: http::StatusCode::from_u16(*status).unwrap(),
                headers: Default::default(),
                body: body.clone(),
                text: body.to_string(),
            })
        }
    }

    fn scenario(name: &str, path: &str, contract: ResponseContract) -> Scenario {
        Scenario::new(name, Request::get(path), contract)
    }

    #[tokio::test]
    async fn run_scenario_passes() -> eyre::Result<()> {
        let transport = StubTransport::new().route("/test", 200, json!({"status": "ok", "method": "GET"}));
        let contract = ResponseContract::new(200)?
            .expect("status", Matcher::equals("ok"))?
            .expect("method", Matcher::equals("GET"))?;

        let result = run_scenario(
            &scenario("get_status", "/test", contract),
            &transport,
            Duration::from_secs(1),
        )
        .await;

        assert!(result.overall_passed());
        assert!(result.status_matched());
        assert_eq!(result.actual_status(), Some(200));
        assert_eq!(result.field_results().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn run_scenario_times_out() -> eyre::Result<()> {
        let transport = StubTransport::new().slow_route(
            "/slow",
            200,
            json!({}),
            Duration::from_secs(5),
        );

        let result = run_scenario(
            &scenario("slow", "/slow", ResponseContract::new(200)?),
            &transport,
            Duration::from_millis(50),
        )
        .await;

        assert!(result.is_errored());
        assert!(!result.overall_passed());
        assert!(result.error().unwrap().contains("timed out"));
        assert_eq!(result.actual_status(), None);
        assert!(result.field_results().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn run_continues_after_errored_scenario() -> eyre::Result<()> {
        let transport = StubTransport::new()
            .slow_route("/slow", 200, json!({}), Duration::from_secs(5))
            .route("/users", 200, json!({"users": [{"id": 1}]}));
        let mut runner = Runner::new(Arc::new(transport), Aggregator::new("test"));
        runner.options_mut().timeout = Duration::from_millis(50);
        runner.add_scenario(scenario("slow", "/slow", ResponseContract::new(200)?));
        runner.add_scenario(scenario(
            "users",
            "/users",
            ResponseContract::new(200)?.expect("users", Matcher::NotEmpty)?,
        ));

        let report = runner.run(&[]).await?;

        assert_eq!(report.scenario_results.len(), 2);
        assert!(report.scenario_results[0].is_errored());
        assert!(report.scenario_results[1].overall_passed());
        assert!(!report.all_passed());
        Ok(())
    }

    #[tokio::test]
    async fn results_follow_declaration_order() -> eyre::Result<()> {
        let transport = StubTransport::new()
            .slow_route("/a", 200, json!({}), Duration::from_millis(200))
            .slow_route("/b", 200, json!({}), Duration::from_millis(100))
            .route("/c", 200, json!({}));
        let mut runner = Runner::new(Arc::new(transport), Aggregator::new("test"));
        for name in ["a", "b", "c"] {
            runner.add_scenario(scenario(name, &format!("/{name}"), ResponseContract::new(200)?));
        }

        let report = runner.run(&[]).await?;

        let names: Vec<_> = report.scenario_results.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        Ok(())
    }

    #[tokio::test]
    async fn filters_by_name_and_ignore_list() -> eyre::Result<()> {
        let transport = StubTransport::new()
            .route("/a", 200, json!({}))
            .route("/b", 200, json!({}))
            .route("/c", 200, json!({}));
        let project = ProjectConfig {
            name: "default".into(),
            scenario_ignore: vec!["b".into()],
            ..Default::default()
        };
        let mut runner = Runner::for_project(&project, Arc::new(transport), Aggregator::new("test"));
        for name in ["a", "b", "c"] {
            runner.add_scenario(scenario(name, &format!("/{name}"), ResponseContract::new(200)?));
        }

        let report = runner.run(&["a".to_string(), "b".to_string()]).await?;

        let names: Vec<_> = report.scenario_results.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a"]);
        Ok(())
    }

    #[tokio::test]
    async fn cancel_stops_new_dispatches() -> eyre::Result<()> {
        let transport = Arc::new(
            StubTransport::new()
                .slow_route("/a", 200, json!({}), Duration::from_millis(100))
                .route("/b", 200, json!({})),
        );
        let mut runner = Runner::new(transport.clone(), Aggregator::new("test"));
        runner.set_concurrency(1);
        runner.add_scenario(scenario("a", "/a", ResponseContract::new(200)?));
        runner.add_scenario(scenario("b", "/b", ResponseContract::new(200)?));
        let cancel = runner.cancel_handle();
        let mut rx = runner.subscribe();

        let canceller = tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                if matches!(msg, Message::Start(ref name) if name == "a") {
                    cancel.cancel();
                }
            }
        });
        let report = runner.run(&[]).await?;
        canceller.await?;

        assert_eq!(report.scenario_results.len(), 1);
        assert_eq!(report.scenario_results[0].name(), "a");
        assert!(report.scenario_results[0].overall_passed());
        assert_eq!(*transport.sent.lock().unwrap(), vec!["/a".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() -> eyre::Result<()> {
        let transport = StubTransport::new().route("/a", 200, json!({}));
        let mut runner = Runner::new(Arc::new(transport), Aggregator::new("test"));
        runner.add_scenario(scenario("a", "/a", ResponseContract::new(200)?));
        runner.add_scenario(scenario("a", "/a", ResponseContract::new(200)?));

        let err = runner.run(&[]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidScenario { name, reason })
                if name == "a" && reason == "duplicate scenario name"
        ));
        Ok(())
    }

    struct PanickingTransport;

    #[async_trait::async_trait]
    impl Transport for PanickingTransport {
        async fn send(&self, request: &Request) -> Result<http::Response, TransportError> {
            if request.path == "/boom" {
                panic!("transport blew up");
            }
            Ok(http::Response {
                url: format!("http://stub{}", request.path),
                status: http::StatusCode::OK,
                headers: Default::default(),
                body: json!({"status": "ok"}),
                text: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn panicking_scenario_is_recorded_as_errored() -> eyre::Result<()> {
        let mut runner = Runner::new(Arc::new(PanickingTransport), Aggregator::new("test"));
        runner.add_scenario(scenario("boom", "/boom", ResponseContract::new(200)?));
        runner.add_scenario(scenario(
            "ok",
            "/ok",
            ResponseContract::new(200)?.expect("status", Matcher::equals("ok"))?,
        ));
        let mut rx = runner.subscribe();

        let report = runner.run(&[]).await?;

        assert_eq!(report.scenario_results.len(), 2);
        let boom = &report.scenario_results[0];
        assert_eq!(boom.name(), "boom");
        assert!(boom.is_errored());
        assert_eq!(boom.expected_status(), 200);
        assert!(boom.error().unwrap().starts_with("scenario panicked"));
        assert!(report.scenario_results[1].overall_passed());

        let mut ended = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::End(name, _) = msg {
                ended.push(name);
            }
        }
        ended.sort();
        assert_eq!(ended, vec!["boom", "ok"]);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_header_is_rejected_before_dispatch() -> eyre::Result<()> {
        let transport = Arc::new(StubTransport::new().route("/a", 200, json!({})));
        let mut runner = Runner::new(transport.clone(), Aggregator::new("test"));
        runner.add_scenario(Scenario::new(
            "a",
            Request::get("/a").header("bad header", "x"),
            ResponseContract::new(200)?,
        ));

        assert!(runner.run(&[]).await.is_err());
        assert!(transport.sent.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn captured_logs_are_masked() -> eyre::Result<()> {
        let transport = StubTransport::new().route("/auth/products", 401, json!({"message": "Invalid/Expired Token!"}));
        let mut runner = Runner::new(Arc::new(transport), Aggregator::new("test"));
        runner.capture_http();
        runner.add_scenario(Scenario::new(
            "invalid_token",
            Request::get("/auth/products").bearer("INVALID_TOKEN"),
            ResponseContract::new(401)?.expect("message", Matcher::equals("Invalid/Expired Token!"))?,
        ));
        let mut rx = runner.subscribe();

        let report = runner.run(&[]).await?;
        assert!(report.all_passed());

        let mut logs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::HttpLog(_, log) = msg {
                logs.push(log);
            }
        }
        assert_eq!(logs.len(), 1);
        assert_eq!(
            logs[0].request.headers.get("authorization").unwrap(),
            masking::MASK
        );
        assert_eq!(logs[0].response.as_ref().unwrap().status, 401);
        Ok(())
    }

    #[tokio::test]
    async fn runs_against_http_server() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let m1 = server
            .mock("GET", "/products/0")
            .with_status(404)
            .with_body(r#"{"message": "Product with id '0' not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let transport = Arc::new(Client::with_base_url(server.url())?);
        let mut runner = Runner::new(transport, Aggregator::new("test"));
        runner.add_scenario(scenario(
            "product_by_invalid_id",
            "/products/0",
            ResponseContract::new(404)?
                .expect("message", Matcher::equals("Product with id '0' not found"))?,
        ));

        let report = runner.run(&[]).await?;
        m1.assert_async().await;

        assert!(report.all_passed());
        Ok(())
    }
}
