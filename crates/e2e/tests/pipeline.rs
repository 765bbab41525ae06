//! Plan -> execute -> report, end to end against the in-memory surface.

use std::sync::Arc;

use testpilot_e2e::executor::{Executor, ExecutorConfig, FailurePolicy};
use testpilot_e2e::mock::{MockSurface, SurfaceCall};
use testpilot_e2e::planner::{Planner, DEFAULT_LOGIN_URL};
use testpilot_e2e::report::{JsonReportSink, ReportConfig};
use testpilot_e2e::resolve::MapVariables;
use testpilot_e2e::{
    ActionKind, E2eError, Reporter, RunSummary, Scenario, ScenarioStatus, Step, StepStatus,
    SurfaceError, TestRunner,
};
use tempfile::TempDir;

fn executor(dir: &TempDir, tweak: impl FnOnce(&mut ExecutorConfig)) -> Executor {
    let mut config = ExecutorConfig {
        screenshot_dir: dir.path().join("screenshots"),
        ..Default::default()
    };
    tweak(&mut config);
    let vars = MapVariables::new()
        .with("TEST_USERNAME", "alice")
        .with("TEST_PASSWORD", "s3cret");
    Executor::with_variables(config, Arc::new(vars))
}

fn runner(dir: &TempDir, tweak: impl FnOnce(&mut ExecutorConfig)) -> TestRunner {
    TestRunner::with_parts(
        Planner::default(),
        executor(dir, tweak),
        Some(Arc::new(JsonReportSink::new(ReportConfig {
            output_dir: dir.path().join("reports"),
        }))),
    )
}

#[tokio::test]
async fn login_plan_runs_every_step_in_order() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, |_| {});
    let mut surface = MockSurface::new();

    let outcome = runner
        .run_instruction("测试登录流程", &mut surface)
        .await
        .unwrap();

    let ids: Vec<u32> = outcome.scenario.steps.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert!(outcome.scenario.steps.iter().all(|r| r.status == StepStatus::Passed));
    assert_eq!(outcome.scenario.status, ScenarioStatus::Passed);
    assert_eq!(outcome.summary.total, 1);
    assert_eq!(outcome.summary.passed, 1);

    assert_eq!(
        surface.calls()[0],
        SurfaceCall::Navigate {
            url: DEFAULT_LOGIN_URL.to_string()
        }
    );
    assert!(surface.calls().contains(&SurfaceCall::Fill {
        selector: "input[name='username'], #username, input[type='email']".to_string(),
        value: "alice".to_string(),
    }));
    assert!(surface.calls().contains(&SurfaceCall::Fill {
        selector: "input[name='password'], #password, input[type='password']".to_string(),
        value: "s3cret".to_string(),
    }));

    // the only screenshot is the plan's own
    assert_eq!(outcome.scenario.screenshots.len(), 1);
}

#[tokio::test]
async fn failed_step_does_not_stop_the_plan() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, |_| {});
    let mut surface = MockSurface::new().fail_on(
        "button[type='submit'], button:has-text('登录'), .login-btn",
        SurfaceError::Timeout("5000ms exceeded".into()),
    );

    let outcome = runner.run_instruction("login", &mut surface).await.unwrap();
    let steps = &outcome.scenario.steps;

    assert_eq!(steps.len(), 6);
    assert_eq!(steps[3].status, StepStatus::Failed);
    assert!(steps[3].message.starts_with("Timeout: click -> "));
    assert!(steps[3].screenshot.is_some(), "failure screenshot expected");
    assert_eq!(steps[4].status, StepStatus::Passed);
    assert_eq!(steps[5].status, StepStatus::Passed);

    assert_eq!(outcome.scenario.status, ScenarioStatus::Failed);
    assert_eq!(
        outcome.scenario.error_message.as_deref(),
        Some(steps[3].message.as_str())
    );
    assert_eq!(outcome.summary.failed, 1);
    // diagnostic + plan screenshot, in step order
    assert_eq!(outcome.scenario.screenshots.len(), 2);
}

#[tokio::test]
async fn stop_on_first_failure_skips_the_rest() {
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir, |c| {
        c.failure_policy = FailurePolicy::StopOnFirstFailure;
        c.screenshot_on_failure = false;
    });
    let mut surface = MockSurface::new().fail_on("#b", SurfaceError::Action("detached".into()));
    let steps = vec![
        Step::new(1, ActionKind::Click, "#a"),
        Step::new(2, ActionKind::Click, "#b"),
        Step::new(3, ActionKind::Click, "#c"),
        Step::new(4, ActionKind::Screenshot, "end"),
    ];

    let results = executor.execute_plan(&steps, &mut surface).await.unwrap();

    assert_eq!(results.len(), steps.len());
    let statuses: Vec<StepStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Passed,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Skipped
        ]
    );
    assert!(results[2].message.contains("step 2"));
    assert_eq!(surface.calls().len(), 2);
}

#[tokio::test]
async fn unknown_actions_are_skipped_whatever_their_payload() {
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir, |_| {});
    let mut surface = MockSurface::new();
    let steps = vec![
        Step::new(1, "hover", ""),
        Step::new(2, "drag", "#from").with_value("#to"),
        Step::new(3, "", "anything").with_value("{{TEST_USERNAME}}"),
    ];

    let results = executor.execute_plan(&steps, &mut surface).await.unwrap();

    assert!(results.iter().all(|r| r.status == StepStatus::Skipped));
    assert!(results.iter().all(|r| r.screenshot.is_none()));
    assert!(surface.calls().is_empty());
}

#[tokio::test]
async fn knowledge_base_plan_fails_upload_without_sample_file() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, |c| c.screenshot_on_failure = false);
    let mut surface = MockSurface::new();

    let plan = runner.plan("创建知识库并上传 PDF");
    assert_eq!(plan.steps.len(), 7);

    // sample.pdf is resolved against the working directory, where the test
    // harness never puts one.
    if std::path::Path::new("sample.pdf").exists() {
        return;
    }

    let outcome = runner.run_plan(&plan, &mut surface).await.unwrap();
    let upload = &outcome.scenario.steps[3];
    assert_eq!(upload.action, ActionKind::Upload);
    assert_eq!(upload.status, StepStatus::Failed);
    assert!(!surface
        .calls()
        .iter()
        .any(|c| matches!(c, SurfaceCall::SetInputFiles { .. })));
    assert_eq!(outcome.scenario.steps.len(), 7);
}

#[tokio::test]
async fn failure_screenshot_error_leaves_result_without_path() {
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir, |_| {});
    let mut surface = MockSurface::new()
        .fail_on("#gone", SurfaceError::Action("no such element".into()))
        .fail_screenshots();

    let results = executor
        .execute_plan(&[Step::new(1, ActionKind::Click, "#gone")], &mut surface)
        .await
        .unwrap();

    assert_eq!(results[0].status, StepStatus::Failed);
    assert!(results[0].screenshot.is_none());
}

#[tokio::test]
async fn bad_plan_is_fatal_and_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir, |_| {});
    let mut surface = MockSurface::new();
    let steps = vec![
        Step::new(1, ActionKind::Goto, "https://example.com"),
        Step::new(2, ActionKind::Click, "#a"),
        Step::new(2, ActionKind::Click, "#b"),
    ];

    let err = executor.execute_plan(&steps, &mut surface).await.unwrap_err();
    assert!(matches!(err, E2eError::InvalidPlan(_)));
    assert!(surface.calls().is_empty());
}

#[tokio::test]
async fn scenarios_share_one_surface_and_summarize() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, |c| c.screenshot_on_failure = false);
    let mut surface = MockSurface::new().fail_on("#broken", SurfaceError::Action("boom".into()));

    let scenarios = vec![
        Scenario::new(
            "homepage",
            "Home page renders",
            vec![
                Step::new(1, ActionKind::Goto, "https://example.com"),
                Step::new(2, ActionKind::WaitForSelector, "main"),
            ],
        ),
        Scenario::new(
            "navigation",
            "Menu entry opens",
            vec![Step::new(1, ActionKind::Click, "#broken")],
        ),
    ];

    let summary = runner.run_scenarios(&scenarios, &mut surface).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.scenarios[0].name, "homepage");
    assert_eq!(summary.scenarios[1].error_message.as_deref(), Some("Error: boom"));
    assert_eq!(surface.calls().len(), 3);

    let path = runner.write_report(&summary).unwrap().expect("sink configured");
    let written: RunSummary =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written.total, 2);
    assert_eq!(written.scenarios[1].status, ScenarioStatus::Failed);
}

#[tokio::test]
async fn summary_extension_equals_direct_summary() {
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, |c| c.screenshot_on_failure = false);
    let mut surface = MockSurface::new().fail_on("#x", SurfaceError::Action("x".into()));

    let mut scenarios = Vec::new();
    for instruction in ["login", "upload pdf", "home"] {
        scenarios.push(runner.run_instruction(instruction, &mut surface).await.unwrap().scenario);
    }
    let (head, tail) = scenarios.split_at(2);

    let extended = Reporter::build_summary(head.to_vec()).extend(tail.to_vec());
    let direct = Reporter::build_summary(scenarios.clone());

    assert_eq!(extended.total, direct.total);
    assert_eq!(extended.passed, direct.passed);
    assert_eq!(extended.failed, direct.failed);
    assert_eq!(extended.total, extended.passed + extended.failed);
    assert!((extended.duration - direct.duration).abs() < 1e-9);
}

#[tokio::test]
async fn runner_without_sink_writes_nothing() {
    let runner = TestRunner::default().without_reports();
    assert!(runner.write_report(&RunSummary::default()).unwrap().is_none());
}
