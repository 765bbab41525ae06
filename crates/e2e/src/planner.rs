//! Instruction to plan translation
//!
//! [`RuleBasedPlanner`] is a lookup table keyed by keyword category. Anything
//! smarter (e.g. a language model emitting the same [`Step`] schema) plugs in
//! through [`StepProducer`] without touching execution or reporting.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::step::{ActionKind, Plan, Step};

pub const DEFAULT_TARGET_URL: &str = "https://opencsg.com/agentichub";
pub const DEFAULT_LOGIN_URL: &str = "https://iam.opencsg.com/login";

const LOGIN_KEYWORDS: &[&str] = &["登录", "login"];
const KNOWLEDGE_BASE_KEYWORDS: &[&str] = &["知识库", "pdf", "上传"];

/// URLs baked into the planner's step templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Site under test, opened by the knowledge-base and fallback plans
    pub target_url: String,

    /// Login page opened by the login plan
    pub login_url: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

/// Anything that can turn an instruction into an ordered list of steps.
///
/// Implementations must be total: every instruction yields a step list, even
/// an empty-meaning one.
pub trait StepProducer: Send + Sync {
    fn produce_steps(&self, instruction: &str) -> Vec<Step>;
}

/// Keyword category an instruction falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTemplate {
    Login,
    KnowledgeBaseUpload,
    Homepage,
}

impl PlanTemplate {
    /// Classify an instruction. Categories are checked in priority order.
    pub fn classify(instruction: &str) -> Self {
        let normalized = instruction.to_lowercase();
        if LOGIN_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            PlanTemplate::Login
        } else if KNOWLEDGE_BASE_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            PlanTemplate::KnowledgeBaseUpload
        } else {
            PlanTemplate::Homepage
        }
    }
}

/// Deterministic keyword-table planner
#[derive(Debug, Clone, Default)]
pub struct RuleBasedPlanner {
    config: PlannerConfig,
}

impl RuleBasedPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn login_steps(&self) -> Vec<Step> {
        vec![
            Step::new(1, ActionKind::Goto, &self.config.login_url)
                .with_expect("Login page loaded")
                .with_note("Open the single sign-on login page"),
            Step::new(
                2,
                ActionKind::Fill,
                "input[name='username'], #username, input[type='email']",
            )
            .with_value("{{TEST_USERNAME}}")
            .with_expect("Username entered")
            .with_note("Uses TEST_USERNAME"),
            Step::new(
                3,
                ActionKind::Fill,
                "input[name='password'], #password, input[type='password']",
            )
            .with_value("{{TEST_PASSWORD}}")
            .with_expect("Password entered")
            .with_note("Uses TEST_PASSWORD"),
            Step::new(
                4,
                ActionKind::Click,
                "button[type='submit'], button:has-text('登录'), .login-btn",
            )
            .with_expect("Login form submitted")
            .with_note("Click the login button"),
            Step::new(5, ActionKind::WaitForText, "AgentHub")
                .with_expect("AgentHub is visible after login")
                .with_note("Verify redirect to AgentHub"),
            Step::new(6, ActionKind::Screenshot, "after_login")
                .with_expect("Login result captured")
                .with_note("Shown in the report"),
        ]
    }

    fn knowledge_base_steps(&self) -> Vec<Step> {
        vec![
            Step::new(1, ActionKind::Goto, &self.config.target_url)
                .with_expect("AgentHub home page loaded")
                .with_note("Open AgentHub"),
            Step::new(
                2,
                ActionKind::Click,
                "text=创建知识库, button:has-text('创建'), .create-btn",
            )
            .with_expect("Create knowledge base dialog opened")
            .with_note("Entry button label varies between releases"),
            Step::new(
                3,
                ActionKind::Fill,
                "input[name='name'], input[placeholder*='名称'], input[placeholder*='Name']",
            )
            .with_value("AutoKB Demo")
            .with_expect("Knowledge base name entered")
            .with_note("Sample name"),
            Step::new(4, ActionKind::Upload, "input[type='file']")
                .with_value("sample.pdf")
                .with_expect("PDF uploaded")
                .with_note("Requires sample.pdf in the working directory"),
            Step::new(
                5,
                ActionKind::Click,
                "button:has-text('保存'), button:has-text('创建'), .submit-btn",
            )
            .with_expect("Knowledge base submitted")
            .with_note("Wait for the state change afterwards"),
            Step::new(6, ActionKind::WaitForText, "AutoKB Demo")
                .with_expect("New knowledge base appears in the list")
                .with_note("Verify creation"),
            Step::new(7, ActionKind::Screenshot, "kb_created")
                .with_expect("Creation result captured")
                .with_note("Shown in the report"),
        ]
    }

    fn homepage_steps(&self) -> Vec<Step> {
        vec![
            Step::new(1, ActionKind::Goto, &self.config.target_url)
                .with_expect("Page loaded with core content visible")
                .with_note("Open the AgentHub home page"),
            Step::new(
                2,
                ActionKind::WaitForSelector,
                "main, [role='main'], .main-content, #main",
            )
            .with_expect("Main content area present")
            .with_note("Wait for the main content to render"),
            Step::new(3, ActionKind::Screenshot, "homepage_loaded")
                .with_expect("Home page captured")
                .with_note("Shown in the report"),
        ]
    }
}

impl StepProducer for RuleBasedPlanner {
    fn produce_steps(&self, instruction: &str) -> Vec<Step> {
        let template = PlanTemplate::classify(instruction);
        debug!(?template, "Selected plan template");
        match template {
            PlanTemplate::Login => self.login_steps(),
            PlanTemplate::KnowledgeBaseUpload => self.knowledge_base_steps(),
            PlanTemplate::Homepage => self.homepage_steps(),
        }
    }
}

/// Wraps a [`StepProducer`] and stamps its output into a [`Plan`]
#[derive(Clone)]
pub struct Planner {
    producer: Arc<dyn StepProducer>,
}

impl Planner {
    pub fn new(producer: Arc<dyn StepProducer>) -> Self {
        Self { producer }
    }

    pub fn rule_based(config: PlannerConfig) -> Self {
        Self::new(Arc::new(RuleBasedPlanner::new(config)))
    }

    pub fn create_plan(&self, instruction: &str) -> Plan {
        Plan::new(instruction, self.producer.produce_steps(instruction))
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::rule_based(PlannerConfig::default())
    }
}
