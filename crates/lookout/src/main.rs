//! The terminal front-end of the search assistant.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lookout::core::{AgentBuilder, ToolCallRequest};
use lookout::tools::{ArxivTool, WebSearchTool, WikipediaTool};
use lookout::{Config, Role, Submission, TranscriptSession, Turn};
use lookout_openai_model::OpenAIProvider;
use owo_colors::OwoColorize;
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const TITLE: &str = "Lookout Search Engine";
const BAR_CHAR: &str = "▎";

/// A tool call worth showing while the agent is busy.
#[derive(Debug)]
struct ToolActivity {
    tool: String,
    query: String,
}

impl From<&ToolCallRequest> for ToolActivity {
    fn from(req: &ToolCallRequest) -> Self {
        let query = serde_json::from_str::<Value>(&req.arguments)
            .ok()
            .and_then(|args| args.get("query")?.as_str().map(str::to_owned))
            .unwrap_or_else(|| req.arguments.clone());
        Self {
            tool: req.name.clone(),
            query,
        }
    }
}

impl ToolActivity {
    fn line(&self) -> String {
        format!("🔎 {}: {}", self.tool.bright_yellow(), self.query)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            warn!("failed to load .env: {err}");
        }
    }
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("starting with {config:?}");

    let (activity_tx, mut activity_rx) = mpsc::unbounded_channel();

    let lookup = config.lookup();
    let model_provider = OpenAIProvider::new(config.openai_config());
    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_system_prompt(include_str!("./system_prompt.md"))
        .with_tool(WikipediaTool::new(lookup.wikipedia.clone()))
        .with_tool(ArxivTool::new(lookup.arxiv.clone()))
        .with_tool(WebSearchTool::new(lookup.web_search.clone()))
        .with_max_iterations(config.max_iterations())
        .on_tool_call(move |req| {
            activity_tx.send(ToolActivity::from(req)).ok();
        })
        .build();

    let mut session = TranscriptSession::new(agent);
    session.initialize();

    println!("{}\n", TITLE.bold());
    for turn in session.render() {
        print_turn(turn, false);
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading input: {err}");
                break;
            }
        };
        let rendered = session.render().len();

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("Searching...");

        let outcome = {
            let mut submission = pin!(session.submit(line.trim()));
            loop {
                select! {
                    outcome = &mut submission => break outcome,
                    Some(activity) = activity_rx.recv() => {
                        progress_bar.println(activity.line());
                    }
                    _ = sleep(Duration::from_millis(100)) => {
                        progress_bar.inc(1);
                    }
                }
            }
        };
        // Calls announced right before the answer are still queued.
        for activity in take_queued(&mut activity_rx) {
            progress_bar.println(activity.line());
        }
        progress_bar.finish_and_clear();

        if outcome == Submission::Ignored {
            continue;
        }
        // The user's own line is already on screen.
        for turn in &session.render()[rendered..] {
            if turn.role() == Role::Assistant {
                print_turn(turn, outcome == Submission::Failed);
            }
        }
    }
}

fn take_queued(
    activity_rx: &mut mpsc::UnboundedReceiver<ToolActivity>,
) -> Vec<ToolActivity> {
    let mut queued = vec![];
    while let Ok(activity) = activity_rx.try_recv() {
        queued.push(activity);
    }
    queued
}

fn print_turn(turn: &Turn, failed: bool) {
    match turn.role() {
        Role::Assistant if failed => {
            println!("{}🤖 {}", BAR_CHAR.bright_red(), turn.content().red());
        }
        Role::Assistant => {
            println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                turn.content().bright_white()
            );
        }
        Role::User => println!("{}{}", BAR_CHAR.bright_green(), turn.content()),
    }
}
