//! Ask the course-planning assistant from the terminal.
//!
//! Queries come from the command line or, when none are given, from stdin one
//! per line. All queries of one invocation share a thread id.

mod config;
mod render;

use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use planner_stream::observability::init_observability;
use planner_stream::prelude::*;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "planner", about = "Ask the course-planning assistant")]
struct Args {
    /// Streaming endpoint of the planner backend.
    #[arg(long, env = "PLANNER_SERVER_URL")]
    server_url: String,
    #[arg(long, env = "PLANNER_COLLEGE")]
    college: String,
    #[arg(long, env = "PLANNER_DEPARTMENT")]
    department: String,
    /// Core course numbers, repeated or comma-separated.
    #[arg(long = "core-course", env = "PLANNER_CORE_COURSES", value_delimiter = ',', required = true)]
    core_courses: Vec<String>,
    #[arg(long, default_value_t = 8)]
    min_creds_per_sem: u32,
    #[arg(long, default_value_t = 12)]
    max_creds_per_sem: u32,
    /// Total credits required for the degree.
    #[arg(long, default_value_t = 32)]
    max_credits: u32,
    /// Number of alternative plans to build.
    #[arg(long, default_value_t = 1)]
    plans: u32,
    /// Continue an existing conversation.
    #[arg(long)]
    thread_id: Option<String>,
    /// Cap on each whole exchange, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print each final transcript as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Queries to send in order. Reads stdin when empty.
    queries: Vec<String>,
}

impl Args {
    fn planner_config(&self) -> PlannerConfig {
        let mut config = PlannerConfig::new(&self.college, &self.department)
            .credits_per_semester(self.min_creds_per_sem, self.max_creds_per_sem)
            .max_credits(self.max_credits)
            .max_number_of_plans(self.plans);
        for course in &self.core_courses {
            config = config.core_course(course.trim());
        }
        config
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.server_url);
        if let Some(secs) = self.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    init_observability();
    let args = Args::parse();

    let client = PlannerClient::new(args.client_config())?;
    let context = match &args.thread_id {
        Some(id) => SessionContext::with_thread_id(ThreadId::from_string(id)),
        None => SessionContext::new(),
    };
    let mut conversation = Conversation::new(client).with_context(context);
    conversation.set_planner_config(args.planner_config())?;

    if !args.queries.is_empty() {
        for query in &args.queries {
            ask(&mut conversation, query, args.json).await?;
        }
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            // Once a Ctrl-C handler is installed it replaces the default exit.
            let line = tokio::select! {
                line = lines.next_line() => line.context("failed to read stdin")?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            ask(&mut conversation, &line, args.json).await?;
        }
    }

    if let Some(thread_id) = conversation.context().thread_id() {
        info!(thread_id = %thread_id, "conversation finished");
    }
    Ok(())
}

async fn ask(conversation: &mut Conversation, query: &str, json: bool) -> anyhow::Result<()> {
    let before = conversation.state().transcript().len();
    let stream = conversation.submit(query)?;
    let abort = stream.abort_handle();

    let outcome = {
        let drive = conversation.drive(stream, |state| {
            if let Some(status) = state.current_status() {
                eprintln!("… {status}");
            }
        });
        tokio::pin!(drive);
        tokio::select! {
            outcome = &mut drive => outcome,
            _ = tokio::signal::ctrl_c() => {
                abort.abort();
                (&mut drive).await
            }
        }
    };

    match outcome {
        SessionOutcome::Completed(transcript) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&transcript)?);
            } else {
                for message in transcript.iter().skip(before) {
                    print!("{}", render::message(message));
                }
            }
        }
        SessionOutcome::Exhausted => eprintln!("backend closed the stream without a result"),
        SessionOutcome::Failed(failure) => eprintln!("request failed: {failure}"),
        SessionOutcome::Cancelled => eprintln!("cancelled"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_build_a_valid_planner_config() {
        let args = Args::parse_from([
            "planner",
            "--server-url",
            "http://localhost:8000/get_response",
            "--college",
            "Khoury",
            "--department",
            "CS",
            "--core-course",
            "CS5010, CS5800",
            "--plans",
            "2",
            "plan my degree",
        ]);
        let config = args.planner_config();
        assert_eq!(config.core_course_numbers, vec!["CS5010", "CS5800"]);
        assert_eq!(config.max_number_of_plans, 2);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(args.queries, vec!["plan my degree"]);
        assert_eq!(args.client_config().timeout, None);
    }
}
