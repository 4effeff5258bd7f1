use clap::{ArgAction, Parser, ValueEnum};
use parley_agent::{
    AgentError, ApprovalPolicy, ApprovalRequest, AutoApprovePolicy, DenyAllPolicy, EventEmitter,
    EventKind, RemoteServerDescriptor, ServerTransport, Session, SessionConfig, SessionEvent,
    ToolDescriptor, ToolKind, ToolRegistry,
};
use parley_llm::{ApprovalDecision, OpenAiResponsesRunner, ToolDefinition};
use parley_mcp::{ChinookServer, PriceServer, ToolServer, register_server_tools, weather_tool};
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Interactive tool-using chat over a Responses-style model API")]
struct Cli {
    #[arg(long, default_value = "gpt-5-mini")]
    model: String,
    #[arg(long, action = ArgAction::SetTrue)]
    stream: bool,
    /// Path to the Chinook SQLite database. Without it the database
    /// tools are not registered.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Remote MCP server the model reaches on its own.
    #[arg(long = "mcp-url")]
    mcp_url: Option<String>,
    #[arg(long = "mcp-label", default_value = "chinook_db_server")]
    mcp_label: String,
    #[arg(long, value_enum, default_value_t = ApprovalMode::Auto)]
    approval: ApprovalMode,
    #[arg(long = "max-approval-rounds", default_value_t = 1)]
    max_approval_rounds: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ApprovalMode {
    Auto,
    Console,
    Deny,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, String> {
    let runner = OpenAiResponsesRunner::from_env()
        .ok_or_else(|| "OPENAI_API_KEY is not set".to_string())?;

    let mut registry = ToolRegistry::default();
    registry
        .register(weather_tool())
        .map_err(|error| error.to_string())?;
    register_server_tools(&mut registry, Arc::new(PriceServer::new()))
        .map_err(|error| error.to_string())?;

    let chinook = match &cli.db {
        Some(path) => {
            let server = Arc::new(ChinookServer::open(path).map_err(|error| error.to_string())?);
            register_server_tools(&mut registry, server.clone())
                .map_err(|error| error.to_string())?;
            Some(server)
        }
        None => None,
    };

    if let Some(url) = &cli.mcp_url {
        registry
            .register(ToolDescriptor {
                definition: ToolDefinition {
                    name: cli.mcp_label.clone(),
                    description: "Remote MCP tool server".to_string(),
                    parameters: json!({}),
                },
                kind: ToolKind::Remote(RemoteServerDescriptor {
                    label: cli.mcp_label.clone(),
                    endpoint_url: url.clone(),
                    transport: ServerTransport::Http,
                }),
            })
            .map_err(|error| error.to_string())?;
    }

    let config = SessionConfig {
        model: cli.model.clone(),
        max_approval_rounds: cli.max_approval_rounds,
        ..SessionConfig::default()
    };
    let mut session = Session::new_with_emitter(
        Arc::new(runner),
        registry,
        config,
        build_policy(cli.approval),
        Arc::new(ConsoleEmitter {
            streaming: cli.stream,
        }),
    )
    .map_err(|error| error.to_string())?;

    println!("대화를 시작합니다. 종료하려면 'exit', 'quit' 또는 '종료'를 입력하세요.");

    let loop_result = chat_loop(cli.stream, &mut session).await;

    // Teardown runs whether the loop ended cleanly or not.
    let close_result = session.close().map_err(|error| error.to_string());
    let shutdown_result = match &chinook {
        Some(server) => server.shutdown().map_err(|error| error.to_string()),
        None => Ok(()),
    };
    loop_result?;
    close_result?;
    shutdown_result?;
    Ok(ExitCode::SUCCESS)
}

async fn chat_loop(stream: bool, session: &mut Session) -> Result<(), String> {
    loop {
        print!("\n사용자: ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(error) => return Err(error.to_string()),
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_keyword(input) {
            println!("안녕히 가세요!");
            return Ok(());
        }

        print!("\n어시스턴트: ");
        let _ = std::io::stdout().flush();

        let result = if stream {
            session.send_streamed(input).await
        } else {
            session.send(input).await
        };
        if let Err(error) = result {
            // Transient call failures end the turn, not the session.
            eprintln!("\n오류 발생: {error}");
        }
    }
}

fn build_policy(mode: ApprovalMode) -> Arc<dyn ApprovalPolicy> {
    match mode {
        ApprovalMode::Auto => Arc::new(AutoApprovePolicy),
        ApprovalMode::Console => Arc::new(ConsoleApprovalPolicy),
        ApprovalMode::Deny => Arc::new(DenyAllPolicy),
    }
}

/// Asks on stdin for each pending approval; unreadable input denies.
struct ConsoleApprovalPolicy;

impl ApprovalPolicy for ConsoleApprovalPolicy {
    fn decide(&self, requests: &[ApprovalRequest]) -> Vec<ApprovalDecision> {
        requests
            .iter()
            .map(|request| {
                print!(
                    "[승인 요청] {} / {} 실행을 승인하시겠습니까? (y/n): ",
                    request.server_label, request.tool_name
                );
                let _ = std::io::stdout().flush();
                let mut line = String::new();
                let approve = match std::io::stdin().read_line(&mut line) {
                    Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
                    Err(_) => false,
                };
                ApprovalDecision::new(request.id.clone(), approve)
            })
            .collect()
    }
}

/// Prints session events as they happen. In streaming mode assistant
/// text arrives through deltas, so the end-of-text event only closes
/// the line.
struct ConsoleEmitter {
    streaming: bool,
}

impl ConsoleEmitter {
    fn field<'a>(event: &'a SessionEvent, key: &str) -> &'a str {
        event
            .data
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl EventEmitter for ConsoleEmitter {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError> {
        match event.kind {
            EventKind::AssistantTextDelta => {
                print!("{}", Self::field(&event, "delta"));
                let _ = std::io::stdout().flush();
            }
            EventKind::AssistantTextEnd => {
                if self.streaming {
                    println!();
                } else {
                    println!("{}", Self::field(&event, "content"));
                }
            }
            EventKind::ApprovalRequested => {
                println!(
                    "[승인 요청] {} ({})",
                    Self::field(&event, "tool_name"),
                    Self::field(&event, "request_id")
                );
            }
            EventKind::ApprovalResolved => {
                let approved = event
                    .data
                    .get("approved")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                println!(
                    "[승인 {}] {}",
                    if approved { "허용" } else { "거부" },
                    Self::field(&event, "request_id")
                );
            }
            EventKind::ToolCallStart => {
                println!(
                    "[도구 실행] {} {}",
                    Self::field(&event, "tool_name"),
                    event.data.get("arguments").cloned().unwrap_or(Value::Null)
                );
            }
            EventKind::ToolCallEnd => {
                let is_error = event
                    .data
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if is_error {
                    println!("[도구 오류] {}", Self::field(&event, "output"));
                }
            }
            EventKind::Warning => println!("{}", Self::field(&event, "message")),
            EventKind::Error => eprintln!("오류: {}", Self::field(&event, "message")),
            _ => {}
        }
        Ok(())
    }
}

fn is_exit_keyword(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    lowered == "exit" || lowered == "quit" || lowered == "종료"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_approves_without_prompting() {
        let requests = [ApprovalRequest {
            id: "apr-1".to_string(),
            server_label: "chinook_db_server".to_string(),
            tool_name: "execute_sql_query".to_string(),
            arguments: json!({"query": "SELECT 1"}),
        }];

        let decisions = build_policy(ApprovalMode::Auto).decide(&requests);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].approve);

        let denied = build_policy(ApprovalMode::Deny).decide(&requests);
        assert!(!denied[0].approve);
    }

    #[test]
    fn exit_keywords_are_case_insensitive() {
        assert!(is_exit_keyword("exit"));
        assert!(is_exit_keyword(" QUIT "));
        assert!(is_exit_keyword("종료"));
        assert!(!is_exit_keyword("계속"));
    }
}
