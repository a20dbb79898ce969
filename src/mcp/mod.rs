use outreach_core::models::{normalize_email, FunnelFlag, Prospect};
use outreach_core::Database;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router,
    schemars::JsonSchema,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};

use crate::sequencer::{determine_next_step, NextAction, Sequencer, SequencerError};

#[derive(Clone)]
pub struct McpServer {
    db: Database,
    sequencer: Sequencer,
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetProspectRequest {
    #[schemars(description = "Email address of the prospect")]
    pub email: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendNextEmailRequest {
    #[schemars(description = "Email address of the prospect to advance")]
    pub email: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MarkFunnelFlagRequest {
    #[schemars(description = "Email address of the prospect")]
    pub email: String,
    #[schemars(description = "One of: replied, demo_booked, became_client")]
    pub flag: String,
    #[schemars(description = "true to set the flag, false to clear it")]
    #[serde(default = "default_true")]
    pub value: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ProspectContext {
    pub prospect: Prospect,
    pub next_action: NextAction,
}

fn to_mcp_error(err: SequencerError) -> McpError {
    match err {
        SequencerError::NotFound(_)
        | SequencerError::SequenceExhausted(_)
        | SequencerError::Conflict(_)
        | SequencerError::Store(outreach_core::Error::Validation(_)) => {
            McpError::invalid_params(err.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

impl McpServer {
    pub fn new(db: Database, sequencer: Sequencer) -> Self {
        Self {
            db,
            sequencer,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl McpServer {
    #[tool(description = "Look up a prospect by email, with the next step in their email sequence")]
    async fn get_prospect(
        &self,
        params: Parameters<GetProspectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let email = normalize_email(&params.0.email);
        let prospect = self
            .db
            .find_prospect(&email)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .ok_or_else(|| McpError::invalid_params(format!("Prospect {} not found", email), None))?;

        let next_action = determine_next_step(&prospect);
        json_result(&ProspectContext {
            prospect,
            next_action,
        })
    }

    #[tool(description = "Send the next email in the outreach sequence to one prospect")]
    async fn send_next_email(
        &self,
        params: Parameters<SendNextEmailRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .sequencer
            .send_next(&params.0.email)
            .await
            .map_err(to_mcp_error)?;
        json_result(&outcome)
    }

    #[tool(description = "Set or clear a funnel flag (replied, demo_booked, became_client) on a prospect")]
    async fn mark_funnel_flag(
        &self,
        params: Parameters<MarkFunnelFlagRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let flag = FunnelFlag::from_str(&req.flag).ok_or_else(|| {
            McpError::invalid_params(format!("Unknown flag '{}'", req.flag), None)
        })?;
        let prospect = self
            .sequencer
            .toggle_funnel_flag(&req.email, flag, req.value)
            .map_err(to_mcp_error)?;
        json_result(&prospect)
    }

    #[tool(description = "Funnel counts and conversion rates across all prospects")]
    async fn prospect_metrics(&self) -> Result<CallToolResult, McpError> {
        let metrics = self
            .db
            .funnel_metrics()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        json_result(&metrics)
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Outreach MCP server: inspect prospects, advance their email sequence and record funnel progress".into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(db: Database, sequencer: Sequencer) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(db, sequencer);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
