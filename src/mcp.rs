use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::PreviewCache;
use crate::config::Config;
use crate::error::PeekError;
use crate::format::{format_preview_text, join_parts};
use crate::ingest::{IngestRequest, build_preview_parts, handle_ingest, load_preview};
use crate::session::Session;
use crate::storage::{FileStorage, LocalFileStorage};
use crate::types::Attachment;

// Sent to the LLM via the MCP `instructions` field during initialization.
const SERVER_INSTRUCTIONS: &str = "\
csvpeek: CSV preview MCP server. Turns uploaded CSV files into bounded Markdown tables.\n\
\n\
csvpeek_preview: Pass a storage `key` (preferred) or an upload `url`. Returns a one-line summary \
(total rows including the header, column count) followed by a Markdown table of the first rows. \
Use `max_rows`/`max_cols` to widen or narrow the view. Quoted fields, embedded commas and newlines \
are handled; ragged rows are shown as-is.\n\
\n\
csvpeek_ingest: Same inputs, returns the structured JSON preview (header, rows, counts) for \
programmatic use.\n\
\n\
csvpeek_attachments: Pass chat attachments; every CSV-like one gets a preview. Attachments that \
aren't CSV, or fail to download, are skipped silently.\n\
\n\
IMPORTANT: The preview is truncated. Row counts in the summary line are exact; the table is not. \
Don't infer totals from the visible rows.";

/// Server state shared across requests.
pub struct Server {
    config: Config,
    storage: Box<dyn FileStorage>,
    cache: PreviewCache,
    session: Session,
}

impl Server {
    #[must_use]
    pub fn new(config: Config, storage: Box<dyn FileStorage>) -> Self {
        Self {
            config,
            storage,
            cache: PreviewCache::new(),
            session: Session::new(),
        }
    }

    /// Local-disk storage rooted at `config.storage_root`.
    #[must_use]
    pub fn local(config: Config) -> Self {
        let storage = LocalFileStorage::new(config.storage_root.clone());
        Self::new(config, Box::new(storage))
    }
}

/// MCP server over stdio.
pub fn run(config: Config) -> io::Result<()> {
    tracing::info!(root = %config.storage_root.display(), "mcp server starting");
    let server = Server::local(config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), stdout.lock(), &server)
}

/// One JSON-RPC message per line in, one response per line out.
pub fn serve(input: impl BufRead, mut output: impl Write, server: &Server) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable json-rpc message");
                write_error(&mut output, None, -32700, &format!("parse error: {e}"))?;
                continue;
            }
        };

        // Notifications have no id; silently drop them per JSON-RPC spec
        if req.id.is_none() {
            continue;
        }

        let response = handle_request(&req, server);
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(())
}

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

fn handle_request(req: &JsonRpcRequest, server: &Server) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: Some(serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "csvpeek",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": SERVER_INSTRUCTIONS
            })),
            error: None,
        },

        "tools/list" => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: Some(serde_json::json!({
                "tools": tool_definitions()
            })),
            error: None,
        },

        "tools/call" => handle_tool_call(req, server),

        "ping" => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: Some(serde_json::json!({})),
            error: None,
        },

        _ => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: None,
            error: Some(JsonRpcError {
                code: -32601,
                message: format!("method not found: {}", req.method),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Tool dispatch
// ---------------------------------------------------------------------------

/// Execute a tool by name with the given arguments. Returns formatted output or error string.
pub(crate) fn dispatch_tool(tool: &str, args: &Value, server: &Server) -> Result<String, String> {
    server.cache.prune(server.config.cache_ttl());
    match tool {
        "csvpeek_preview" => tool_preview(args, server),
        "csvpeek_ingest" => tool_ingest(args, server),
        "csvpeek_attachments" => tool_attachments(args, server),
        "csvpeek_session" => tool_session(args, &server.session),
        _ => Err(format!("unknown tool: {tool}")),
    }
}

fn tool_preview(args: &Value, server: &Server) -> Result<String, String> {
    let request = request_from_args(args);
    let budget = args.get("budget").and_then(serde_json::Value::as_u64);

    // Type check runs on every call; only download and render are cached.
    let key = request
        .checked_key()
        .map_err(|e| fail(&server.session, &e))?;
    let options = server
        .config
        .ingest_options(request.max_rows, request.max_cols);
    let render = || {
        load_preview(&key, server.storage.as_ref(), options)
            .map(|preview| format_preview_text(&key, &preview))
    };

    let result = match server.storage.modified(&key) {
        Some(mtime) => server
            .cache
            .get_or_try_compute(&key, options, mtime, render)
            .map(|text| text.to_string()),
        None => render(),
    };

    let text = result.map_err(|e| fail(&server.session, &e))?;
    server.session.record_preview(&key);
    Ok(apply_budget(text, budget))
}

fn tool_ingest(args: &Value, server: &Server) -> Result<String, String> {
    let request = request_from_args(args);
    let response = handle_ingest(&request, server.storage.as_ref(), &server.config)
        .map_err(|e| fail(&server.session, &e))?;
    server.session.record_preview(&response.key);
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

fn tool_attachments(args: &Value, server: &Server) -> Result<String, String> {
    let raw = args
        .get("attachments")
        .ok_or("missing required parameter: attachments")?;
    let attachments: Vec<Attachment> = serde_json::from_value(raw.clone())
        .map_err(|e| format!("attachments must be an array of attachment objects: {e}"))?;
    if attachments.len() > 20 {
        return Err(format!(
            "attachment previews limited to 20 per call (got {})",
            attachments.len()
        ));
    }
    let budget = args.get("budget").and_then(serde_json::Value::as_u64);

    server.session.record_attachments(attachments.len());
    let parts = build_preview_parts(&attachments, server.storage.as_ref());
    if parts.is_empty() {
        return Ok("No CSV attachments to preview.".to_string());
    }
    Ok(apply_budget(join_parts(&parts), budget))
}

fn tool_session(args: &Value, session: &Session) -> Result<String, String> {
    let action = args
        .get("action")
        .and_then(|v| v.as_str())
        .unwrap_or("summary");
    match action {
        "reset" => {
            session.reset();
            Ok("Session reset.".to_string())
        }
        _ => Ok(session.summary()),
    }
}

/// MCP arguments are snake_case; the HTTP-style request is camelCase.
fn request_from_args(args: &Value) -> IngestRequest {
    let string = |name: &str| args.get(name).and_then(|v| v.as_str()).map(String::from);
    let int = |name: &str| args.get(name).and_then(serde_json::Value::as_i64);
    IngestRequest {
        key: string("key"),
        url: string("url"),
        kind: string("type"),
        max_rows: int("max_rows"),
        max_cols: int("max_cols"),
    }
}

/// Record the failure and render it for the agent, with the fix when we know one.
fn fail(session: &Session, err: &PeekError) -> String {
    session.record_failure();
    tracing::debug!(error = %err, "tool call failed");
    match err.solution() {
        Some(solution) => format!("{err}\n{solution}"),
        None => err.to_string(),
    }
}

fn apply_budget(output: String, budget: Option<u64>) -> String {
    match budget {
        Some(b) => crate::budget::apply(&output, b),
        None => output,
    }
}

// ---------------------------------------------------------------------------
// MCP tool call handler
// ---------------------------------------------------------------------------

fn handle_tool_call(req: &JsonRpcRequest, server: &Server) -> JsonRpcResponse {
    let params = &req.params;
    let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let args = params.get("arguments").unwrap_or(&Value::Null);

    let result = dispatch_tool(tool_name, args, server);

    match result {
        Ok(output) => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: Some(serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": output
                }]
            })),
            error: None,
        },
        Err(e) => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id.clone(),
            result: Some(serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": e
                }],
                "isError": true
            })),
            error: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn source_properties() -> Value {
    serde_json::json!({
        "key": {
            "type": "string",
            "description": "Storage key of the uploaded file, e.g. 'uploads/sales.csv'. Preferred over url."
        },
        "url": {
            "type": "string",
            "description": "Upload URL. Converted to a storage key (path, percent-decoded)."
        },
        "type": {
            "type": "string",
            "enum": ["csv", "auto"],
            "default": "auto",
            "description": "csv: treat as CSV regardless of name. auto: infer from .csv extension or contentType=text/csv in the URL."
        },
        "max_rows": {
            "type": "number",
            "default": 50,
            "description": "Data rows to show (header excluded). Clamped to 1..200."
        },
        "max_cols": {
            "type": "number",
            "default": 12,
            "description": "Columns to show. Clamped to 1..40."
        },
        "budget": {
            "type": "number",
            "description": "Max tokens in response."
        }
    })
}

fn tool_definitions() -> Vec<Value> {
    vec![
        serde_json::json!({
            "name": "csvpeek_preview",
            "description": "Preview a CSV file as a Markdown table with exact row and column counts. Quoted fields and CRLF line endings are handled; output is bounded by max_rows/max_cols.",
            "inputSchema": {
                "type": "object",
                "properties": source_properties()
            }
        }),
        serde_json::json!({
            "name": "csvpeek_ingest",
            "description": "Structured CSV preview as JSON: header, rows, columns, totalRows, markdownTable and the ready-made summary text.",
            "inputSchema": {
                "type": "object",
                "properties": source_properties()
            }
        }),
        serde_json::json!({
            "name": "csvpeek_attachments",
            "description": "Preview every CSV-like chat attachment (by media type, .csv name, or contentType=text/csv URL hint). Non-CSV attachments and failed downloads are skipped.",
            "inputSchema": {
                "type": "object",
                "required": ["attachments"],
                "properties": {
                    "attachments": {
                        "type": "array",
                        "description": "Attachments as sent by the chat client (max 20).",
                        "items": {
                            "type": "object",
                            "required": ["type", "url"],
                            "properties": {
                                "type": { "type": "string", "description": "Only 'source-url' attachments are previewed." },
                                "url": { "type": "string" },
                                "mediaType": { "type": "string" },
                                "filename": { "type": "string" }
                            }
                        }
                    },
                    "budget": {
                        "type": "number",
                        "description": "Max tokens in response."
                    }
                }
            }
        }),
        serde_json::json!({
            "name": "csvpeek_session",
            "description": "Show preview activity for this server session, or reset it.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["summary", "reset"],
                        "default": "summary"
                    }
                }
            }
        }),
    ]
}

fn write_error(w: &mut impl Write, id: Option<Value>, code: i32, msg: &str) -> io::Result<()> {
    let resp = JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: msg.into(),
        }),
    };
    serde_json::to_writer(&mut *w, &resp)?;
    w.write_all(b"\n")?;
    w.flush()
}
