//! Operator banners printed when a frontend starts

use std::fmt::Write as _;

/// Endpoint listing and usage examples for the HTTP frontend
#[must_use]
pub fn format_http_info(target: &str, pid: u32, state: &str, url: &str) -> String {
    let mut s = header("HTTP SERVER ACTIVE", target, pid, state);
    let _ = writeln!(s, "URL: {url}\n");

    s.push_str("ENDPOINTS:\n");
    let _ = writeln!(s, "  POST {url}/exec     - Execute a raw debugger command");
    let _ = writeln!(s, "  POST {url}/ask      - Ask the assistant (natural language)");
    let _ = writeln!(s, "  GET  {url}/status   - Server status");
    let _ = writeln!(s, "  POST {url}/shutdown - Stop the server\n");

    s.push_str("CURL:\n");
    let _ = writeln!(
        s,
        "  curl -X POST {url}/exec -H \"Content-Type: application/json\" -d '{{\"command\": \"kb\"}}'"
    );
    let _ = writeln!(
        s,
        "  curl -X POST {url}/ask -H \"Content-Type: application/json\" -d '{{\"query\": \"why did this crash?\"}}'\n"
    );

    s.push_str("RESPONSES:\n");
    s.push_str("  /exec -> {\"output\": \"...\", \"success\": true}\n");
    s.push_str("  /ask  -> {\"response\": \"...\", \"success\": true}\n\n");

    s.push_str("CLI:\n");
    let _ = writeln!(s, "  dbg-agent --url={url} exec \"kb\"");
    let _ = writeln!(s, "  dbg-agent --url={url} ask \"why did this crash?\"");
    let _ = writeln!(s, "  dbg-agent --url={url} interactive");
    s
}

/// Endpoint, tool listing and client configuration for the MCP frontend
#[must_use]
pub fn format_mcp_info(target: &str, pid: u32, state: &str, url: &str) -> String {
    let endpoint = format!("{url}/mcp");
    let mut s = header("MCP SERVER ACTIVE", target, pid, state);
    let _ = writeln!(s, "MCP Endpoint: {endpoint}\n");

    s.push_str("TOOLS:\n");
    s.push_str("  dbg_exec  - Execute a debugger command\n");
    s.push_str("  dbg_ask   - Ask the AI assistant a question\n\n");

    s.push_str("CLIENT CONFIGURATION:\n");
    s.push_str("{\n  \"mcpServers\": {\n    \"dbg-agent\": {\n");
    let _ = writeln!(s, "      \"url\": \"{endpoint}\"");
    s.push_str("    }\n  }\n}\n\n");

    s.push_str("CONTROL:\n");
    let _ = writeln!(s, "  GET  {url}/status");
    let _ = writeln!(s, "  POST {url}/shutdown");
    s
}

fn header(title: &str, target: &str, pid: u32, state: &str) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{title}");
    let _ = writeln!(s, "Target: {target} (PID {pid})");
    let _ = writeln!(s, "State: {state}");
    s
}
