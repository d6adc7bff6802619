use anchor_patch::{process, ChangeLine, Chunk, EngineConfig, PatchRequest};

const LINES: [&str; 5] = [
    "[server]",
    "host = \"localhost\"",
    "port = 8080",
    "",
    "[client]",
];

fn port_request() -> PatchRequest {
    PatchRequest::new(
        "config.ini",
        vec![Chunk::new(
            "@@ [server]",
            vec![
                ChangeLine::context("host = \"localhost\""),
                ChangeLine::remove("port = 8080"),
                ChangeLine::add("port = 9090"),
            ],
        )],
    )
}

fn assert_port_rewritten(content: &str) {
    let result = process(&port_request(), &EngineConfig::default(), content);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.applied_changes.len(), 1);
    assert_eq!(result.applied_changes[0].start, 1);
    assert_eq!(result.applied_changes[0].end, 3);
    assert_eq!(
        result.modified_content,
        "[server]\nhost = \"localhost\"\nport = 9090\n\n[client]"
    );
}

#[test]
fn test_unix_line_endings() {
    assert_port_rewritten(&LINES.join("\n"));
}

#[test]
fn test_windows_line_endings() {
    assert_port_rewritten(&LINES.join("\r\n"));
}

#[test]
fn test_classic_mac_line_endings() {
    assert_port_rewritten(&LINES.join("\r"));
}

#[test]
fn test_mixed_line_endings() {
    let content = "[server]\r\nhost = \"localhost\"\rport = 8080\n\r\n[client]";
    assert_port_rewritten(content);
}

#[test]
fn test_trailing_crlf_counts_as_one_terminator() {
    let content = format!("{}\r\n", LINES.join("\r\n"));
    assert_port_rewritten(&content);

    let config = EngineConfig {
        preserve_trailing_newline: true,
        ..EngineConfig::default()
    };
    let result = process(&port_request(), &config, &content);
    assert!(result.modified_content.ends_with("[client]\n"));
}
