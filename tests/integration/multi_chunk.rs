use anchor_patch::{process, ChangeLine, Chunk, EngineConfig, PatchRequest};

const TWO_FUNCTIONS: &str = "fn alpha() {
    one();
}

fn beta() {
    two();
}";

fn request(chunks: Vec<Chunk>) -> PatchRequest {
    PatchRequest::new("src/lib.rs", chunks)
}

fn rename_in_alpha() -> Chunk {
    Chunk::new(
        "@@ fn alpha",
        vec![
            ChangeLine::remove("    one();"),
            ChangeLine::add("    uno();"),
            ChangeLine::add("    dos();"),
        ],
    )
}

#[test]
fn test_disjoint_chunks_apply_in_order() {
    let beta = Chunk::new(
        "@@ fn beta",
        vec![
            ChangeLine::context("fn beta() {"),
            ChangeLine::remove("    two();"),
            ChangeLine::add("    deux();"),
        ],
    );

    let result = process(
        &request(vec![rename_in_alpha(), beta]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(
        result.modified_content,
        "fn alpha() {\n    uno();\n    dos();\n}\n\nfn beta() {\n    deux();\n}"
    );

    let spans: Vec<(usize, usize, isize)> = result
        .applied_changes
        .iter()
        .map(|c| (c.start, c.end, c.delta))
        .collect();
    // The second chunk is located in the buffer already grown by the first.
    assert_eq!(spans, vec![(1, 2, 1), (5, 7, 0)]);
}

#[test]
fn test_line_count_follows_total_delta() {
    let gamma = Chunk::new(
        "@@ fn beta",
        vec![
            ChangeLine::remove("    two();"),
            ChangeLine::remove("}"),
            ChangeLine::add("    two();"),
            ChangeLine::add("}"),
            ChangeLine::add(""),
            ChangeLine::add("fn gamma() {}"),
        ],
    );

    let result = process(
        &request(vec![rename_in_alpha(), gamma]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.total_delta(), 3);
    let before = TWO_FUNCTIONS.lines().count() as isize;
    let after = result.modified_content.lines().count() as isize;
    assert_eq!(after, before + result.total_delta());
}

#[test]
fn test_failing_chunk_discards_earlier_chunks() {
    let missing = Chunk::new(
        "@@ fn gamma",
        vec![ChangeLine::remove("    three();"), ChangeLine::add("    trois();")],
    );

    let result = process(
        &request(vec![rename_in_alpha(), missing]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );

    assert!(!result.success);
    assert_eq!(result.modified_content, TWO_FUNCTIONS);
    assert!(result.applied_changes.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("context not found: @@ fn gamma"));
}

#[test]
fn test_later_chunk_sees_earlier_rewrite() {
    let stale = Chunk::new(
        "@@ fn alpha",
        vec![ChangeLine::remove("    one();"), ChangeLine::add("    eins();")],
    );
    let result = process(
        &request(vec![rename_in_alpha(), stale]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );
    assert!(!result.success);
    assert!(result.errors[0].starts_with("context not found: @@ fn alpha: no lines matching"));
    assert_eq!(result.modified_content, TWO_FUNCTIONS);

    let follow_up = Chunk::new(
        "@@ fn alpha",
        vec![
            ChangeLine::context("    uno();"),
            ChangeLine::remove("    dos();"),
            ChangeLine::add("    tres();"),
        ],
    );
    let result = process(
        &request(vec![rename_in_alpha(), follow_up]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.modified_content.contains("    uno();\n    tres();\n}"));
}

#[test]
fn test_insertion_inside_earlier_chunk_is_ambiguous() {
    let expand = Chunk::new(
        "@@ fn alpha",
        vec![
            ChangeLine::remove("    one();"),
            ChangeLine::add("    a();"),
            ChangeLine::add("    b();"),
            ChangeLine::add("    c();"),
        ],
    );
    let insert = Chunk::new("@@ b();", vec![ChangeLine::add("    inserted();")]);

    let result = process(
        &request(vec![expand, insert]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );

    assert!(!result.success);
    assert!(result.errors[0].starts_with("ambiguous insertion for @@ b();"));
    assert_eq!(result.modified_content, TWO_FUNCTIONS);
}

#[test]
fn test_insertion_at_edge_of_earlier_chunk() {
    let insert = Chunk::new("@@ fn beta", vec![ChangeLine::add("// beta follows")]);

    let result = process(
        &request(vec![rename_in_alpha(), insert]),
        &EngineConfig::default(),
        TWO_FUNCTIONS,
    );

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result
        .modified_content
        .contains("}\n\n// beta follows\nfn beta() {"));
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("inserting before line 6"));
}

#[test]
fn test_duplicate_windows_take_the_first() {
    let content = "fn a() {\n    log();\n}\nfn b() {\n    log();\n}";
    let chunk = Chunk::new(
        "@@ fn",
        vec![ChangeLine::remove("    log();"), ChangeLine::add("    trace();")],
    );

    let result = process(&request(vec![chunk]), &EngineConfig::default(), content);

    assert!(result.success);
    assert_eq!(
        result.modified_content,
        "fn a() {\n    trace();\n}\nfn b() {\n    log();\n}"
    );
    assert!(result.warnings.iter().any(|w| w.contains("matches 2 lines")));
}

#[test]
fn test_empty_request_returns_content_verbatim() {
    let content = "line one\r\nline two\r\n";
    let result = process(&request(Vec::new()), &EngineConfig::default(), content);
    assert!(result.success);
    assert_eq!(result.modified_content, content);
    assert!(!result.is_changed());
}
