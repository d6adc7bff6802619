use anchor_patch::{
    process, ChangeLine, Chunk, EngineConfig, PatchRequest, RawChunk, RawPatchRequest,
};

const USER_SERVICE: &str = "<?php
class UserService
{
    private $db;

    public function __construct() {
        // ...
    }
}";

fn raw_request(marker: &str, changes: &[&str]) -> PatchRequest {
    let raw = RawPatchRequest {
        path: "src/UserService.php".to_string(),
        chunks: vec![RawChunk {
            context_marker: marker.to_string(),
            changes: changes.iter().map(|c| c.to_string()).collect(),
        }],
    };
    PatchRequest::try_from(raw).expect("valid request")
}

#[test]
fn test_typed_property_replaces_only_target_line() {
    let request = raw_request(
        "@@ class UserService",
        &[
            " {",
            "-    private $db;",
            "+    private DatabaseInterface $db;",
            " ",
        ],
    );

    let result = process(&request, &EngineConfig::default(), USER_SERVICE);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.applied_changes.len(), 1);
    assert_eq!(result.applied_changes[0].anchor, "@@ class UserService");
    assert_eq!(result.applied_changes[0].start, 2);
    assert_eq!(result.applied_changes[0].end, 5);
    assert_eq!(result.applied_changes[0].delta, 0);

    let expected = USER_SERVICE.replace(
        "    private $db;",
        "    private DatabaseInterface $db;",
    );
    assert_eq!(result.modified_content, expected);

    let before: Vec<&str> = USER_SERVICE.lines().collect();
    let after: Vec<&str> = result.modified_content.lines().collect();
    assert_eq!(before.len(), after.len());
    let differing: Vec<usize> = (0..before.len())
        .filter(|&i| before[i] != after[i])
        .collect();
    assert_eq!(differing, vec![3]);
}

#[test]
fn test_trailing_newline_dropped_by_default() {
    let request = raw_request(
        "@@ class UserService",
        &["-    private $db;", "+    private DatabaseInterface $db;"],
    );
    let content = format!("{USER_SERVICE}\n");

    let result = process(&request, &EngineConfig::default(), &content);
    assert!(result.success);
    assert!(!result.modified_content.ends_with('\n'));

    let config = EngineConfig {
        preserve_trailing_newline: true,
        ..EngineConfig::default()
    };
    let result = process(&request, &config, &content);
    assert!(result.modified_content.ends_with("}\n"));
}

#[test]
fn test_unknown_method_leaves_content_untouched() {
    let request = raw_request(
        "@@ nonExistentMethod",
        &["     public function nonExistentMethod() {", "+        return 1;"],
    );

    let result = process(&request, &EngineConfig::default(), USER_SERVICE);

    assert!(!result.success);
    assert!(!result.errors.is_empty());
    assert!(result.errors[0].starts_with("context not found: @@ nonExistentMethod"));
    assert_eq!(result.modified_content, result.original_content);
    assert_eq!(result.original_content, USER_SERVICE);
    assert!(result.applied_changes.is_empty());
}

#[test]
fn test_reindented_chunk_keeps_file_whitespace() {
    let content = "function total() {\n   let a = 1;\n   let b = 2;\n   return a + b;\n}";
    let request = PatchRequest::new(
        "total.js",
        vec![Chunk::new(
            "@@ function total",
            vec![
                ChangeLine::context("     let a = 1;"),
                ChangeLine::remove("     let b = 2;"),
                ChangeLine::add("     let b = 3;"),
                ChangeLine::context("     return a + b;"),
            ],
        )],
    );

    let result = process(&request, &EngineConfig::default(), content);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(
        result.modified_content,
        "function total() {\n   let a = 1;\n     let b = 3;\n   return a + b;\n}"
    );
}

#[test]
fn test_constructor_body_insertion() {
    let request = raw_request(
        "@@ public function __construct",
        &[
            "     public function __construct() {",
            "-        // ...",
            "+        $this->db = new Database();",
            "     }",
        ],
    );

    let result = process(&request, &EngineConfig::default(), USER_SERVICE);

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result
        .modified_content
        .contains("        $this->db = new Database();\n    }"));
    assert!(!result.modified_content.contains("// ..."));
    assert!(result.warnings.is_empty());
}

#[test]
fn test_anchor_without_decorator() {
    let request = raw_request("private $db", &["-    private $db;", "+    private ?Db $db;"]);
    let result = process(&request, &EngineConfig::default(), USER_SERVICE);
    assert!(result.success);
    assert!(result.modified_content.contains("    private ?Db $db;"));
}
