//! Black-box coverage of the FIM analyzer's precedence order: tool prefilter beats URL shape,
//! URL shape beats body markers (§4.G).

use codegate::fim::is_fim_request;

#[test]
fn precedence_order_tool_prefilter_wins_over_everything_else() {
    // Even a legacy-completions path with every marker present is never FIM for a known
    // never-FIM tool.
    assert!(!is_fim_request("/v1/completions", "kodu-extension/2.1", "<COMPLETION><QUERY></QUERY></COMPLETION>"));
}

#[test]
fn precedence_order_url_shape_wins_over_body_markers() {
    // chat/completions is never FIM no matter the body content or tool.
    assert!(!is_fim_request("/v1/chat/completions", "some-other-tool", "<COMPLETION></COMPLETION>"));
}

#[test]
fn fim_request_requires_both_route_and_marker() {
    assert!(is_fim_request("/v1/completions", "vscode-extension/1.0", "<COMPLETION>fn foo(</COMPLETION>"));
    assert!(!is_fim_request("/v1/completions", "vscode-extension/1.0", "no markers here"));
}
