//! End-to-end rendering tests against real DOCX packages.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run};
use tempfile::TempDir;

use bindery_core::package::DocxPackage;
use bindery_renderer::{RenderContext, RenderError, TemplateRenderer};

/// Build a DOCX whose body is one paragraph per line of text.
fn template_docx(lines: &[&str]) -> Vec<u8> {
    let mut docx = Docx::new();
    for line in lines {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
    }
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("pack fixture docx");
    buf.into_inner()
}

fn context_from(json: &str) -> RenderContext {
    RenderContext::from_json(json).expect("fixture context")
}

#[test]
fn render_substitutes_placeholders() {
    let template = template_docx(&["Hello {{ name }}!", "Date: {{ date }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let ctx = context_from(r#"{"name": "Alice", "date": "2026-02-13"}"#);

    let rendered = renderer.render(&ctx).unwrap();
    let xml = DocxPackage::from_bytes(&rendered).unwrap().document_xml().to_string();
    assert!(xml.contains("Hello Alice!"), "substituted name missing: {xml}");
    assert!(xml.contains("Date: 2026-02-13"));
    assert!(!xml.contains("{{"), "unsubstituted markers left behind");
}

#[test]
fn rendering_twice_is_byte_identical() {
    let template = template_docx(&["Invoice {{ number }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let ctx = context_from(r#"{"number": "INV-001"}"#);

    let first = renderer.render(&ctx).unwrap();
    let second = renderer.render(&ctx).unwrap();
    assert_eq!(first, second);
}

#[test]
fn rendered_output_is_a_readable_docx() {
    let template = template_docx(&["Total: {{ total }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let rendered = renderer.render(&context_from(r#"{"total": "9.50"}"#)).unwrap();

    let doc = docx_rs::read_docx(&rendered).expect("rendered bytes must stay a valid docx");
    let text: String = doc
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            docx_rs::DocumentChild::Paragraph(p) => Some(p.raw_text()),
            _ => None,
        })
        .collect();
    assert!(text.contains("Total: 9.50"));
}

#[test]
fn open_renders_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("template.docx");
    std::fs::write(&path, template_docx(&["Hi {{ name }}"])).unwrap();

    let renderer = TemplateRenderer::open(&path).unwrap();
    let rendered = renderer.render(&context_from(r#"{"name": "Bob"}"#)).unwrap();
    let xml = DocxPackage::from_bytes(&rendered).unwrap().document_xml().to_string();
    assert!(xml.contains("Hi Bob"));
}

#[test]
fn substituted_values_are_xml_escaped() {
    let template = template_docx(&["Name: {{ name }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let rendered = renderer
        .render(&context_from(r#"{"name": "Smith & Sons <Ltd>"}"#))
        .unwrap();

    let xml = DocxPackage::from_bytes(&rendered).unwrap().document_xml().to_string();
    assert!(xml.contains("Smith &amp; Sons &lt;Ltd&gt;"), "raw XML specials leaked: {xml}");
    docx_rs::read_docx(&rendered).expect("escaped output must stay well-formed");
}

#[test]
fn loop_renders_each_sequence_item() {
    let template = template_docx(&[
        "Items:",
        "{% for item in items %}{{ item.desc }} = {{ item.amount }}; {% endfor %}",
    ]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let ctx = context_from(
        r#"{"items": [
            {"desc": "Consulting", "amount": "1000"},
            {"desc": "Development", "amount": "500"}
        ]}"#,
    );

    let rendered = renderer.render(&ctx).unwrap();
    let xml = DocxPackage::from_bytes(&rendered).unwrap().document_xml().to_string();
    assert!(xml.contains("Consulting = 1000"));
    assert!(xml.contains("Development = 500"));
}

#[test]
fn missing_variable_is_a_substitution_error() {
    let template = template_docx(&["Hello {{ name }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let err = renderer.render(&context_from("{}")).unwrap_err();
    assert!(matches!(err, RenderError::Substitution(_)), "got {err:?}");
}

#[test]
fn loop_over_scalar_is_a_substitution_error() {
    let template = template_docx(&["{% for item in items %}{{ item }}{% endfor %}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let err = renderer
        .render(&context_from(r#"{"items": "not a sequence"}"#))
        .unwrap_err();
    assert!(matches!(err, RenderError::Substitution(_)), "got {err:?}");
}

#[test]
fn unclosed_tag_is_a_template_syntax_error() {
    let template = template_docx(&["Hello {% if name %}there"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let err = renderer.render(&context_from(r#"{"name": "x"}"#)).unwrap_err();
    assert!(matches!(err, RenderError::TemplateSyntax(_)), "got {err:?}");
}

#[test]
fn validate_against_real_template() {
    let template = template_docx(&["{{ customer_name }}", "{{ invoice_number }} {{ date }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();

    let ok = renderer.validate(&[
        "customer_name".to_string(),
        "invoice_number".to_string(),
        "date".to_string(),
    ]);
    assert!(ok.is_valid);
    assert!(ok.missing_placeholders.is_empty());

    let bad = renderer.validate(&["customer_name".to_string(), "total_amount".to_string()]);
    assert!(!bad.is_valid);
    assert_eq!(bad.missing_placeholders, vec!["total_amount"]);
}

#[test]
fn empty_required_list_is_always_valid() {
    let template = template_docx(&["{{ anything }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();
    let report = renderer.validate(&[]);
    assert!(report.is_valid);
}

#[test]
fn loop_body_placeholders_count_as_present() {
    let template = template_docx(&["{% for item in items %}{{ item.desc }}{% endfor %}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();

    // `items` is the discoverable root; the loop body resolves through it.
    let report = renderer.validate(&["items".to_string()]);
    assert!(report.is_valid);

    let names: Vec<String> = renderer.placeholders().into_iter().collect();
    assert_eq!(names, vec!["items"]);
}

#[test]
fn validation_and_render_agree() {
    // If validate() passes for the names a context supplies, render succeeds.
    let template = template_docx(&["{{ name }} / {{ date }}"]);
    let renderer = TemplateRenderer::from_bytes(&template).unwrap();

    let report = renderer.validate(&["name".to_string(), "date".to_string()]);
    assert!(report.is_valid);

    renderer
        .render(&context_from(r#"{"name": "Ada", "date": "2026-01-01"}"#))
        .expect("render must succeed for validated names");
}
