/*
 * render_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end rendering of .docx containers built in memory.
 */

use std::fs;
use std::path::Path;

use docx_template::{
    Compression, DataAccessError, Package, PackageError, Record, RenderOptions, Template,
    TemplateError, render_file,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:styleId="Normal"/></w:styles>"#;

fn document(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
            r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        body
    )
}

fn header(body: &str) -> String {
    format!(
        r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:hdr>"#,
        body
    )
}

fn para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn runs(texts: &[&str]) -> String {
    let inner: String = texts
        .iter()
        .map(|t| format!(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#, t))
        .collect();
    format!("<w:p>{}</w:p>", inner)
}

fn row(text: &str) -> String {
    format!("<w:tr><w:tc>{}</w:tc></w:tr>", para(text))
}

fn package(body: &str, header_body: Option<&str>) -> Package {
    let mut parts = vec![
        ("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels".to_string(), PACKAGE_RELS.as_bytes().to_vec()),
        ("word/document.xml".to_string(), document(body).into_bytes()),
        ("word/_rels/document.xml.rels".to_string(), DOCUMENT_RELS.as_bytes().to_vec()),
        ("word/styles.xml".to_string(), STYLES.as_bytes().to_vec()),
    ];
    if let Some(header_body) = header_body {
        parts.push(("word/header1.xml".to_string(), header(header_body).into_bytes()));
    }
    Package::from_parts(parts)
}

/// Build a real zip and load it back, as a file on disk would be.
fn template(body: &str, header_body: Option<&str>) -> Template {
    let bytes = package(body, header_body)
        .to_bytes(Compression::Deflated)
        .unwrap();
    Template::from_bytes(&bytes).unwrap()
}

fn part_text(bytes: &[u8]) -> String {
    let tree = docx_xml::parse_bytes(bytes).unwrap();
    tree.text_content(tree.root())
}

fn part_xml(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn body_text(rendered: &docx_template::RenderedDocument) -> String {
    part_text(rendered.part("word/document.xml").unwrap())
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0, 0, 0, 0, 0]);
    bytes
}

fn data() -> Record {
    Record::from_json(json!({
        "Customer": {"Name": "Ada Lovelace", "VIP": true},
        "company": "Smith & Sons <Ltd>",
        "total": 1250.0,
        "items": [
            {"sku": "A-1", "qty": 2},
            {"sku": "B-2", "qty": 5}
        ]
    }))
}

#[test]
fn test_every_placeholder_is_replaced() {
    let body = [
        para("Dear {{customer.name}},"),
        runs(&["Your total is {{to", "tal}} from {{com", "pany}}."]),
    ]
    .concat();
    let rendered = template(&body, None)
        .render(&data(), &RenderOptions::default())
        .unwrap();

    let text = body_text(&rendered);
    assert!(!text.contains("{{"));
    assert_eq!(
        text,
        "Dear Ada Lovelace,Your total is 1250 from Smith &amp; Sons &lt;Ltd&gt;."
    );
}

#[test]
fn test_all_unresolved_placeholders_are_reported() {
    let body = format!(
        "{}{}<w:tbl>{}</w:tbl>",
        para("{{missing.one}} and {{customer.name}}"),
        para("{{missing_two}}"),
        row("{{items.nope}}")
    );
    let template = template(&body, Some(&para("{{missing_three}}")));

    let Err(TemplateError::Placeholders(errors)) = template.render(&data(), &RenderOptions::default()) else {
        panic!("expected aggregated placeholder errors");
    };

    let mut found: Vec<(String, String)> = errors
        .details
        .iter()
        .map(|d| (d.part.clone(), d.placeholder.clone()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("word/document.xml".to_string(), "{{items.nope}}".to_string()),
            ("word/document.xml".to_string(), "{{items.nope}}".to_string()),
            ("word/document.xml".to_string(), "{{missing.one}}".to_string()),
            ("word/document.xml".to_string(), "{{missing_two}}".to_string()),
            ("word/header1.xml".to_string(), "{{missing_three}}".to_string()),
        ]
    );
    assert!(errors.details.iter().any(|d| d.reason
        == DataAccessError::PathNotFound {
            path: "missing_two".to_string()
        }));
}

#[test]
fn test_conditional_sections() {
    let body = [
        para("A {{if:customer.vip}}B{{endif}} C"),
        para("{{IF:company_missing_flag}}"),
        para("hidden"),
        para("{{Else}}"),
        para("shown"),
        para("{{ENDIF}}"),
    ]
    .concat();
    let data = data().with_key("company_missing_flag", false);
    let rendered = template(&body, None)
        .render(&data, &RenderOptions::default())
        .unwrap();
    assert_eq!(body_text(&rendered), "A B Cshown");
}

#[test]
fn test_unmatched_conditional_is_fatal() {
    let body = para("{{if:customer.vip}} never closed");
    assert!(matches!(
        template(&body, None).render(&data(), &RenderOptions::default()),
        Err(TemplateError::UnmatchedIf { .. })
    ));
}

#[test]
fn test_table_rows_repeat_per_item() {
    let body = format!(
        "<w:tbl><w:tblPr/>{}{}{}</w:tbl>",
        row("SKU"),
        row("{{items.sku}} x {{items.qty}}"),
        row("Total {{total}}")
    );
    let rendered = template(&body, None)
        .render(&data(), &RenderOptions::default())
        .unwrap();

    let tree = docx_xml::parse_bytes(rendered.part("word/document.xml").unwrap()).unwrap();
    let rows: Vec<String> = tree
        .find_all(tree.root(), "w:tr")
        .into_iter()
        .map(|r| tree.text_content(r))
        .collect();
    assert_eq!(rows, vec!["SKU", "A-1 x 2", "B-2 x 5", "Total 1250"]);
}

#[test]
fn test_headers_are_rendered() {
    let rendered = template(&para("body"), Some(&para("Invoice for {{customer.name}}")))
        .render(&data(), &RenderOptions::default())
        .unwrap();
    assert_eq!(
        part_text(rendered.part("word/header1.xml").unwrap()),
        "Invoice for Ada Lovelace"
    );
}

#[test]
fn test_untouched_parts_are_byte_identical() {
    let rendered = template(&para("{{total}}"), None)
        .render(&data(), &RenderOptions::default())
        .unwrap();
    assert_eq!(rendered.part("word/styles.xml"), Some(STYLES.as_bytes()));
    assert_eq!(rendered.part("_rels/.rels"), Some(PACKAGE_RELS.as_bytes()));
    assert_eq!(
        rendered.part("word/_rels/document.xml.rels"),
        Some(DOCUMENT_RELS.as_bytes())
    );
}

#[test]
fn test_image_is_embedded_and_scaled() {
    let images = TempDir::new().unwrap();
    fs::write(images.path().join("logo.png"), png(800, 600)).unwrap();

    let drawing = concat!(
        "<w:p><w:r><w:drawing><wp:inline>",
        r#"<wp:extent cx="1905000" cy="1905000"/>"#,
        r#"<wp:docPr id="1" name="Picture 1" descr="{{image:logo}}"/>"#,
        "<a:graphic><a:graphicData><pic:pic><pic:blipFill>",
        r#"<a:blip r:embed="rId99"/>"#,
        "</pic:blipFill><pic:spPr><a:xfrm>",
        r#"<a:ext cx="1905000" cy="1905000"/>"#,
        "</a:xfrm></pic:spPr></pic:pic></a:graphicData></a:graphic>",
        "</wp:inline></w:drawing></w:r></w:p>"
    );
    let options = RenderOptions::default().with_image_root(images.path());
    let data = data().with_key("logo", "logo.png");
    let rendered = template(drawing, None).render(&data, &options).unwrap();

    let body = part_xml(rendered.part("word/document.xml").unwrap());
    assert!(body.contains(r#"<wp:extent cx="1905000" cy="1428750"/>"#));
    assert!(body.contains(r#"<a:ext cx="1905000" cy="1428750"/>"#));
    assert!(body.contains(r#"<a:blip r:embed="rId3"/>"#));

    assert_eq!(rendered.part("word/media/image1.png"), Some(&png(800, 600)[..]));

    let rels = part_xml(rendered.part("word/_rels/document.xml.rels").unwrap());
    assert!(rels.contains(r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>"#));

    let manifest = part_xml(rendered.part("[Content_Types].xml").unwrap());
    assert!(manifest.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
}

#[test]
fn test_missing_image_file_is_fatal() {
    let drawing = r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="10" cy="10"/><wp:docPr id="1" descr="{{image:logo}}"/></wp:inline></w:drawing></w:r></w:p>"#;
    let data = data().with_key("logo", "/definitely/not/here.png");
    assert!(matches!(
        template(drawing, None).render(&data, &RenderOptions::default()),
        Err(TemplateError::Image(docx_template::ImageError::FileMissing { .. }))
    ));
}

#[test]
fn test_render_file_writes_nothing_on_failure() {
    let dir = TempDir::new().unwrap();
    let template_path = dir.path().join("template.docx");
    package(&para("{{not_in_data}}"), None)
        .write_to(&template_path, Compression::Deflated)
        .unwrap();

    let output = dir.path().join("out.docx");
    let result = render_file(&template_path, &data(), &output, &RenderOptions::default());
    assert!(matches!(result, Err(TemplateError::Placeholders(_))));
    assert!(!output.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_render_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let template_path = dir.path().join("template.docx");
    package(&para("Hello {{customer.name}}"), None)
        .write_to(&template_path, Compression::Deflated)
        .unwrap();

    let output = dir.path().join("out.docx");
    render_file(&template_path, &data(), &output, &RenderOptions::default()).unwrap();

    let written = Package::open(&output).unwrap();
    assert_eq!(
        part_text(written.part("word/document.xml").unwrap()),
        "Hello Ada Lovelace"
    );
}

#[test]
fn test_render_batch_keeps_order() {
    let template = template(&para("{{customer.name}}"), None);
    let records: Vec<Record> = ["one", "two", "three"]
        .iter()
        .map(|name| Record::from_json(json!({"customer": {"name": name}})))
        .collect();

    let results = template.render_batch(&records, &RenderOptions::default());
    let names: Vec<String> = results
        .iter()
        .map(|r| body_text(r.as_ref().unwrap()))
        .collect();
    assert_eq!(names, vec!["one", "two", "three"]);

    // the template itself is unchanged by rendering
    let again = template.render(&data(), &RenderOptions::default()).unwrap();
    assert_eq!(body_text(&again), "Ada Lovelace");
}

#[test]
fn test_placeholder_listing() {
    let body = [
        runs(&["{{customer.", "name}} {{total}} {{customer.name}}"]),
        para("{{if:customer.vip}}a{{else}}b{{ENDIF}} {{company}}"),
    ]
    .concat();
    let template = template(&body, Some(&para("{{company}}")));
    let listing = template.placeholders();
    let names: Vec<(&str, Vec<&str>)> = listing
        .iter()
        .map(|(part, found)| {
            (
                part.as_str(),
                found.iter().map(|p| p.original.as_str()).collect(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            (
                "word/document.xml",
                vec!["{{customer.name}}", "{{total}}", "{{company}}"]
            ),
            ("word/header1.xml", vec!["{{company}}"]),
        ]
    );
}

#[test]
fn test_large_document_renders_every_paragraph() {
    let body: String = (0..10_000)
        .map(|i| para(&format!("{{{{customer.name}}}} #{}", i)))
        .collect();
    let rendered = template(&body, None)
        .render(&data(), &RenderOptions::default())
        .unwrap();

    let tree = docx_xml::parse_bytes(rendered.part("word/document.xml").unwrap()).unwrap();
    let paragraphs = tree.find_all(tree.root(), "w:p");
    assert_eq!(paragraphs.len(), 10_000);
    assert_eq!(tree.text_content(paragraphs[0]), "Ada Lovelace #0");
    assert_eq!(tree.text_content(paragraphs[9_999]), "Ada Lovelace #9999");
}

#[test]
fn test_missing_required_part() {
    let package = Package::from_parts([(
        "word/document.xml".to_string(),
        document(&para("x")).into_bytes(),
    )]);
    assert!(matches!(
        Template::load(package),
        Err(TemplateError::Package(PackageError::MissingPart(_)))
    ));
}

#[test]
fn test_open_missing_template() {
    assert!(matches!(
        Template::open(Path::new("/no/such/template.docx")),
        Err(TemplateError::Package(PackageError::Io { .. }))
    ));
}
