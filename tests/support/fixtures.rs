//! Shared builders for integration tests.

use std::path::Path;

use doihive_core::fetch::{FetchSettings, FetchTask, TargetResolver};
use doihive_core::parser::Identifier;

/// Minimal body that passes `%PDF` validation.
pub const PDF_BODY: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n%%EOF\n";

/// Mirror page whose download button points at `href`.
pub fn download_page(href: &str) -> String {
    format!(
        r#"<html><body><div id="buttons"><div class="download"><a href="{href}" onclick="save()">save</a></div></div></body></html>"#
    )
}

/// Mirror page embedding the artifact in an `<object>` viewer.
pub fn object_page(data: &str) -> String {
    format!(r#"<html><body><object type="application/pdf" data="{data}"></object></body></html>"#)
}

/// Settings writing to `dir` with every sleep disabled.
pub fn fast_settings(dir: &Path) -> FetchSettings {
    FetchSettings::new(dir).without_delays()
}

/// Task for `doi` against the mirror at `base`.
pub fn task(base: &str, doi: &str) -> FetchTask {
    TargetResolver::new(base)
        .unwrap()
        .resolve(&Identifier::parse(doi).unwrap())
        .unwrap()
}

/// One Web of Science record with the given DOI (or none).
pub fn wos_record(title: &str, doi: Option<&str>) -> String {
    let mut record = format!("PT J\nAU Smith, J\nTI {title}\nSO Journal of Tests\nPY 2023\n");
    if let Some(doi) = doi {
        record.push_str(&format!("DI {doi}\n"));
    }
    record.push_str("ER\n\n");
    record
}

/// Writes an export file made of `records` under `dir`.
pub fn write_export(dir: &Path, name: &str, records: &[String]) {
    let mut body = String::from("FN Clarivate Analytics Web of Science\nVR 1.0\n");
    for record in records {
        body.push_str(record);
    }
    body.push_str("EF\n");
    std::fs::write(dir.join(name), body).unwrap();
}
