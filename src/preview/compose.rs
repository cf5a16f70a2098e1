//! Self-contained preview document composition.
//!
//! Stylesheets and scripts from the store are inlined into the entry HTML,
//! binary references become data URLs and a small shim reports runtime
//! errors back to the host as [`super::PreviewMessage`] JSON.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::project::{FileStore, ProjectFile, DEFAULT_ENTRY_FILE};

pub const MISSING_ENTRY_DOCUMENT: &str =
    "<html><head></head><body><p>No index.html file found.</p></body></html>";

/// Forwards `error`, `unhandledrejection` and `load` to the host window.
pub const PREVIEW_SHIM: &str = r#"<script>
window.addEventListener('error', function(event) {
    event.preventDefault();
    window.parent.postMessage({ type: 'preview_error', error: {
        message: event.message,
        filename: event.filename,
        lineno: event.lineno,
        colno: event.colno
    } }, '*');
}, true);
window.addEventListener('unhandledrejection', function(event) {
    event.preventDefault();
    var reason = event.reason || {};
    window.parent.postMessage({ type: 'preview_error', error: {
        message: reason.message || 'Unhandled promise rejection',
        filename: '',
        lineno: 0,
        colno: 0
    } }, '*');
});
window.addEventListener('load', function() {
    window.parent.postMessage({ type: 'preview_loaded' }, '*');
});
</script>"#;

static HTML_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html").expect("valid html regex"));
// `<head` followed by whitespace or `>` so `<header>` is not mistaken for it
static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("valid head regex"));
static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("valid head regex"));
static BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body").expect("valid body regex"));
static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("valid body regex"));

/// Alternation matching a file by full path or bare name, optionally `./`-prefixed.
fn reference_pattern(file: &ProjectFile) -> String {
    let mut names = vec![regex::escape(&file.path)];
    if file.file_name() != file.path {
        names.push(regex::escape(file.file_name()));
    }
    format!(r"(?:\./)?(?:{})", names.join("|"))
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Skipping preview reference pattern: {}", e);
            None
        }
    }
}

/// Replace every match of `re`; returns whether anything matched.
fn replace_in_place(html: &mut String, re: &Regex, replacement: &str) -> bool {
    if !re.is_match(html) {
        return false;
    }
    *html = re.replace_all(html, NoExpand(replacement)).into_owned();
    true
}

fn inline_stylesheets(html: &mut String, store: &FileStore) -> String {
    let mut appended = String::new();
    for file in store.list().iter().filter(|f| f.extension() == "css") {
        let block = format!(
            r#"<style data-filename="{}">{}</style>"#,
            file.file_name(),
            file.content
        );
        let pattern = format!(
            r#"(?i)<link[^>]*href\s*=\s*['"]{}['"][^>]*>"#,
            reference_pattern(file)
        );
        let replaced = compile(&pattern).is_some_and(|re| replace_in_place(html, &re, &block));
        if !replaced {
            appended.push_str(&block);
        }
    }
    appended
}

fn inline_scripts(html: &mut String, store: &FileStore) -> String {
    let mut appended = String::new();
    for file in store.list().iter().filter(|f| f.extension() == "js") {
        let block = format!(
            r#"<script data-filename="{}">{}</script>"#,
            file.file_name(),
            file.content
        );
        let pattern = format!(
            r#"(?i)<script[^>]*src\s*=\s*['"]{}['"][^>]*>\s*</script>"#,
            reference_pattern(file)
        );
        let replaced = compile(&pattern).is_some_and(|re| replace_in_place(html, &re, &block));
        if !replaced {
            appended.push_str(&block);
        }
    }
    appended
}

fn rewrite_binary_sources(html: &mut String, store: &FileStore) {
    for file in store.list().iter().filter(|f| f.is_binary) {
        let Some(data_url) = file.binary_payload.as_deref() else {
            continue;
        };
        let pattern = format!(r#"(?i)src\s*=\s*['"`]{}['"`]"#, reference_pattern(file));
        if let Some(re) = compile(&pattern) {
            replace_in_place(html, &re, &format!(r#"src="{}""#, data_url));
        }
    }
}

fn insert_at(html: &mut String, at: usize, text: &str) {
    html.insert_str(at, text);
}

fn inject_shim(html: &mut String) {
    if let Some(head) = HEAD_OPEN.find(html) {
        insert_at(html, head.end(), PREVIEW_SHIM);
    } else if let Some(body) = BODY_OPEN.find(html) {
        insert_at(html, body.start(), &format!("<head>{}</head>", PREVIEW_SHIM));
    } else {
        insert_at(html, 0, PREVIEW_SHIM);
    }
}

fn append_to_head(html: &mut String, styles: &str) {
    if styles.is_empty() {
        return;
    }
    if let Some(close) = HEAD_CLOSE.find(html) {
        insert_at(html, close.start(), styles);
    } else if let Some(body) = BODY_OPEN.find(html) {
        insert_at(html, body.start(), styles);
    } else {
        insert_at(html, 0, styles);
    }
}

fn append_to_body(html: &mut String, scripts: &str) {
    if scripts.is_empty() {
        return;
    }
    match BODY_CLOSE.find_iter(html).last() {
        Some(close) => insert_at(html, close.start(), scripts),
        None => html.push_str(scripts),
    }
}

/// Build the preview document for the current store.
///
/// Never fails: a missing entry file yields a placeholder document.
pub fn compose_preview(store: &FileStore) -> String {
    let Some(entry) = store.get(DEFAULT_ENTRY_FILE) else {
        debug!("No {} in store, composing placeholder", DEFAULT_ENTRY_FILE);
        return MISSING_ENTRY_DOCUMENT.to_string();
    };

    let mut html = entry.content.clone();
    let styles = inline_stylesheets(&mut html, store);
    let scripts = inline_scripts(&mut html, store);
    rewrite_binary_sources(&mut html, store);

    if !HTML_OPEN.is_match(entry.content.trim()) {
        debug!("Entry file is a fragment, wrapping in a document");
        return format!(
            "<!DOCTYPE html>\n<html>\n<head>\n{}\n{}\n</head>\n<body>\n{}\n{}\n</body>\n</html>\n",
            PREVIEW_SHIM, styles, html, scripts
        );
    }

    inject_shim(&mut html);
    append_to_head(&mut html, &styles);
    append_to_body(&mut html, &scripts);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{to_data_url, FileMeta};

    fn store_with(files: &[(&str, &str)]) -> FileStore {
        let mut store = FileStore::new();
        for (path, content) in files {
            store.set(path, *content, FileMeta::text()).unwrap();
        }
        store
    }

    #[test]
    fn test_missing_entry_placeholder() {
        let store = store_with(&[("style.css", "a{}")]);
        assert_eq!(compose_preview(&store), MISSING_ENTRY_DOCUMENT);
    }

    #[test]
    fn test_initial_creation_fragment() {
        let store = store_with(&[("index.html", "<h1>Hi</h1>"), ("style.css", "body{color:red}")]);
        let doc = compose_preview(&store);

        assert_eq!(doc.matches("<style").count(), 1);
        assert!(doc.contains(r#"<style data-filename="style.css">body{color:red}</style>"#));
        assert_eq!(doc.matches("<html>").count(), 1);
        assert!(doc.contains("<h1>Hi</h1>"));
        assert!(doc.contains("preview_loaded"));
    }

    #[test]
    fn test_link_and_script_replaced_in_place() {
        let html = r#"<html><head><link rel="stylesheet" href="./style.css"></head><body><p>x</p><script src="app.js"></script></body></html>"#;
        let store = store_with(&[
            ("index.html", html),
            ("style.css", "p{}"),
            ("app.js", "go()"),
        ]);
        let doc = compose_preview(&store);

        assert!(!doc.contains("<link"));
        assert!(!doc.contains(r#"src="app.js""#));
        assert_eq!(doc.matches("p{}").count(), 1);
        assert_eq!(doc.matches("go()").count(), 1);
        let script = doc.find("go()").unwrap();
        assert!(script > doc.find("<p>x</p>").unwrap());
    }

    #[test]
    fn test_unreferenced_assets_appended() {
        let html = "<html><head><title>t</title></head><body><p>x</p></body></html>";
        let store = store_with(&[("index.html", html), ("extra.css", "b{}"), ("extra.js", "run()")]);
        let doc = compose_preview(&store);

        let style = doc.find("b{}").unwrap();
        assert!(style < doc.find("</head>").unwrap());
        let script = doc.find("run()").unwrap();
        assert!(script > doc.find("<p>x</p>").unwrap());
        assert!(script < doc.find("</body>").unwrap());
    }

    #[test]
    fn test_shim_injected_at_head_start() {
        let html = "<html><head><title>t</title></head><body></body></html>";
        let doc = compose_preview(&store_with(&[("index.html", html)]));
        let shim = doc.find(PREVIEW_SHIM).unwrap();
        assert!(shim < doc.find("<title>").unwrap());
    }

    #[test]
    fn test_shim_gets_head_when_missing() {
        let html = "<html><body><header>h</header></body></html>";
        let doc = compose_preview(&store_with(&[("index.html", html)]));
        let head = doc.find("<head>").unwrap();
        assert!(head < doc.find("<body>").unwrap());
        assert!(doc.contains("<header>h</header>"));
    }

    #[test]
    fn test_binary_src_rewritten() {
        let mut store = store_with(&[("index.html", r#"<img src='./img/logo.png'><img src="logo.png">"#)]);
        let url = to_data_url("image/png", &[1, 2]);
        store
            .insert_if_absent(ProjectFile::binary("img/logo.png", "image/png", url.clone()))
            .unwrap();

        let doc = compose_preview(&store);
        assert_eq!(doc.matches(&format!(r#"src="{}""#, url)).count(), 2);
    }

    #[test]
    fn test_replacement_content_is_literal() {
        let html = r#"<html><head><link href="s.css"></head><body></body></html>"#;
        let store = store_with(&[("index.html", html), ("s.css", "a::before{content:'$1'}")]);
        assert!(compose_preview(&store).contains("content:'$1'"));
    }
}
