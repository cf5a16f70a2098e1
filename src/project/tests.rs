//! Tests for project module.

#[cfg(test)]
mod tests {
    use crate::project::{
        apply_code_blocks, decode_data_url, export_directory, file_from_bytes, import_directory,
        resolve_target_path, to_data_url, FileMeta, FileStore, ProjectFile, StoreError,
        DEFAULT_ENTRY_FILE,
    };
    use std::fs;
    use tempfile::TempDir;

    fn store_with(files: &[(&str, &str)]) -> FileStore {
        let mut store = FileStore::new();
        for (path, content) in files {
            store.set(path, *content, FileMeta::text()).unwrap();
        }
        store
    }

    #[test]
    fn test_store_set_get_delete_list() {
        let mut store = FileStore::new();
        assert!(store.set("index.html", "<p>", FileMeta::text()).unwrap());
        assert!(store.set("app.js", "1", FileMeta::text()).unwrap());
        assert!(!store.set("index.html", "<h1>", FileMeta::text()).unwrap());

        assert_eq!(store.get("index.html").unwrap().content, "<h1>");
        let paths: Vec<&str> = store.paths().collect();
        assert_eq!(paths, vec!["index.html", "app.js"]);

        assert!(store.delete("index.html").is_some());
        assert!(store.delete("index.html").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_rejects_empty_path() {
        let mut store = FileStore::new();
        assert_eq!(
            store.set("", "x", FileMeta::text()),
            Err(StoreError::EmptyPath)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_binary_meta() {
        let mut store = FileStore::new();
        store
            .set("logo.png", "[Binary file: image/png]", FileMeta::binary("data:image/png;base64,AA=="))
            .unwrap();
        let file = store.get("logo.png").unwrap();
        assert!(file.is_binary);
        assert_eq!(file.binary_payload.as_deref(), Some("data:image/png;base64,AA=="));
    }

    #[test]
    fn test_store_suggest_and_blank() {
        let store = store_with(&[("index.html", " "), ("src/App.js", "")]);
        assert!(store.all_blank());
        assert_eq!(store.suggest("app"), vec!["src/App.js"]);
        assert_eq!(store.suggest("").len(), 2);
    }

    #[test]
    fn test_resolve_target_path() {
        assert_eq!(resolve_target_path("index.html"), Some("index.html".to_string()));
        assert_eq!(resolve_target_path("src/components"), Some("src/components".to_string()));
        assert_eq!(
            resolve_target_path("js filepath=src/app.js"),
            Some("src/app.js".to_string())
        );
        assert_eq!(
            resolve_target_path("style.css (updated)"),
            Some("style.css".to_string())
        );
        assert_eq!(resolve_target_path("javascript"), None);
        assert_eq!(resolve_target_path(""), None);
    }

    #[test]
    fn test_initial_creation() {
        let mut store = FileStore::new();
        let mut open = None;
        let text = "```index.html\n<h1>Hi</h1>\n```\n\n```style.css\nbody{color:red}\n```";

        let outcome = apply_code_blocks(&mut store, &mut open, text);

        assert!(outcome.changed());
        assert_eq!(outcome.created, vec!["index.html", "style.css"]);
        assert_eq!(store.get("index.html").unwrap().content, "<h1>Hi</h1>");
        assert_eq!(store.get("style.css").unwrap().content, "body{color:red}");
    }

    #[test]
    fn test_update_replaces_whole_file() {
        let mut store = store_with(&[("a.js", "old\nlines")]);
        let mut open = None;
        let outcome = apply_code_blocks(&mut store, &mut open, "```a.js\n  new  \n```");
        assert_eq!(outcome.updated, vec!["a.js"]);
        assert_eq!(store.get("a.js").unwrap().content, "new");
    }

    #[test]
    fn test_bare_language_hint_skipped() {
        let mut store = FileStore::new();
        let mut open = None;
        let outcome = apply_code_blocks(&mut store, &mut open, "```javascript\nalert(1)\n```");
        assert!(!outcome.changed());
        assert_eq!(outcome.skipped, vec!["javascript"]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_unterminated_fence_not_applied() {
        let mut store = FileStore::new();
        let mut open = None;
        let outcome = apply_code_blocks(&mut store, &mut open, "```app.js\nconsole.log(1)");
        assert!(!outcome.changed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_existing_and_missing() {
        let mut store = store_with(&[("a.js", "1"), ("b.js", "2")]);
        let mut open = Some("b.js".to_string());

        let outcome = apply_code_blocks(&mut store, &mut open, "```a.js\nDELETE_FILE\n```");
        assert_eq!(outcome.deleted, vec!["a.js"]);
        assert!(!store.contains("a.js"));
        assert_eq!(open.as_deref(), Some("b.js"));

        let before = store.clone();
        let outcome = apply_code_blocks(&mut store, &mut open, "```a.js\nDELETE_FILE\n```");
        assert!(!outcome.changed());
        assert_eq!(outcome.missing_deletes, vec!["a.js"]);
        assert_eq!(store, before);
    }

    #[test]
    fn test_deleting_open_file_reopens_first_remaining() {
        let mut store = store_with(&[("index.html", "x"), ("a.js", "1"), ("b.js", "2")]);
        let mut open = Some("a.js".to_string());

        let outcome = apply_code_blocks(&mut store, &mut open, "```a.js\nDELETE_FILE\n```");
        assert_eq!(open.as_deref(), Some("index.html"));
        assert_eq!(outcome.reopened.as_deref(), Some("index.html"));
    }

    #[test]
    fn test_deleting_everything_leaves_default_entry() {
        let mut store = store_with(&[("index.html", "x")]);
        let mut open = Some("index.html".to_string());

        apply_code_blocks(&mut store, &mut open, "```index.html\nDELETE_FILE\n```");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(DEFAULT_ENTRY_FILE).unwrap().content, "");
        assert_eq!(open.as_deref(), Some(DEFAULT_ENTRY_FILE));
    }

    #[test]
    fn test_rename_is_create_plus_delete() {
        let mut store = store_with(&[("old.js", "let a = 1;")]);
        let mut open = Some("old.js".to_string());
        let text = "```new.js\nlet a = 1;\n```\n```old.js\nDELETE_FILE\n```";

        let outcome = apply_code_blocks(&mut store, &mut open, text);
        assert_eq!(outcome.created, vec!["new.js"]);
        assert_eq!(outcome.deleted, vec!["old.js"]);
        assert_eq!(open.as_deref(), Some("new.js"));
    }

    #[test]
    fn test_file_from_bytes_text_and_binary() {
        let text = file_from_bytes("notes.txt", b"hello");
        assert!(!text.is_binary);
        assert_eq!(text.content, "hello");

        let unknown = file_from_bytes("Makefile", b"all:");
        assert!(!unknown.is_binary);

        let font = file_from_bytes("fonts/brand.otf", &[79, 84, 84, 79, 0, 255, 254]);
        assert!(font.is_binary);
        assert_eq!(font.content, "[Binary file: application/octet-stream]");

        let latin1 = file_from_bytes("legacy.html", &[b'<', b'p', b'>', 0xe9]);
        assert!(latin1.is_binary);
        assert_eq!(
            latin1.binary_payload.as_deref(),
            Some(to_data_url("text/html", &[b'<', b'p', b'>', 0xe9]).as_str())
        );

        let png = file_from_bytes("img/logo.png", &[0x89, 0x50, 0x4e, 0x47]);
        assert!(png.is_binary);
        assert_eq!(png.content, "[Binary file: image/png]");
        assert_eq!(png.binary_payload.as_deref(), Some("data:image/png;base64,iVBORw=="));
    }

    #[test]
    fn test_decode_data_url() {
        let url = to_data_url("image/png", &[1, 2, 3, 250]);
        assert_eq!(decode_data_url(&url).unwrap(), vec![1, 2, 3, 250]);
        assert_eq!(decode_data_url("data:text/plain,hi").unwrap(), b"hi".to_vec());
        assert!(decode_data_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_import_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "<p>hi</p>").unwrap();
        fs::create_dir_all(temp_dir.path().join("img")).unwrap();
        fs::write(temp_dir.path().join("img/logo.png"), [0u8, 1, 2]).unwrap();

        let mut store = FileStore::new();
        store
            .set("index.html", "kept", FileMeta::text())
            .unwrap();

        let report = import_directory(&mut store, temp_dir.path()).await.unwrap();
        assert_eq!(report.added, vec!["img/logo.png"]);
        assert_eq!(report.existing, vec!["index.html"]);
        assert_eq!(store.get("index.html").unwrap().content, "kept");
        assert!(store.get("img/logo.png").unwrap().is_binary);
    }

    #[tokio::test]
    async fn test_unlisted_binary_survives_import_and_export() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let font_bytes = [79u8, 84, 84, 79, 0, 255, 254, 128, 129];
        fs::create_dir_all(source.path().join("fonts")).unwrap();
        fs::write(source.path().join("fonts/brand.otf"), font_bytes).unwrap();
        fs::write(source.path().join("index.html"), "<p>hi</p>").unwrap();

        let mut store = FileStore::new();
        import_directory(&mut store, source.path()).await.unwrap();
        assert!(store.get("fonts/brand.otf").unwrap().is_binary);
        assert!(!store.get("index.html").unwrap().is_binary);

        export_directory(&store, target.path()).await.unwrap();
        assert_eq!(
            fs::read(target.path().join("fonts/brand.otf")).unwrap(),
            font_bytes.to_vec()
        );
        assert_eq!(
            fs::read_to_string(target.path().join("index.html")).unwrap(),
            "<p>hi</p>"
        );
    }

    #[tokio::test]
    async fn test_import_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new();
        let missing = temp_dir.path().join("nope");
        assert!(import_directory(&mut store, &missing).await.is_err());
    }

    #[tokio::test]
    async fn test_export_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new();
        store.set("index.html", "<p>x</p>", FileMeta::text()).unwrap();
        store
            .insert_if_absent(ProjectFile::binary(
                "img/a.png",
                "image/png",
                to_data_url("image/png", &[9, 8, 7]),
            ))
            .unwrap();
        store.set("../escape.txt", "no", FileMeta::text()).unwrap();

        let report = export_directory(&store, temp_dir.path()).await.unwrap();
        assert_eq!(report.written, vec!["index.html", "img/a.png"]);
        assert_eq!(report.unsafe_paths, vec!["../escape.txt"]);

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("index.html")).unwrap(),
            "<p>x</p>"
        );
        assert_eq!(fs::read(temp_dir.path().join("img/a.png")).unwrap(), vec![9, 8, 7]);
    }
}
