use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;
use tempserve::output::{embed_json, format_report, NO_PREVIEW};
use tempserve::page::{fill_placeholders, render_page, PageSource, FILES_PLACEHOLDER, META_PLACEHOLDER};
use tempserve::server::{percent_decode, route, Route};
use tempserve::{
    catalog, guess_mime, is_text_candidate, looks_binary, read_gitignore, snapshot,
    BinaryDetection, CatalogBuilder, FileRecord, GitignorePattern, ServeError, FALLBACK_MIME,
    LOG_DIR,
};
use tiny_http::Method;
fn paths(files: &[FileRecord]) -> Vec<&str> {
    files.iter().map(|f| f.path.as_str()).collect()
}
#[test]
fn test_basic_scan() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "a.txt");
    assert_eq!(files[0].size, 5);
    assert_eq!(files[0].mime, "text/plain");
    assert_eq!(files[0].text.as_deref(), Some("hello"));
}
#[test]
fn test_sorted_forward_slash_paths() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/nested")).unwrap();
    fs::write(dir.path().join("zeta.md"), "z").unwrap();
    fs::write(dir.path().join("src/nested/deep.rs"), "fn x() {}").unwrap();
    fs::write(dir.path().join("src/lib.rs"), "pub fn y() {}").unwrap();
    fs::write(dir.path().join("Alpha.txt"), "a").unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(
        paths(&files),
        vec!["Alpha.txt", "src/lib.rs", "src/nested/deep.rs", "zeta.md"]
    );
}
#[test]
fn test_catalog_is_deterministic() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("f{i}.txt")), "x".repeat(i)).unwrap();
    }
    let options = CatalogBuilder::new(dir.path()).build();
    let first = snapshot(&options).unwrap();
    let second = snapshot(&options).unwrap();
    assert_eq!(first.meta.file_count, second.meta.file_count);
    assert_eq!(first.meta.total_bytes, second.meta.total_bytes);
    assert_eq!(first.files, second.files);
    assert_eq!(first.meta.total_bytes, (0..20).sum::<usize>() as u64);
}
#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let snap = snapshot(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(snap.meta.file_count, 0);
    assert_eq!(snap.meta.total_bytes, 0);
    assert!(snap.files.is_empty());
}
#[test]
fn test_invalid_root_is_config_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = catalog(&CatalogBuilder::new(&missing).build()).unwrap_err();
    assert!(matches!(err, ServeError::InvalidRoot(_)));
    assert!(err.is_config());
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();
    assert!(matches!(
        catalog(&CatalogBuilder::new(&file).build()),
        Err(ServeError::InvalidRoot(_))
    ));
}
#[test]
fn test_null_byte_drops_text() {
    let dir = tempdir().unwrap();
    let mut data = b"looks like text".to_vec();
    data.push(0);
    data.extend_from_slice(b"but is not");
    fs::write(dir.path().join("notes.txt"), &data).unwrap();
    fs::write(dir.path().join("blob.bin"), [0u8, 1, 2, 3]).unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(files.len(), 2);
    for file in &files {
        assert!(file.text.is_none(), "{} should have no text", file.path);
    }
    assert_eq!(files[0].mime, FALLBACK_MIME);
    assert_eq!(files[0].size, 4);
}
#[test]
fn test_null_byte_after_sniff_window_keeps_text() {
    let dir = tempdir().unwrap();
    let mut data = vec![b'a'; 5000];
    data.push(0);
    fs::write(dir.path().join("late.txt"), &data).unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert!(files[0].text.is_some());
}
#[test]
fn test_text_limit_truncates_text_files_and_skips_other_large_files() {
    let dir = tempdir().unwrap();
    let mut f = File::create(dir.path().join("big.txt")).unwrap();
    write!(f, "{}", "A".repeat(500)).unwrap();
    fs::write(dir.path().join("big.dat"), "B".repeat(500)).unwrap();
    fs::write(dir.path().join("small.dat"), "C".repeat(50)).unwrap();
    let options = CatalogBuilder::new(dir.path()).text_limit(100).build();
    let files = catalog(&options).unwrap();
    assert_eq!(paths(&files), vec!["big.dat", "big.txt", "small.dat"]);
    assert_eq!(files[0].size, 500);
    assert!(files[0].text.is_none());
    assert_eq!(files[1].size, 500);
    assert_eq!(files[1].text.as_deref(), Some("A".repeat(100).as_str()));
    assert_eq!(files[2].text.as_deref(), Some("C".repeat(50).as_str()));
}
#[test]
fn test_invalid_utf8_is_replaced() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("latin1.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(files[0].text.as_deref(), Some("caf\u{FFFD}"));
}
#[test]
fn test_text_predicates() {
    assert!(is_text_candidate("text/plain", 10_000_000, 400_000));
    assert!(is_text_candidate("application/octet-stream", 400_000, 400_000));
    assert!(!is_text_candidate("image/png", 400_001, 400_000));
    assert!(looks_binary(b"ab\0cd", BinaryDetection::Simple));
    assert!(!looks_binary(b"plain ascii", BinaryDetection::Simple));
    assert!(!looks_binary(b"ab\0cd", BinaryDetection::None));
    assert!(looks_binary(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", BinaryDetection::Accurate));
}
#[test]
fn test_default_ignored_dirs() {
    let dir = tempdir().unwrap();
    for sub in ["node_modules/pkg", "target/debug", "__pycache__", "src"] {
        fs::create_dir_all(dir.path().join(sub)).unwrap();
    }
    fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
    fs::write(dir.path().join("target/debug/out.txt"), "x").unwrap();
    fs::write(dir.path().join("__pycache__/m.pyc"), "x").unwrap();
    fs::write(dir.path().join("src/main.py"), "print(1)").unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(paths(&files), vec!["src/main.py"]);
}
#[test]
fn test_gitignore_prunes_dirs_and_filters_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "# build output\n*.log\nout/\n/secrets\n").unwrap();
    fs::create_dir_all(dir.path().join("out")).unwrap();
    fs::create_dir_all(dir.path().join("secrets")).unwrap();
    fs::create_dir_all(dir.path().join("logs")).unwrap();
    fs::write(dir.path().join("out/a.txt"), "x").unwrap();
    fs::write(dir.path().join("secrets/key.txt"), "x").unwrap();
    fs::write(dir.path().join("logs/run.log"), "x").unwrap();
    fs::write(dir.path().join("debug.log"), "x").unwrap();
    fs::write(dir.path().join("keep.txt"), "x").unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(paths(&files), vec!["keep.txt"]);

    let files = catalog(
        &CatalogBuilder::new(dir.path())
            .respect_gitignore(false)
            .build(),
    )
    .unwrap();
    assert_eq!(
        paths(&files),
        vec!["debug.log", "keep.txt", "logs/run.log", "out/a.txt", "secrets/key.txt"]
    );
}
#[test]
fn test_read_gitignore() {
    let dir = tempdir().unwrap();
    assert!(read_gitignore(dir.path()).is_empty());
    fs::write(dir.path().join(".gitignore"), "\n# c\n!keep.log\n/dist/\n*.tmp\n").unwrap();
    assert_eq!(
        read_gitignore(dir.path()),
        vec![
            GitignorePattern {
                glob: "dist".into(),
                dir_only: true
            },
            GitignorePattern {
                glob: "*.tmp".into(),
                dir_only: false
            },
        ]
    );
}
#[test]
fn test_ignore_patterns() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.log"), "b").unwrap();
    let options = CatalogBuilder::new(dir.path())
        .ignore_patterns(vec!["*.log".into()])
        .build();
    let files = catalog(&options).unwrap();
    assert_eq!(paths(&files), vec!["a.txt"]);
}
#[test]
fn test_invalid_user_pattern_is_rejected() {
    let dir = tempdir().unwrap();
    let options = CatalogBuilder::new(dir.path())
        .ignore_patterns(vec!["a[".into()])
        .build();
    assert!(matches!(catalog(&options), Err(ServeError::Pattern(_))));
}
#[test]
fn test_hidden_files() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".config")).unwrap();
    fs::write(dir.path().join(".config/settings.toml"), "x = 1").unwrap();
    fs::write(dir.path().join(".hidden"), "h").unwrap();
    fs::write(dir.path().join("shown.txt"), "s").unwrap();
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(paths(&files), vec!["shown.txt"]);
    let files = catalog(&CatalogBuilder::new(dir.path()).include_hidden(true).build()).unwrap();
    assert_eq!(
        paths(&files),
        vec![".config/settings.toml", ".hidden", "shown.txt"]
    );
}
#[test]
fn test_excluded_paths() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("generated")).unwrap();
    fs::write(root.join("generated/out.txt"), "out").unwrap();
    fs::write(root.join("index.html"), "<html></html>").unwrap();
    fs::write(root.join("app.rs"), "fn main() {}").unwrap();
    let options = CatalogBuilder::new(&root)
        .exclude(root.join("generated"))
        .exclude(root.join("index.html"))
        .build();
    let files = catalog(&options).unwrap();
    assert_eq!(paths(&files), vec!["app.rs"]);
}
#[test]
fn test_log_dir_is_never_listed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    let logs = dir.path().join(LOG_DIR);
    fs::create_dir_all(&logs).unwrap();
    fs::write(logs.join("server_1.log"), "[ts] Serving").unwrap();
    fs::write(logs.join("ai_report.txt"), "FILE: a.txt").unwrap();
    fs::write(dir.path().join("_logs/notes.txt"), "kept").unwrap();
    let snap = snapshot(&CatalogBuilder::new(dir.path()).build()).unwrap();
    assert_eq!(paths(&snap.files), vec!["_logs/notes.txt", "a.txt"]);
    assert_eq!(snap.meta.file_count, 2);
}
#[cfg(unix)]
#[test]
fn test_unreadable_file_is_listed_without_text() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    fs::write(&secret, "hidden").unwrap();
    fs::write(dir.path().join("open.txt"), "plain").unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&secret).is_ok() {
        // Permission bits do not bind root.
        return;
    }
    let files = catalog(&CatalogBuilder::new(dir.path()).build()).unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(paths(&files), vec!["open.txt", "secret.txt"]);
    let record = &files[1];
    assert_eq!(record.size, 6);
    assert_eq!(record.mime, "text/plain");
    assert_eq!(record.text, None);
    assert_eq!(files[0].text.as_deref(), Some("plain"));
}
#[test]
fn test_guess_mime() {
    assert_eq!(guess_mime("src/main.rs"), "text/x-rust");
    assert_eq!(guess_mime("README.MD"), "text/markdown");
    assert_eq!(guess_mime("static/logo.png"), "image/png");
    assert_eq!(guess_mime(".gitignore"), FALLBACK_MIME);
    assert_eq!(guess_mime("Makefile"), FALLBACK_MIME);
    assert_eq!(guess_mime("dir.d/noext"), FALLBACK_MIME);
}
#[test]
fn test_embed_json_escapes_script_close() {
    let json = embed_json(&vec!["</script><script>alert(1)</script>"]).unwrap();
    assert!(!json.contains("</"));
    let back: Vec<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back[0], "</script><script>alert(1)</script>");
}
#[test]
fn test_report_format() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.bin"), [0u8, 9]).unwrap();
    let snap = snapshot(&CatalogBuilder::new(dir.path()).build()).unwrap();
    let report = format_report(&snap).unwrap();
    let banner = "=".repeat(80);
    let separator = "-".repeat(80);
    let mut lines = report.lines();
    let meta: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(meta["file_count"], 2);
    assert_eq!(meta["total_bytes"], 7);
    assert!(report.contains(&format!("\n\n{banner}\nFILE: a.txt\n{separator}\nhello")));
    assert!(report.ends_with(&format!("FILE: b.bin\n{separator}\n{NO_PREVIEW}")));
}
#[test]
fn test_fill_placeholders() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x.html"), "</script>").unwrap();
    let snap = snapshot(&CatalogBuilder::new(dir.path()).build()).unwrap();
    let shell = format!("<body>{META_PLACEHOLDER}{FILES_PLACEHOLDER}</body>");
    let page = fill_placeholders(&shell, &snap).unwrap();
    assert!(!page.contains(META_PLACEHOLDER));
    assert!(!page.contains(FILES_PLACEHOLDER));
    assert!(page.contains("\"file_count\":1"));
    assert!(page.contains("\"path\":\"x.html\""));
    assert_eq!(page.matches("</script>").count(), 2);
}
#[test]
fn test_render_page_sources() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    let snap = snapshot(&CatalogBuilder::new(dir.path()).build()).unwrap();
    let bundled = render_page(&PageSource::Bundled, &snap);
    assert!(bundled.contains("\"path\":\"a.txt\""));
    assert!(!bundled.contains(FILES_PLACEHOLDER));

    let template = dir.path().join("shell.html");
    fs::write(&template, format!("<p>custom</p>{META_PLACEHOLDER}")).unwrap();
    let custom = render_page(&PageSource::Template(template), &snap);
    assert!(custom.starts_with("<p>custom</p>"));
    assert!(custom.contains("\"file_count\":"));

    let missing = render_page(&PageSource::Template(dir.path().join("gone.html")), &snap);
    assert!(missing.contains("<h1>Error</h1>"));
    assert!(missing.contains("not found"));
}
#[test]
fn test_routes() {
    assert_eq!(route(&Method::Get, "/"), Route::Index);
    assert_eq!(route(&Method::Get, "/index.html?x=1"), Route::Index);
    assert_eq!(route(&Method::Get, "/__api__/ping"), Route::Ping);
    assert_eq!(route(&Method::Get, "/__api__/meta"), Route::Meta);
    assert_eq!(route(&Method::Get, "/__api__/files?fresh=1"), Route::Files);
    assert_eq!(route(&Method::Post, "/__api__/refresh"), Route::Refresh);
    assert_eq!(route(&Method::Post, "/__api__/shutdown"), Route::Shutdown);
    assert_eq!(route(&Method::Options, "/__api__/files"), Route::Preflight);
    assert_eq!(route(&Method::Options, "/anything"), Route::Preflight);
    assert_eq!(route(&Method::Get, "/__api__/bogus"), Route::ApiNotFound);
    assert_eq!(route(&Method::Post, "/__api__/ping"), Route::ApiNotFound);
    assert_eq!(route(&Method::Get, "/__api__/shutdown"), Route::ApiNotFound);
    assert_eq!(
        route(&Method::Get, "/src/main.rs"),
        Route::Static("/src/main.rs".into())
    );
    assert_eq!(route(&Method::Post, "/upload"), Route::Unsupported);
    assert_eq!(route(&Method::Delete, "/a.txt"), Route::Unsupported);
}
#[test]
fn test_percent_decode() {
    assert_eq!(percent_decode("/my%20notes/a.md").as_deref(), Some("/my notes/a.md"));
    assert_eq!(percent_decode("/%C3%A9t%c3%a9").as_deref(), Some("/été"));
    assert_eq!(percent_decode("/plain+name").as_deref(), Some("/plain+name"));
    assert_eq!(percent_decode("/%+1"), None);
    assert_eq!(percent_decode("/%-1"), None);
    assert_eq!(percent_decode("/%zz"), None);
    assert_eq!(percent_decode("/trailing%2"), None);
    assert_eq!(percent_decode("/%FF"), None);
}
