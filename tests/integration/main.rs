//! Integration tests for panelcache

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a panel referencing two on-disk PNGs and return its path
fn write_panel(dir: &Path) -> PathBuf {
    image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
        .save(dir.join("red.png"))
        .unwrap();
    image::RgbaImage::from_pixel(3, 1, image::Rgba([0, 0, 255, 255]))
        .save(dir.join("blue.png"))
        .unwrap();

    let panel = dir.join("panel.html");
    std::fs::write(
        &panel,
        r#"<div class="content"><h1>Bolts</h1><img src="red.png" alt="red"></div><section><img src='blue.png'></section>"#,
    )
    .unwrap();
    panel
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn panelcache(config_dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("panelcache");
        cmd.env("PANELCACHE_CONFIG", config_dir.join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("data URL"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("panelcache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[transport]"))
            .stdout(predicate::str::contains("block_class = \"content\""));
    }

    #[test]
    fn config_init_creates_file() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());
    }

    #[test]
    fn invalid_config_reports_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[transport\n").unwrap();
        panelcache(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn load_prints_inlined_markup() {
        let temp = TempDir::new().unwrap();
        let panel = write_panel(temp.path());

        panelcache(temp.path())
            .args(["load", panel.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("data:image/png;base64,"))
            .stdout(predicate::str::contains("red.png").not())
            .stdout(predicate::str::contains(r#"<section class="content">"#));
    }

    #[test]
    fn load_into_file_target() {
        let temp = TempDir::new().unwrap();
        let panel = write_panel(temp.path());
        let out = temp.path().join("mounted.html");

        panelcache(temp.path())
            .args(["load", panel.to_str().unwrap(), "--repeat", "3", "--target"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("3 load(s), 1 fetch(es)"));

        let mounted = std::fs::read_to_string(&out).unwrap();
        assert_eq!(mounted.matches("data:image/png;base64,").count(), 2);
    }

    #[test]
    fn load_jpeg_format() {
        let temp = TempDir::new().unwrap();
        let panel = write_panel(temp.path());

        panelcache(temp.path())
            .args(["load", panel.to_str().unwrap(), "--format", "jpeg"])
            .assert()
            .success()
            .stdout(predicate::str::contains("data:image/jpeg;base64,"));
    }

    #[test]
    fn load_missing_image_fails_whole_fragment() {
        let temp = TempDir::new().unwrap();
        let panel = temp.path().join("broken.html");
        std::fs::write(&panel, r#"<img src="missing.png">"#).unwrap();

        panelcache(temp.path())
            .args(["load", panel.to_str().unwrap()])
            .assert()
            .failure()
            .stdout(predicate::str::contains("<img").not())
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("Hint:"))
            .stderr(predicate::str::contains("nothing was cached"));
    }

    #[test]
    fn load_rejects_unknown_method() {
        let temp = TempDir::new().unwrap();
        panelcache(temp.path())
            .args(["load", "panel.html", "--method", "DELETE"])
            .assert()
            .failure();
    }

    #[test]
    fn inspect_lists_references_as_json() {
        let temp = TempDir::new().unwrap();
        let panel = write_panel(temp.path());

        let output = panelcache(temp.path())
            .args(["inspect", panel.to_str().unwrap(), "--output", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["blocks"], 2);
        assert_eq!(report["images"].as_array().unwrap().len(), 2);
        assert_eq!(report["images"][0]["locator"], "red.png");
        assert_eq!(report["images"][1]["locator"], "blue.png");
    }

    #[test]
    fn inspect_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let panel = temp.path().join("bad.html");
        std::fs::write(&panel, r#"<div><img src="a.png"#).unwrap();

        panelcache(temp.path())
            .args(["inspect", panel.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("nothing was cached").not());
    }

    #[test]
    fn inline_single_image() {
        let temp = TempDir::new().unwrap();
        write_panel(temp.path());

        panelcache(temp.path())
            .arg("inline")
            .arg(temp.path().join("red.png"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("data:image/png;base64,"));
    }
}

mod pipeline_tests {
    use super::*;
    use panelcache::config::Config;
    use panelcache::transport::HttpTransport;
    use panelcache::{ContentKey, EntryState, FragmentCache};
    use std::sync::Arc;

    fn cache() -> FragmentCache {
        let config = Config::default();
        FragmentCache::with_transport(Arc::new(HttpTransport::from_config(&config)), &config)
    }

    #[tokio::test]
    async fn resolves_real_images_from_disk() {
        let temp = TempDir::new().unwrap();
        let key = ContentKey::new(write_panel(temp.path()).to_string_lossy());
        let cache = cache();

        let fragment = cache.get(&key).await.unwrap();

        assert!(fragment.is_resolved());
        assert_eq!(fragment.image_count(), 2);
        assert!(fragment.images().iter().all(|image| image.is_inlined()));
        assert!(!fragment.markup().contains("red.png"));
        assert_eq!(cache.state(&key), EntryState::Resolved);
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_fetch() {
        let temp = TempDir::new().unwrap();
        let key = ContentKey::new(write_panel(temp.path()).to_string_lossy());
        let cache = cache();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                tokio::spawn(async move { cache.get(&key).await })
            })
            .collect();

        let mut fragments = Vec::new();
        for handle in handles {
            fragments.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(cache.fetch_count(), 1);
        assert!(fragments.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn failed_resolution_is_retried_after_fix() {
        let temp = TempDir::new().unwrap();
        let panel = temp.path().join("late.html");
        std::fs::write(&panel, r#"<img src="late.png">"#).unwrap();
        let key = ContentKey::new(panel.to_string_lossy());
        let cache = cache();

        assert!(cache.get(&key).await.is_err());
        assert_eq!(cache.state(&key), EntryState::Missing);

        image::RgbaImage::new(1, 1).save(temp.path().join("late.png")).unwrap();
        let fragment = cache.get(&key).await.unwrap();
        assert!(fragment.markup().contains("data:image/png;base64,"));
        assert_eq!(cache.fetch_count(), 2);
    }
}
