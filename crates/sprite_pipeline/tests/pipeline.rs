//! End-to-end runs of the sprite pipeline over a temporary project tree

#![cfg(unix)]

use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sprite_pipeline::prelude::*;
use sprite_pipeline::publish::{classify, EntryKind};

const LABELS: [&str; 4] = ["east", "north", "west", "south"];

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn source(&self, category: &str, id: &str) -> PathBuf {
        self.root()
            .join("models")
            .join(category)
            .join(id)
            .join(format!("{id}.blend"))
    }

    fn sprites(&self, category: &str, id: &str) -> PathBuf {
        self.root().join("sprites").join(category).join(id)
    }

    fn alias(&self, category: &str, id: &str) -> PathBuf {
        self.root().join("static/img/sprites").join(category).join(id)
    }

    fn add_model(&self, category: &str, id: &str, modified: SystemTime) {
        let source = self.source(category, id);
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"scene").unwrap();
        set_modified(&source, modified);
    }

    fn add_sprites(&self, category: &str, id: &str, modified: SystemTime) {
        let dir = self.sprites(category, id);
        fs::create_dir_all(&dir).unwrap();
        for label in LABELS {
            let path = dir.join(format!("{label}.png"));
            fs::write(&path, b"previous render").unwrap();
            set_modified(&path, modified);
        }
    }

    fn orchestrator(&self) -> RenderOrchestrator<HeadlessBackend> {
        let config = PipelineConfig::default()
            .with_categories(["items"])
            .with_resolution(24, 24);
        config.validate().unwrap();
        RenderOrchestrator::new(&config, self.root(), HeadlessBackend::new(config.render.clone()))
    }
}

fn set_modified(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_times(FileTimes::new().set_modified(time))
        .unwrap();
}

fn ago(seconds: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(seconds)
}

#[test]
fn test_renders_new_model_and_skips_fresh_one() {
    let project = Project::new();
    // Rendered a minute ago, saved one second after the render
    project.add_sprites("items", "axe", ago(61));
    project.add_model("items", "axe", ago(60));
    project.add_model("items", "axe_old", ago(60));

    let mut orchestrator = project.orchestrator();
    let report = orchestrator.run(&RunOptions::default()).unwrap();

    let axe = report.model("items", "axe").unwrap();
    assert!(matches!(axe.outcome, ModelOutcome::Skipped(Freshness::Fresh { .. })));
    assert_eq!(fs::read(project.sprites("items", "axe").join("east.png")).unwrap(), b"previous render");

    let axe_old = report.model("items", "axe_old").unwrap();
    assert!(matches!(axe_old.outcome, ModelOutcome::Rendered { previous: Freshness::Missing, .. }));
    for label in LABELS {
        let image = image::open(project.sprites("items", "axe_old").join(format!("{label}.png"))).unwrap();
        assert_eq!((image.width(), image.height()), (24, 24));
    }

    // Both models are published, rendered this run or not
    for id in ["axe", "axe_old"] {
        let alias = project.alias("items", id);
        assert_eq!(classify(&alias).unwrap(), EntryKind::Alias);
        assert_eq!(fs::read_link(&alias).unwrap(), project.sprites("items", id));
    }

    assert_eq!(report.rendered_count(), 1);
    assert_eq!(report.skipped_count(), 1);
    assert!(!report.has_conflicts());
    assert_eq!(orchestrator.backend().stats().loads, 1);
}

#[test]
fn test_second_run_renders_nothing() {
    let project = Project::new();
    project.add_model("items", "axe", ago(120));
    project.add_model("items", "sword", ago(120));

    let mut orchestrator = project.orchestrator();
    let first = orchestrator.run(&RunOptions::default()).unwrap();
    assert_eq!(first.rendered_count(), 2);

    // Saving the source after rendering leaves it within the threshold
    let second = orchestrator.run(&RunOptions::default()).unwrap();
    assert_eq!(second.rendered_count(), 0);
    assert_eq!(second.skipped_count(), 2);

    let stats = orchestrator.backend().stats();
    assert_eq!(stats.loads, 2);
    assert_eq!(stats.renders, 8);
    assert_eq!(stats.saves, 2);
}

#[test]
fn test_edit_beyond_threshold_triggers_render() {
    let project = Project::new();
    let rendered_at = ago(120);
    project.add_sprites("items", "axe", rendered_at);
    project.add_model("items", "axe", rendered_at + Duration::from_secs(15));
    project.add_sprites("items", "hammer", rendered_at);
    project.add_model("items", "hammer", rendered_at + Duration::from_secs(5));

    let report = project.orchestrator().run(&RunOptions::default()).unwrap();

    let axe = report.model("items", "axe").unwrap();
    assert!(matches!(axe.outcome, ModelOutcome::Rendered { previous: Freshness::Stale { .. }, .. }));
    assert_ne!(fs::read(project.sprites("items", "axe").join("east.png")).unwrap(), b"previous render");

    let hammer = report.model("items", "hammer").unwrap();
    assert!(matches!(hammer.outcome, ModelOutcome::Skipped(_)));
}

#[test]
fn test_empty_output_dir_is_rendered() {
    let project = Project::new();
    project.add_model("items", "axe", ago(120));
    fs::create_dir_all(project.sprites("items", "axe")).unwrap();

    let report = project.orchestrator().run(&RunOptions::default()).unwrap();

    let axe = report.model("items", "axe").unwrap();
    assert!(matches!(axe.outcome, ModelOutcome::Rendered { previous: Freshness::Empty, .. }));
    assert_eq!(fs::read_dir(project.sprites("items", "axe")).unwrap().count(), 4);
}

#[test]
fn test_force_renders_fresh_models() {
    let project = Project::new();
    project.add_sprites("items", "axe", ago(61));
    project.add_model("items", "axe", ago(60));

    let options = RunOptions {
        force: true,
        ..RunOptions::default()
    };
    let report = project.orchestrator().run(&options).unwrap();

    let axe = report.model("items", "axe").unwrap();
    assert!(matches!(axe.outcome, ModelOutcome::Rendered { previous: Freshness::Fresh { .. }, .. }));
}

#[test]
fn test_conflict_is_reported_and_other_models_publish() {
    let project = Project::new();
    project.add_model("items", "axe", ago(120));
    project.add_model("items", "axe_old", ago(120));

    let blocked = project.alias("items", "axe");
    fs::create_dir_all(&blocked).unwrap();
    fs::write(blocked.join("hand_made.png"), b"keep me").unwrap();

    let report = project.orchestrator().run(&RunOptions::default()).unwrap();

    assert!(report.has_conflicts());
    let conflicts: Vec<_> = report.conflicts().collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].alias, blocked);
    assert_eq!(conflicts[0].existing, EntryKind::Directory);

    // The blocking directory is left as it was
    assert_eq!(fs::read(blocked.join("hand_made.png")).unwrap(), b"keep me");

    // The conflicting model was still rendered and the next one still published
    assert_eq!(report.rendered_count(), 2);
    let axe_old = report.model("items", "axe_old").unwrap();
    assert!(matches!(axe_old.publish, PublishStatus::Published(PublishOutcome::Created)));
}

#[test]
fn test_existing_alias_is_replaced() {
    let project = Project::new();
    project.add_model("items", "axe", ago(120));

    let alias = project.alias("items", "axe");
    fs::create_dir_all(alias.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(project.root().join("sprites/items/renamed"), &alias).unwrap();

    let report = project.orchestrator().run(&RunOptions::default()).unwrap();

    let axe = report.model("items", "axe").unwrap();
    assert!(matches!(axe.publish, PublishStatus::Published(PublishOutcome::Replaced)));
    assert_eq!(fs::read_link(&alias).unwrap(), project.sprites("items", "axe"));
}

#[test]
fn test_missing_category_directory_is_fatal() {
    let project = Project::new();

    let error = project.orchestrator().run(&RunOptions::default()).unwrap_err();

    assert!(matches!(error, PipelineError::Filesystem(FilesystemError::MissingDirectory(_))));
}

#[test]
fn test_missing_source_artifact_fails_the_run() {
    let project = Project::new();
    fs::create_dir_all(project.root().join("models/items/axe")).unwrap();

    let error = project.orchestrator().run(&RunOptions::default()).unwrap_err();

    assert!(matches!(error, PipelineError::Backend(BackendError::Load { .. })));
    assert!(!project.sprites("items", "axe").exists());
}
