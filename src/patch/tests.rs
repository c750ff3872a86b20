#![allow(clippy::unwrap_used)]
use super::*;
use crate::container::{ClassId, ContainerError, Record, TextureHeader};
use chrono::NaiveDate;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap()
}

fn texture_record(path_id: i64, name: &str) -> Record {
    let payload = TextureHeader {
        name: name.to_string(),
        width: 2,
        height: 2,
        complete_image_size: 16,
        format: TextureFormat::Rgba32,
        mip_count: 3,
        image_data: vec![0x11; 16],
        trailing: vec![0xDE, 0xAD, 0xBE, 0xEF],
    }
    .to_payload()
    .unwrap();
    Record::new(path_id, ClassId::TEXTURE_2D, payload)
}

fn pattern(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 3) as u8, (y * 3) as u8, (x ^ y) as u8, 255 - x as u8])
    })
}

fn write_png(path: &Path, img: &RgbaImage) {
    let mut cursor = std::io::Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png).unwrap();
    std::fs::write(path, cursor.into_inner()).unwrap();
}

/// Temp workspace with a container, a frame dir and a mask dir
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(records: Vec<Record>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("res")).unwrap();
        std::fs::create_dir(dir.path().join("mask")).unwrap();
        let bytes = RecordBundle::new(records).serialize().unwrap();
        std::fs::write(dir.path().join("card.unity3d"), bytes).unwrap();
        Self { dir }
    }

    fn container(&self) -> PathBuf {
        self.dir.path().join("card.unity3d")
    }

    fn frame(&self, name: &str) -> PathBuf {
        self.dir.path().join("res").join(name)
    }

    fn mask(&self, name: &str) -> PathBuf {
        self.dir.path().join("mask").join(name)
    }

    fn config(&self, table: &[(&str, &str)]) -> PatchConfig {
        PatchConfig {
            explicit_table: table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            frame_dir: self.dir.path().join("res"),
            mask_dir: Some(self.dir.path().join("mask")),
            ..Default::default()
        }
    }

    fn catalog(&self, table: &[(&str, &str)]) -> ReplacementCatalog {
        build_catalog(&self.config(table)).unwrap()
    }

    fn file_count(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }

    fn scanned(&self, table: &[(&str, &str)]) -> TexturePatcher {
        let mut patcher = TexturePatcher::load(&self.container(), TextureMatcher::default())
            .unwrap();
        patcher.scan(&self.catalog(table)).unwrap();
        patcher
    }
}

fn standard_records() -> Vec<Record> {
    vec![
        Record::new(1, ClassId::TEXT_ASSET, b"card text".to_vec()),
        texture_record(2, "card_frame00"),
        Record::new(3, ClassId::SPRITE, vec![5; 20]),
        texture_record(4, "unknown_texture"),
    ]
}

#[test]
fn test_replace_and_commit_card_frame() {
    let fixture = Fixture::new(standard_records());
    let img = pattern(64, 64);
    write_png(&fixture.frame("normal.png"), &img);
    let original_bytes = std::fs::read(fixture.container()).unwrap();

    let patcher = fixture.scanned(&[("card_frame00", "normal.png")]);
    assert_eq!(patcher.state(), PatchState::Finalized);
    assert_eq!(patcher.report().replaced_count, 1);

    let outcome = patcher
        .finish_at(CommitMode::BackupAndCommit, timestamp())
        .unwrap();
    assert_eq!(outcome.state(), PatchState::BackedUpAndCommitted);

    let PatchOutcome::Committed {
        backup_path,
        output_path,
        serialized,
        ..
    } = outcome
    else {
        panic!("expected a committed outcome");
    };
    assert_eq!(
        backup_path,
        fixture.dir.path().join("card_backup_20250102_030405.unity3d")
    );
    assert_eq!(output_path, fixture.container());
    assert_eq!(std::fs::read(&backup_path).unwrap(), original_bytes);
    assert_eq!(std::fs::read(&output_path).unwrap(), serialized);

    let reloaded = RecordBundle::load(&output_path).unwrap();
    let texture = reloaded.record(1).unwrap().texture().unwrap();
    assert_eq!((texture.width, texture.height), (64, 64));
    assert_eq!(texture.format, TextureFormat::Rgba32);
    assert_eq!(texture.image_data.len(), 64 * 64 * 4);
    assert_eq!(texture.complete_image_size as usize, texture.image_data.len());
    assert_eq!(texture.trailing, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    let decoded =
        codec::decode_texture(&texture.image_data, 64, 64, TextureFormat::Rgba32).unwrap();
    assert_eq!(decoded, img);
}

#[test]
fn test_untouched_records_stay_byte_identical() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(8, 4));
    let before = RecordBundle::load(&fixture.container()).unwrap();

    let outcome = fixture
        .scanned(&[("card_frame00", "normal.png")])
        .finish_at(CommitMode::SaveAsCopy, timestamp())
        .unwrap();

    let PatchOutcome::SavedAsCopy { output_path, .. } = &outcome else {
        panic!("expected a saved copy");
    };
    let after = RecordBundle::load(output_path).unwrap();
    assert_eq!(after.len(), before.len());
    for index in [0, 2, 3] {
        assert_eq!(after.record(index), before.record(index));
    }
    assert_ne!(after.record(1), before.record(1));
    assert_eq!(after.record(1).unwrap().path_id, 2);
}

#[test]
fn test_save_as_copy_leaves_original() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let original_bytes = std::fs::read(fixture.container()).unwrap();

    let outcome = fixture
        .scanned(&[("card_frame00", "normal.png")])
        .finish_at(CommitMode::SaveAsCopy, timestamp())
        .unwrap();

    assert_eq!(outcome.state(), PatchState::SavedAsCopy);
    assert_eq!(std::fs::read(fixture.container()).unwrap(), original_bytes);
    let modified = fixture.dir.path().join("card_modified.unity3d");
    assert!(modified.is_file());
    assert!(!fixture
        .dir
        .path()
        .join("card_backup_20250102_030405.unity3d")
        .exists());
}

#[test]
fn test_unknown_texture_is_left_alone() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let patcher = fixture.scanned(&[("card_frame00", "normal.png")]);
    let outcomes: Vec<_> = patcher.report().outcomes_for("unknown_texture").collect();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, RecordStatus::NoCatalogEntry);
    assert_eq!(patcher.report().replaced_count, 1);
    assert!(patcher.report().warnings.is_empty());
}

#[test]
fn test_zero_matches_write_nothing() {
    let fixture = Fixture::new(standard_records());
    let files_before = fixture.file_count();

    let patcher = fixture.scanned(&[("card_frame07", "spell.png")]);
    assert_eq!(patcher.state(), PatchState::Aborted);

    let outcome = patcher
        .finish_at(CommitMode::BackupAndCommit, timestamp())
        .unwrap();
    assert!(matches!(outcome, PatchOutcome::NothingToDo { .. }));
    assert_eq!(outcome.report().replaced_count, 0);
    assert_eq!(outcome.state(), PatchState::Aborted);
    assert_eq!(fixture.file_count(), files_before);
}

#[test]
fn test_missing_replacement_file_warns_and_continues() {
    let fixture = Fixture::new(vec![
        texture_record(1, "card_frame01"),
        texture_record(2, "card_frame00"),
    ]);
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let patcher = fixture.scanned(&[
        ("card_frame00", "normal.png"),
        ("card_frame01", "effect.png"),
    ]);
    let report = patcher.report();

    assert_eq!(report.replaced_count, 1);
    assert_eq!(
        report.outcomes[0].status,
        RecordStatus::MissingFile {
            path: fixture.frame("effect.png")
        }
    );
    assert_eq!(report.warnings.len(), 1);
    assert!(report.errors.is_empty());
}

#[test]
fn test_corrupt_image_is_isolated() {
    let fixture = Fixture::new(vec![
        texture_record(1, "card_frame01"),
        texture_record(2, "card_frame00"),
    ]);
    std::fs::write(fixture.frame("effect.png"), b"this is not a png").unwrap();
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let patcher = fixture.scanned(&[
        ("card_frame00", "normal.png"),
        ("card_frame01", "effect.png"),
    ]);
    let report = patcher.report().clone();
    assert_eq!(report.replaced_count, 1);
    assert!(matches!(
        report.outcomes[0].status,
        RecordStatus::Failed { .. }
    ));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("card_frame01:"));

    // The failed record keeps its original payload and the commit still happens
    let outcome = patcher
        .finish_at(CommitMode::BackupAndCommit, timestamp())
        .unwrap();
    let after = RecordBundle::load(&fixture.container()).unwrap();
    assert_eq!(after.record(0), Some(&texture_record(1, "card_frame01")));
    assert_eq!(outcome.state(), PatchState::BackedUpAndCommitted);
}

#[test]
fn test_duplicate_names_are_both_replaced() {
    let fixture = Fixture::new(vec![
        texture_record(1, "card_frame00"),
        Record::new(2, ClassId::TEXT_ASSET, vec![1, 2, 3]),
        texture_record(3, "card_frame00"),
    ]);
    write_png(&fixture.frame("normal.png"), &pattern(3, 5));

    let patcher = fixture.scanned(&[("card_frame00", "normal.png")]);
    assert_eq!(patcher.report().replaced_count, 2);
    assert_eq!(patcher.report().outcomes_for("card_frame00").count(), 2);

    for index in [0, 2] {
        let texture = patcher.container().record(index).unwrap().texture().unwrap();
        assert_eq!((texture.width, texture.height), (3, 5));
    }
}

#[test]
fn test_backup_failure_leaves_original_untouched() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let original_bytes = std::fs::read(fixture.container()).unwrap();

    // Occupy the backup path so the copy cannot happen
    let blocked = backup_path(&fixture.container(), timestamp());
    std::fs::create_dir(&blocked).unwrap();

    let err = fixture
        .scanned(&[("card_frame00", "normal.png")])
        .finish_at(CommitMode::BackupAndCommit, timestamp())
        .unwrap_err();

    assert!(matches!(err, PatchError::Backup { .. }));
    assert_eq!(std::fs::read(fixture.container()).unwrap(), original_bytes);
}

#[test]
fn test_explicit_tier_wins_in_a_run() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(6, 6));
    write_png(&fixture.mask("card_frame00.png"), &pattern(2, 9));

    let patcher = fixture.scanned(&[("card_frame00", "normal.png")]);
    let outcome = patcher.report().outcomes_for("card_frame00").next().unwrap();
    match &outcome.status {
        RecordStatus::Replaced {
            source,
            tier,
            width,
            height,
            ..
        } => {
            assert_eq!(source, &fixture.frame("normal.png"));
            assert_eq!(*tier, CatalogTier::Explicit);
            assert_eq!((*width, *height), (6, 6));
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_directory_scan_replacement() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.mask("unknown_texture.PNG"), &pattern(5, 2));
    let source = std::fs::read(fixture.mask("unknown_texture.PNG")).unwrap();

    let patcher = fixture.scanned(&[]);
    let outcome = patcher.report().outcomes_for("unknown_texture").next().unwrap();
    match &outcome.status {
        RecordStatus::Replaced {
            tier,
            width,
            height,
            source_sha256,
            ..
        } => {
            assert_eq!(*tier, CatalogTier::DirectoryScan);
            assert_eq!((*width, *height), (5, 2));
            assert_eq!(source_sha256, &hex::encode(Sha256::digest(&source)));
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_progress_callback_sees_every_target() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let mut patcher =
        TexturePatcher::load(&fixture.container(), TextureMatcher::default()).unwrap();
    let mut seen = Vec::new();
    patcher
        .scan_with(&fixture.catalog(&[("card_frame00", "normal.png")]), |outcome| {
            seen.push(outcome.name.clone())
        })
        .unwrap();

    assert_eq!(seen, vec!["card_frame00", "unknown_texture"]);
}

#[test]
fn test_name_filter_limits_targets() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let mut patcher = TexturePatcher::load(
        &fixture.container(),
        TextureMatcher::new(Some("card_frame".to_string())),
    )
    .unwrap();
    patcher
        .scan(&fixture.catalog(&[("card_frame00", "normal.png")]))
        .unwrap();

    let names: Vec<_> = patcher.report().outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["card_frame00"]);
}

#[test]
fn test_plan_does_not_mutate() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let before = RecordBundle::load(&fixture.container()).unwrap();

    let patcher = TexturePatcher::load(&fixture.container(), TextureMatcher::default()).unwrap();
    let plan = patcher.plan(&fixture.catalog(&[("card_frame00", "normal.png")]));

    assert_eq!(plan.len(), 2);
    assert!(matches!(plan[0].decision, ReplacementDecision::Ready { .. }));
    assert_eq!(plan[1].decision, ReplacementDecision::NoCatalogEntry);
    assert_eq!(patcher.container(), &before);
    assert_eq!(patcher.state(), PatchState::Loaded);
}

#[test]
fn test_state_guards() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let catalog = fixture.catalog(&[("card_frame00", "normal.png")]);

    let unscanned = TexturePatcher::load(&fixture.container(), TextureMatcher::default()).unwrap();
    assert!(matches!(
        unscanned.finish_at(CommitMode::SaveAsCopy, timestamp()),
        Err(PatchError::InvalidState(_))
    ));

    let mut patcher =
        TexturePatcher::load(&fixture.container(), TextureMatcher::default()).unwrap();
    patcher.scan(&catalog).unwrap();
    assert!(matches!(
        patcher.scan(&catalog),
        Err(PatchError::InvalidState(_))
    ));
}

#[test]
fn test_load_failure_is_fatal() {
    let fixture = Fixture::new(standard_records());
    let result = TexturePatcher::load(
        &fixture.dir.path().join("absent.unity3d"),
        TextureMatcher::default(),
    );
    assert!(matches!(result, Err(PatchError::Load(_))));

    std::fs::write(fixture.container(), b"garbage").unwrap();
    let result = TexturePatcher::load(&fixture.container(), TextureMatcher::default());
    assert!(matches!(result, Err(PatchError::Load(_))));
}

#[test]
fn test_run_patch_directory_mode() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let config = PatchConfig {
        container_relative_path: Some(PathBuf::from("card.unity3d")),
        ..fixture.config(&[("card_frame00", "normal.png")])
    };
    let outcome = run_patch(fixture.dir.path(), &config, CommitMode::SaveAsCopy).unwrap();

    assert_eq!(outcome.report().replaced_count, 1);
    assert!(fixture.dir.path().join("card_modified.unity3d").is_file());
}

/// Bundle wrapper that can be told to fail mutations or serialization
struct FailingContainer {
    inner: RecordBundle,
    fail_replace_at: Option<usize>,
    fail_serialize: bool,
}

impl AssetContainer for FailingContainer {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn record(&self, index: usize) -> Option<&Record> {
        self.inner.record(index)
    }

    fn replace_texture(
        &mut self,
        index: usize,
        update: TextureUpdate,
    ) -> Result<(), ContainerError> {
        if self.fail_replace_at == Some(index) {
            return Err(ContainerError::RecordOutOfRange(index));
        }
        self.inner.replace_texture(index, update)
    }

    fn serialize(&self) -> Result<Vec<u8>, ContainerError> {
        if self.fail_serialize {
            return Err(ContainerError::Overflow("record count".into()));
        }
        self.inner.serialize()
    }
}

fn failing_patcher(
    fixture: &Fixture,
    fail_replace_at: Option<usize>,
    fail_serialize: bool,
) -> TexturePatcher<FailingContainer> {
    let container = FailingContainer {
        inner: RecordBundle::load(&fixture.container()).unwrap(),
        fail_replace_at,
        fail_serialize,
    };
    TexturePatcher::with_container(fixture.container(), container, TextureMatcher::default())
}

#[test]
fn test_mutation_failure_is_isolated() {
    let fixture = Fixture::new(vec![
        texture_record(1, "card_frame00"),
        texture_record(2, "card_frame01"),
    ]);
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    write_png(&fixture.frame("effect.png"), &pattern(8, 8));
    let catalog = fixture.catalog(&[
        ("card_frame00", "normal.png"),
        ("card_frame01", "effect.png"),
    ]);

    let mut patcher = failing_patcher(&fixture, Some(0), false);
    let report = patcher.scan(&catalog).unwrap().clone();

    assert_eq!(report.replaced_count, 1);
    assert!(matches!(
        report.outcomes[0].status,
        RecordStatus::Failed { .. }
    ));
    assert!(matches!(
        report.outcomes[1].status,
        RecordStatus::Replaced { width: 8, height: 8, .. }
    ));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("card_frame00:"));
    assert_eq!(patcher.state(), PatchState::Finalized);

    // The failed record keeps its original payload
    assert_eq!(
        patcher.container().record(0),
        Some(&texture_record(1, "card_frame00"))
    );
}

#[test]
fn test_encode_failure_is_isolated() {
    let fixture = Fixture::new(vec![
        texture_record(1, "card_frame01"),
        texture_record(2, "card_frame00"),
    ]);
    let too_wide =
        RgbaImage::from_pixel(codec::MAX_TEXTURE_DIMENSION + 1, 1, Rgba([1, 2, 3, 4]));
    write_png(&fixture.frame("effect.png"), &too_wide);
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));

    let patcher = fixture.scanned(&[
        ("card_frame00", "normal.png"),
        ("card_frame01", "effect.png"),
    ]);
    let report = patcher.report();
    assert_eq!(report.replaced_count, 1);
    let RecordStatus::Failed { error } = &report.outcomes[0].status else {
        panic!("expected the oversized image to fail");
    };
    assert!(error.contains("Failed to encode texture"));
    assert!(error.contains("16385x1"));
    assert!(matches!(
        report.outcomes[1].status,
        RecordStatus::Replaced { .. }
    ));
}

#[test]
fn test_serialize_failure_writes_nothing() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let original_bytes = std::fs::read(fixture.container()).unwrap();
    let catalog = fixture.catalog(&[("card_frame00", "normal.png")]);
    let files_before = fixture.file_count();

    for mode in [CommitMode::BackupAndCommit, CommitMode::SaveAsCopy] {
        let mut patcher = failing_patcher(&fixture, None, true);
        patcher.scan(&catalog).unwrap();
        assert_eq!(patcher.state(), PatchState::Finalized);

        let err = patcher.finish_at(mode, timestamp()).unwrap_err();
        assert!(matches!(err, PatchError::Serialize(_)));
        assert_eq!(fixture.file_count(), files_before);
        assert!(!backup_path(&fixture.container(), timestamp()).exists());
        assert!(!modified_path(&fixture.container()).exists());
        assert_eq!(std::fs::read(fixture.container()).unwrap(), original_bytes);
    }
}

#[test]
fn test_existing_backup_file_is_never_overwritten() {
    let fixture = Fixture::new(standard_records());
    write_png(&fixture.frame("normal.png"), &pattern(4, 4));
    let original_bytes = std::fs::read(fixture.container()).unwrap();

    let earlier = backup_path(&fixture.container(), timestamp());
    std::fs::write(&earlier, b"earlier backup").unwrap();

    let err = fixture
        .scanned(&[("card_frame00", "normal.png")])
        .finish_at(CommitMode::BackupAndCommit, timestamp())
        .unwrap_err();

    let PatchError::Backup { path, source } = err else {
        panic!("expected a backup error");
    };
    assert_eq!(path, earlier);
    assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier backup");
    assert_eq!(std::fs::read(fixture.container()).unwrap(), original_bytes);
}
