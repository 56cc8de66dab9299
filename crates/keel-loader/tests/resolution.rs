//! Integration test: library resolution through the manager.
//!
//! Lays out library files in a temporary directory and resolves them with
//! a fake module loader, checking candidate order, dependency order,
//! caching, and resource extraction.

use std::sync::Arc;

use keel_loader::{DirectoryResources, LibraryManager, LibrarySpec, LoadError, LoaderConfig};
use keel_test_utils::{linux64, linux64_path, touch, FakeModuleLoader, MemoryResources};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn manager(dir: &TempDir, loader: &FakeModuleLoader) -> LibraryManager {
    LibraryManager::new(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path())
            .with_module_loader(loader.clone()),
    )
}

#[test]
fn alternate_name_resolves_when_primary_is_missing() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), linux64_path("SDL2-2.0"));
    let loader = FakeModuleLoader::new().with_module("SDL2-2.0.so", &[]);
    let manager = manager(&dir, &loader);

    let lib = manager
        .load(&LibrarySpec::new("SDL2").alt_name("SDL2-2.0"))
        .unwrap();
    assert_eq!(lib.name(), "SDL2");
    assert!(lib.path().ends_with("SDL2-2.0.so"));
    assert!(manager.get("SDL2").is_some());
    assert!(manager.get("SDL2-2.0").is_none());
}

#[test]
fn unresolvable_library_is_not_cached() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeModuleLoader::new();
    let manager = manager(&dir, &loader);

    let err = manager.load(&LibrarySpec::new("ghost")).unwrap_err();
    assert!(matches!(err, LoadError::LibraryNotFound { ref name, .. } if name == "ghost"));
    assert!(manager.loaded_names().is_empty());
    assert!(loader.opened().is_empty());
}

#[test]
fn broken_candidate_falls_through_and_reports_last_error() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), linux64_path("png"));
    touch(dir.path(), linux64_path("png16"));
    let loader = FakeModuleLoader::new()
        .with_broken("png.so")
        .with_module("png16.so", &[]);
    let manager = manager(&dir, &loader);

    let lib = manager.load(&LibrarySpec::new("png").alt_name("png16")).unwrap();
    assert!(lib.path().ends_with("png16.so"));

    let only_broken = FakeModuleLoader::new().with_broken("png.so");
    let err = self::manager(&dir, &only_broken)
        .load(&LibrarySpec::new("png"))
        .unwrap_err();
    match err {
        LoadError::LibraryNotFound { last_error, .. } => {
            assert!(last_error.unwrap().contains("invalid module header"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dependencies_load_first_and_depth_first() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    for name in ["avutil", "swresample", "avcodec", "avformat"] {
        touch(dir.path(), linux64_path(name));
    }
    let loader = ["avutil", "swresample", "avcodec", "avformat"]
        .iter()
        .fold(FakeModuleLoader::new(), |l, n| l.with_module(&format!("{n}.so"), &[]));
    let manager = manager(&dir, &loader);

    let avcodec = LibrarySpec::new("avcodec")
        .dependency(LibrarySpec::new("avutil"))
        .dependency(LibrarySpec::new("swresample").dependency(LibrarySpec::new("avutil")));
    let avformat = LibrarySpec::new("avformat").dependency(avcodec);

    manager.load(&avformat).unwrap();
    assert_eq!(
        loader.opened_names(),
        ["avutil.so", "swresample.so", "avcodec.so", "avformat.so"]
    );
    assert_eq!(
        manager.loaded_names(),
        ["avutil", "swresample", "avcodec", "avformat"]
    );
}

#[test]
fn failed_dependency_aborts_dependent() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), linux64_path("app"));
    let loader = FakeModuleLoader::new().with_module("app.so", &[]);
    let manager = manager(&dir, &loader);

    let err = manager
        .load(&LibrarySpec::new("app").dependency(LibrarySpec::new("missing")))
        .unwrap_err();
    match &err {
        LoadError::DependencyFailed { name, source } => {
            assert_eq!(name, "app");
            assert!(matches!(**source, LoadError::LibraryNotFound { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(loader.opened().is_empty());
}

#[test]
fn second_load_returns_cached_library() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), linux64_path("lua"));
    let loader = FakeModuleLoader::new().with_module("lua.so", &[]);
    let manager = manager(&dir, &loader);

    let first = manager.load(&LibrarySpec::new("lua")).unwrap();
    let second = manager.load(&LibrarySpec::new("lua").alt_name("lua5.4")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.opened().len(), 1);

    manager.unload_all();
    assert!(manager.loaded_names().is_empty());
    assert_eq!(first.name(), "lua");
}

#[test]
fn concurrent_loads_open_once() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), linux64_path("zstd"));
    let loader = FakeModuleLoader::new().with_module("zstd.so", &[]);
    let manager = Arc::new(manager(&dir, &loader));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.load(&LibrarySpec::new("zstd")).unwrap())
        })
        .collect();
    let libs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(libs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(loader.opened().len(), 1);
}

#[test]
fn missing_file_is_extracted_from_memory_resources() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeModuleLoader::new().with_module("glfw.so", &[]);
    let manager = LibraryManager::new(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path())
            .with_module_loader(loader.clone())
            .with_resources(
                MemoryResources::new().with_payload(linux64_path("glfw"), b"\x7fELF".to_vec()),
            ),
    );

    let lib = manager.load(&LibrarySpec::new("glfw")).unwrap();
    assert_eq!(std::fs::read(lib.path()).unwrap(), b"\x7fELF");
}

#[test]
fn missing_file_is_extracted_from_directory_resources() {
    init_logging();
    let bundle = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(bundle.path().join("lib").join("linux64")).unwrap();
    std::fs::write(bundle.path().join(linux64_path("ogg")), b"ogg payload").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let loader = FakeModuleLoader::new().with_module("ogg.so", &[]);
    let manager = LibraryManager::new(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path())
            .with_module_loader(loader.clone())
            .with_resources(DirectoryResources::new(bundle.path())),
    );

    manager.load(&LibrarySpec::new("ogg")).unwrap();
    assert!(dir.path().join(linux64_path("ogg")).is_file());
}

#[test]
fn failed_extraction_leaves_no_partial_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeModuleLoader::new().with_module("vorbis.so", &[]);
    let manager = LibraryManager::new(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path())
            .with_module_loader(loader.clone())
            .with_resources(
                MemoryResources::new().with_failing_payload(linux64_path("vorbis"), vec![0u8; 64]),
            ),
    );

    let err = manager.load(&LibrarySpec::new("vorbis")).unwrap_err();
    assert!(matches!(err, LoadError::LibraryNotFound { .. }));
    assert!(!dir.path().join(linux64_path("vorbis")).exists());
}

#[test]
fn alternate_is_extracted_when_primary_extraction_fails() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeModuleLoader::new().with_module("b.so", &[]);
    let manager = LibraryManager::new(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path())
            .with_module_loader(loader.clone())
            .with_resources(
                MemoryResources::new()
                    .with_failing_payload(linux64_path("a"), vec![1u8; 32])
                    .with_payload(linux64_path("b"), b"b payload".to_vec()),
            ),
    );

    let lib = manager.load(&LibrarySpec::new("a").alt_name("b")).unwrap();
    assert_eq!(lib.name(), "a");
    assert!(lib.path().ends_with("b.so"));
    assert!(!dir.path().join(linux64_path("a")).exists());
    assert_eq!(std::fs::read(dir.path().join(linux64_path("b"))).unwrap(), b"b payload");
    assert_eq!(loader.opened_names(), ["b.so"]);
}
