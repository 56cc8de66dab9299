//! Integration test: the process-wide manager.
//!
//! Runs in its own test binary so that nothing else touches the global
//! before the explicit initialisation below.

use keel_loader::{LibraryManager, LoaderConfig};
use keel_test_utils::linux64;

#[test]
fn global_manager_is_configured_once() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();

    let first = LibraryManager::init_global(
        LoaderConfig::default()
            .with_platform(linux64())
            .with_base_dir(dir.path()),
    )
    .unwrap();
    assert_eq!(first.config().base_dir, dir.path());

    let rejected = LibraryManager::init_global(LoaderConfig::default().with_base_dir("elsewhere"))
        .unwrap_err();
    assert_eq!(rejected.base_dir, std::path::Path::new("elsewhere"));

    assert!(std::ptr::eq(LibraryManager::global(), first));
    assert_eq!(LibraryManager::global().config().base_dir, dir.path());
}
