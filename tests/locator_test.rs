use std::fs;

use splat_gateway::resource::{Locator, ResourceId, ResourceLayout};
use splat_gateway::GatewayError;

fn id(raw: &str) -> ResourceId {
    ResourceId::parse(raw).unwrap()
}

#[tokio::test]
async fn test_locate_existing_resource() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("abc")).unwrap();
    fs::write(root.path().join("abc/abc.ply"), b"ply").unwrap();

    let locator = Locator::new(root.path(), ResourceLayout::default()).unwrap();
    let located = locator.locate(&id("abc")).await.unwrap();

    let canonical_root = fs::canonicalize(root.path()).unwrap();
    assert_eq!(locator.storage_root(), canonical_root.as_path());
    assert_eq!(located.dir, canonical_root.join("abc"));
    assert_eq!(located.input, canonical_root.join("abc/abc.ply"));
    assert_eq!(located.output, canonical_root.join("abc/abc.ksplat"));
    // Locating never creates the output.
    assert!(!located.output.exists());
}

#[tokio::test]
async fn test_missing_directory_and_input() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("empty")).unwrap();
    let locator = Locator::new(root.path(), ResourceLayout::default()).unwrap();

    assert!(matches!(
        locator.locate(&id("ghost")).await,
        Err(GatewayError::DirectoryNotFound(_))
    ));
    assert!(matches!(
        locator.locate(&id("empty")).await,
        Err(GatewayError::InputNotFound { .. })
    ));
    assert!(!root.path().join("ghost").exists());
}

#[tokio::test]
async fn test_plain_file_is_not_a_resource_directory() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("flat"), b"not a dir").unwrap();
    let locator = Locator::new(root.path(), ResourceLayout::default()).unwrap();

    assert!(matches!(
        locator.locate(&id("flat")).await,
        Err(GatewayError::DirectoryNotFound(_))
    ));
}

#[tokio::test]
async fn test_artifact_requires_output_file() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("abc")).unwrap();
    fs::write(root.path().join("abc/abc.ply"), b"ply").unwrap();
    let locator = Locator::new(root.path(), ResourceLayout::default()).unwrap();

    assert!(matches!(
        locator.artifact(&id("abc")).await,
        Err(GatewayError::ArtifactNotFound(_))
    ));
    assert!(matches!(
        locator.artifact(&id("nope")).await,
        Err(GatewayError::DirectoryNotFound(_))
    ));

    fs::write(root.path().join("abc/abc.ksplat"), b"ksplat").unwrap();
    let path = locator.artifact(&id("abc")).await.unwrap();
    assert!(path.ends_with("abc/abc.ksplat"));
}

#[test]
fn test_traversal_identifiers_rejected() {
    for raw in ["../secret", "..", "a/../../b", "sub/dir"] {
        assert!(matches!(
            ResourceId::parse(raw),
            Err(GatewayError::InvalidIdentifier(_))
        ));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_rejected() {
    let outside = tempfile::tempdir().unwrap();
    fs::create_dir(outside.path().join("secret")).unwrap();
    fs::write(outside.path().join("secret/secret.ply"), b"ply").unwrap();

    let root = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(outside.path().join("secret"), root.path().join("secret")).unwrap();

    let locator = Locator::new(root.path(), ResourceLayout::default()).unwrap();
    assert!(matches!(
        locator.locate(&id("secret")).await,
        Err(GatewayError::InvalidIdentifier(_))
    ));
}

#[tokio::test]
async fn test_custom_layout_extensions() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("scan")).unwrap();
    fs::write(root.path().join("scan/scan.las"), b"las").unwrap();

    let layout = ResourceLayout {
        input_ext: "las".to_string(),
        output_ext: "laz".to_string(),
    };
    let locator = Locator::new(root.path(), layout).unwrap();
    let located = locator.locate(&id("scan")).await.unwrap();
    assert!(located.output.ends_with("scan/scan.laz"));
}
