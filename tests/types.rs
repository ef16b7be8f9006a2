// ABOUTME: Property tests for image tag validation and tag discovery.
// ABOUTME: Checks that parsing tolerates registry ports and digests.

use proptest::prelude::*;
use updater::types::{ImageRef, ImageTag, tag_of};

fn tag_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_.-]{0,40}"
}

proptest! {
    #[test]
    fn valid_tags_are_accepted(tag in tag_strategy()) {
        let parsed = ImageTag::new(&tag).unwrap();
        prop_assert_eq!(parsed.as_str(), tag.as_str());
    }

    #[test]
    fn tags_with_shell_characters_are_rejected(
        prefix in "[a-z0-9]{1,5}",
        bad in "[ ;&|$`/:@]",
    ) {
        let candidate = format!("{prefix}{bad}x");
        prop_assert!(ImageTag::new(&candidate).is_err());
    }

    #[test]
    fn tag_of_finds_tag_despite_port_and_digest(
        port in 1u16..,
        tag in tag_strategy(),
        digest in "[a-f0-9]{16}",
    ) {
        let reference = format!("registry.local:{port}/org/app:{tag}@sha256:{digest}");
        prop_assert_eq!(tag_of(&reference), Some(tag.as_str()));
    }

    #[test]
    fn untagged_reference_has_no_tag(port in 1u16..) {
        let reference = format!("registry.local:{port}/org/app");
        prop_assert_eq!(tag_of(&reference), None);
    }
}

#[test]
fn with_tag_builds_full_reference() {
    let tag = ImageTag::new("v1.2.3").unwrap();
    let image = ImageRef::with_tag("ghcr.io/org/app", &tag);
    assert_eq!(image.to_string(), "ghcr.io/org/app:v1.2.3");
    assert_eq!(image.tag(), Some("v1.2.3"));
}
