use super::*;

#[test]
fn test_extension_for_url() {
    assert_eq!(extension_for_url("https://x.test/a.png"), "png");
    assert_eq!(extension_for_url("https://x.test/a.JPG?width=200"), "jpg");
    assert_eq!(extension_for_url("https://x.test/a.svg#frag"), "svg");
    assert_eq!(extension_for_url("https://x.test/a"), "bin");
    assert_eq!(extension_for_url("https://x.test/archive.tar.gz"), "bin");
}
