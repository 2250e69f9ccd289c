use assert_fs::TempDir;

/// Scratch workspace next to the test binary rather than under the system
/// temp dir, so the `/tmp` exemption never covers paths inside it.
pub(crate) fn workspace_dir() -> TempDir {
    let exe = std::env::current_exe().unwrap();
    TempDir::new_in(exe.parent().unwrap()).unwrap()
}
