fn main() {
    // Emits built.rs with package metadata and the git commit hash (when available).
    if let Err(err) = built::write_built_file() {
        panic!("failed to acquire build-time information: {err}");
    }
}
