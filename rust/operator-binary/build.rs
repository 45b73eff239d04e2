use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is required"));
    built::write_built_file_with_opts(Some(Path::new("Cargo.toml")), &out_dir.join("built.rs"))
        .expect("failed to write build information");
}
