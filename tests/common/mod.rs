#![allow(dead_code)]

pub mod repo {
    use std::fs;
    use std::path::{Path, PathBuf};

    use specforge::config::{GeneratorConfig, Layout};
    use tempfile::TempDir;

    /// Directory holding the checked-in spec repositories.
    pub fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
    }

    fn copy_dir(from: &Path, to: &Path) {
        fs::create_dir_all(to).unwrap();
        for entry in fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            let target = to.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                fs::copy(entry.path(), &target).unwrap();
            }
        }
    }

    /// A scratch copy of `tests/fixtures/<name>`, removed on drop.
    pub struct FixtureRepo {
        pub dir: TempDir,
        pub layout: Layout,
    }

    impl FixtureRepo {
        pub fn copy_of(name: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            copy_dir(&fixtures_dir().join(name), dir.path());
            let layout = Layout::new(dir.path(), GeneratorConfig::default());
            FixtureRepo { dir, layout }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        pub fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
        }

        pub fn write(&self, rel: &str, contents: &str) {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        pub fn exists(&self, rel: &str) -> bool {
            self.path(rel).exists()
        }
    }
}
