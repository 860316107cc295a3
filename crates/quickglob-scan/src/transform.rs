//! Shaping accepted entries into results.

use std::path::PathBuf;

use quickglob_core::{Entry, EntryItem, Settings, path_to_slash};

/// Applies the output options to accepted entries.
#[derive(Debug, Clone)]
pub struct EntryTransformer {
    cwd: PathBuf,
    absolute: bool,
    mark_directories: bool,
    object_mode: bool,
}

impl EntryTransformer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            cwd: settings.cwd.clone(),
            absolute: settings.absolute,
            mark_directories: settings.mark_directories,
            object_mode: settings.object_mode,
        }
    }

    pub fn transform(&self, mut entry: Entry) -> EntryItem {
        let mut path = if self.absolute {
            path_to_slash(&self.cwd.join(&entry.path))
        } else {
            entry.path_str()
        };

        if self.mark_directories && entry.is_dir() && !path.ends_with('/') {
            path.push('/');
        }

        if self.object_mode {
            entry.path = PathBuf::from(path);
            EntryItem::Entry(entry)
        } else {
            EntryItem::Path(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickglob_core::EntryKind;

    fn transformer(configure: impl FnOnce(&mut Settings)) -> EntryTransformer {
        let mut settings = Settings::new("/project");
        configure(&mut settings);
        EntryTransformer::new(&settings)
    }

    #[test]
    fn test_plain_path() {
        let t = transformer(|_| {});
        let item = t.transform(Entry::new("a/b.txt", 2, EntryKind::File, false));
        assert_eq!(item, EntryItem::Path("a/b.txt".to_string()));
    }

    #[test]
    fn test_absolute() {
        let t = transformer(|s| s.absolute = true);
        let item = t.transform(Entry::new("a/b.txt", 2, EntryKind::File, false));
        assert_eq!(item.path(), "/project/a/b.txt");
    }

    #[test]
    fn test_mark_directories() {
        let t = transformer(|s| s.mark_directories = true);
        let dir = t.transform(Entry::new("a/dir", 2, EntryKind::Directory, false));
        let file = t.transform(Entry::new("a/file", 2, EntryKind::File, false));
        assert_eq!(dir.path(), "a/dir/");
        assert_eq!(file.path(), "a/file");
    }

    #[test]
    fn test_object_mode() {
        let t = transformer(|s| {
            s.object_mode = true;
            s.absolute = true;
        });
        let item = t.transform(Entry::new("a/b.txt", 2, EntryKind::File, false));
        let entry = item.as_entry().unwrap();
        assert_eq!(entry.name.as_str(), "b.txt");
        assert_eq!(entry.path_str(), "/project/a/b.txt");
        assert_eq!(entry.depth, 2);
    }
}
