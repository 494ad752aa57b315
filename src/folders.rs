//! Folder tree shown next to the viewer.

use tracing::{debug, warn};

use crate::models::{FetchTarget, FileEntry};
use crate::source::ContentSource;

/// Name of the tree's root node.
pub const ROOT_NAME: &str = "data";

/// One folder and its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub files: Vec<FileEntry>,
    pub expanded: bool,
}

/// Files available per folder, in configured folder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTreeModel {
    folders: Vec<FolderNode>,
}

impl FolderTreeModel {
    /// List every folder once. A folder whose listing fails is kept but empty.
    pub async fn load<S: ContentSource + ?Sized>(source: &S, folders: &[String]) -> Self {
        let mut nodes = Vec::with_capacity(folders.len());

        for folder in folders {
            let files = match source.list_folder(folder).await {
                Ok(files) => {
                    debug!("Folder {} has {} files", folder, files.len());
                    files
                }
                Err(e) => {
                    warn!("Failed to load {} contents: {}", folder, e);
                    Vec::new()
                }
            };
            nodes.push(FolderNode {
                name: folder.clone(),
                files,
                expanded: false,
            });
        }

        Self { folders: nodes }
    }

    pub fn root_name(&self) -> &'static str {
        ROOT_NAME
    }

    pub fn folders(&self) -> &[FolderNode] {
        &self.folders
    }

    pub fn files(&self, folder: &str) -> Option<&[FileEntry]> {
        self.folder(folder).map(|node| node.files.as_slice())
    }

    /// Target for a file in the tree, if it exists.
    pub fn target(&self, folder: &str, filename: &str) -> Option<FetchTarget> {
        self.files(folder)?
            .iter()
            .any(|f| f.name == filename)
            .then(|| FetchTarget::new(folder, filename))
    }

    /// Toggle a folder open or closed. Returns the new state.
    pub fn toggle(&mut self, folder: &str) -> bool {
        match self.folders.iter_mut().find(|node| node.name == folder) {
            Some(node) => {
                node.expanded = !node.expanded;
                node.expanded
            }
            None => false,
        }
    }

    pub fn is_expanded(&self, folder: &str) -> bool {
        self.folder(folder).is_some_and(|node| node.expanded)
    }

    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|node| node.files.len()).sum()
    }

    fn folder(&self, folder: &str) -> Option<&FolderNode> {
        self.folders.iter().find(|node| node.name == folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryFile, MemorySource};

    fn folders() -> Vec<String> {
        vec!["coupon".to_string(), "market".to_string()]
    }

    #[tokio::test]
    async fn test_load_keeps_folder_order() {
        let source = MemorySource::new()
            .with_file("market", "m1.csv", MemoryFile::new("x"))
            .with_file("coupon", "c1.csv", MemoryFile::new("yy"))
            .with_file("coupon", "c2.csv", MemoryFile::new("zzz"));

        let tree = FolderTreeModel::load(&source, &folders()).await;
        let names: Vec<&str> = tree.folders().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["coupon", "market"]);
        assert_eq!(tree.file_count(), 3);
        assert_eq!(
            tree.files("coupon").unwrap()[1],
            FileEntry::new("c2.csv", Some(3))
        );
    }

    #[tokio::test]
    async fn test_failed_folder_is_empty() {
        let source = MemorySource::new().with_file("coupon", "c1.csv", MemoryFile::new("x"));
        let tree = FolderTreeModel::load(&source, &folders()).await;
        assert_eq!(tree.files("market"), Some(&[][..]));
        assert_eq!(tree.file_count(), 1);
    }

    #[tokio::test]
    async fn test_target_lookup() {
        let source = MemorySource::new().with_file("coupon", "c1.csv", MemoryFile::new("x"));
        let tree = FolderTreeModel::load(&source, &folders()).await;
        assert_eq!(
            tree.target("coupon", "c1.csv"),
            Some(FetchTarget::new("coupon", "c1.csv"))
        );
        assert_eq!(tree.target("coupon", "nope.csv"), None);
        assert_eq!(tree.target("elsewhere", "c1.csv"), None);
    }

    #[test]
    fn test_toggle() {
        let mut tree = FolderTreeModel {
            folders: vec![FolderNode {
                name: "coupon".to_string(),
                files: Vec::new(),
                expanded: false,
            }],
        };
        assert!(!tree.is_expanded("coupon"));
        assert!(tree.toggle("coupon"));
        assert!(tree.is_expanded("coupon"));
        assert!(!tree.toggle("coupon"));
        assert!(!tree.toggle("missing"));
    }
}
