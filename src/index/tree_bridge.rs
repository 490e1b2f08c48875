use super::container::Index;
use super::entry::Entry;
use super::error::Result;
use crate::object::{self, ObjectId, RawTreeEntry};
use crate::repo::Repository;
use std::collections::BTreeMap;

/// One level of the stack-of-builders `writeTree` uses (§4.H, §9's
/// resolved open question: no arena or back-pointers — a parent is
/// updated by popping its finished child and re-inserting into the new
/// top of stack, never by a child holding a reference to its parent).
struct TreeBuilder {
    /// This level's own name (empty for the root level).
    name: Vec<u8>,
    children: BTreeMap<Vec<u8>, RawTreeEntry>,
}

/// Build nested tree objects from the flat, pre-sorted index and return
/// the root tree's object id.
pub fn write_tree(repo: &Repository, index: &Index) -> Result<ObjectId> {
    let objects_dir = repo.objects_dir();
    let mut stack = vec![TreeBuilder {
        name: Vec::new(),
        children: BTreeMap::new(),
    }];

    for entry in index.members() {
        let components: Vec<&[u8]> = entry.name.split(|&b| b == b'/').collect();
        let (dir_components, file_name) = components.split_at(components.len() - 1);
        let file_name = file_name[0];

        let common = dir_components
            .iter()
            .zip(stack[1..].iter().map(|level| level.name.as_slice()))
            .take_while(|(a, b)| **a == **b)
            .count();

        pop_to_depth(&mut stack, &objects_dir, common)?;

        for component in &dir_components[common..] {
            stack.push(TreeBuilder {
                name: component.to_vec(),
                children: BTreeMap::new(),
            });
        }

        let top = stack.last_mut().unwrap();
        top.children.insert(
            file_name.to_vec(),
            RawTreeEntry {
                mode: entry.mode,
                name: file_name.to_vec(),
                id: entry.object_id,
            },
        );
    }

    pop_to_depth(&mut stack, &objects_dir, 0)?;

    let root = stack.pop().unwrap();
    let entries: Vec<RawTreeEntry> = root.children.into_values().collect();
    Ok(object::write_tree_object(&objects_dir, &entries)?)
}

/// Pop levels off `stack` until only `depth` directory levels remain
/// (plus the root), writing each popped level's tree object and folding
/// it into its parent's children.
fn pop_to_depth(
    stack: &mut Vec<TreeBuilder>,
    objects_dir: &std::path::Path,
    depth: usize,
) -> Result<()> {
    while stack.len() - 1 > depth {
        let finished = stack.pop().unwrap();
        let entries: Vec<RawTreeEntry> = finished.children.into_values().collect();
        let id = object::write_tree_object(objects_dir, &entries)?;
        let parent = stack.last_mut().unwrap();
        parent.children.insert(
            finished.name.clone(),
            RawTreeEntry {
                mode: super::entry::MODE_GITLINK,
                name: finished.name,
                id,
            },
        );
    }
    Ok(())
}

/// Populate `index` from a tree object, recursively walking subtrees and
/// building repo-relative names as it goes.
pub fn read_tree(repo: &Repository, index: &mut Index, root_id: &ObjectId) -> Result<()> {
    read_tree_into(repo, index, root_id, &[])
}

fn read_tree_into(
    repo: &Repository,
    index: &mut Index,
    tree_id: &ObjectId,
    prefix: &[u8],
) -> Result<()> {
    let entries = object::read_tree_object(&repo.objects_dir(), tree_id)?;
    for raw in entries {
        let mut name = prefix.to_vec();
        if !name.is_empty() {
            name.push(b'/');
        }
        name.extend_from_slice(&raw.name);

        if raw.mode == super::entry::MODE_GITLINK {
            read_tree_into(repo, index, &raw.id, &name)?;
        } else {
            let entry = Entry::from_tree_entry(repo, name, raw.mode, raw.id);
            index.add(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::MODE_REGULAR;

    fn stage(index: &mut Index, repo: &Repository, name: &str, content: &[u8]) {
        let id = repo.write_blob(content).unwrap();
        index.add(Entry::from_tree_entry(repo, name.as_bytes().to_vec(), MODE_REGULAR, id));
    }

    #[test]
    fn write_tree_then_read_tree_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let mut index = Index::new();
        stage(&mut index, &repo, "a", b"a-content");
        stage(&mut index, &repo, "b/c", b"c-content");
        stage(&mut index, &repo, "b/d", b"d-content");
        stage(&mut index, &repo, "e", b"e-content");

        let root_id = write_tree(&repo, &index).unwrap();

        let mut reloaded = Index::new();
        read_tree(&repo, &mut reloaded, &root_id).unwrap();

        assert_eq!(reloaded.len(), 4);
        assert!(reloaded.get_entry(b"a").is_some());
        assert!(reloaded.get_entry(b"b/c").is_some());
        assert!(reloaded.get_entry(b"b/d").is_some());
        assert!(reloaded.get_entry(b"e").is_some());
    }

    #[test]
    fn write_tree_is_deterministic_regardless_of_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let mut forward = Index::new();
        stage(&mut forward, &repo, "a", b"x");
        stage(&mut forward, &repo, "b/c", b"y");

        let mut backward = Index::new();
        stage(&mut backward, &repo, "b/c", b"y");
        stage(&mut backward, &repo, "a", b"x");

        // Both indexes are BTreeMaps, so both iterate in the same sorted
        // order regardless of insertion order.
        let id1 = write_tree(&repo, &forward).unwrap();
        let id2 = write_tree(&repo, &backward).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn empty_index_writes_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let index = Index::new();
        let id = write_tree(&repo, &index).unwrap();
        assert_eq!(hex::encode(id), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }
}
